pub mod edge_extractor;
pub mod region_isolation;
pub mod segmentation_mask;
