pub mod face_detector;
pub mod person_segmenter;
