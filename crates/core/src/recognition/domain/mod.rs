pub mod overlap_matcher;
pub mod recognition_match;
pub mod recognition_service;
