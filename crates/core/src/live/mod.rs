pub mod detection_cycle;
pub mod frame_admission;
pub mod live_session;
pub mod recognition_coordinator;
pub mod session_logger;
pub mod silhouette;
