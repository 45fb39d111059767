pub mod http_recognition_client;
pub mod jpeg_frame_encoder;
