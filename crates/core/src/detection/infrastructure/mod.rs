pub mod onnx_blazeface_detector;
pub mod onnx_person_segmenter;
pub mod onnx_session;
