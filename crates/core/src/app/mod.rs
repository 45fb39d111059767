pub mod app_state;
pub mod still_photo_use_case;
