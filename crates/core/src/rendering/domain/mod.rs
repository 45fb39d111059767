pub mod bitmap_font;
pub mod display_transform;
pub mod overlay_layers;
