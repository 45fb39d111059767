pub mod cutout_compositor;
mod gaussian;
