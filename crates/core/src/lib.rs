pub mod app;
pub mod capture;
pub mod compositing;
pub mod detection;
pub mod live;
pub mod masking;
pub mod recognition;
pub mod rendering;
pub mod shared;
