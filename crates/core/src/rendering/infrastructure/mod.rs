pub mod raster_canvas;
