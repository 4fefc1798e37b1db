pub(crate) mod frame_cache;
pub(crate) mod overlay;
pub(crate) mod raster;
pub(crate) mod rasterizer;
