pub mod download;
pub mod label;
pub mod raster;

pub use download::{HttpRetriever, Retriever};
pub use label::{Label, LabelValue};
pub use raster::{GdalRaster, MemoryRaster, RasterSource};
