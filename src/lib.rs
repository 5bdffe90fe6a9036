//! diviner: readers for Diviner lunar thermal L3 rasters and LOLA topography
//!
//! Rasters open lazily: only metadata is read until a handle is computed, and
//! then only the chunks holding selected pixels. On top of that sit the
//! topography accessor (elevation, slope, aspect on one lat/lon grid), the L3
//! product locator and downloader, and the label-calibrated L3 image reader.

pub mod config;
pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use config::DataRoots;
pub use types::{Cycle, DivinerError, DivinerResult, GeoTransform, LonConvention, PixelWindow, DIVINER_NODATA};

pub use crate::core::{
    load, load_cycle, pixel_timeseries, stack, L3Image, L3Product, LolaTopo, RasterHandle,
};
