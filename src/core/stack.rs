use crate::core::array::{ElementOp, RasterHandle};
use crate::core::l3_image::Calibrated;
use crate::io::raster::GdalRaster;
use crate::types::{Cycle, DivinerError, DivinerResult, DIVINER_NODATA};
use ndarray::Array1;
use std::path::Path;
use std::sync::Arc;

/// Chunk multiplier used by [`load`] callers that have no preference
pub const DEFAULT_CHUNK_SCALE: usize = 2;

/// Per-file loader used when stacking
pub type Loader = fn(&Path, usize) -> DivinerResult<RasterHandle>;

/// Chunk size (x, y) for a chunk multiplier
pub fn chunk_size(chunk_scale: usize) -> (usize, usize) {
    (chunk_scale * 2048, chunk_scale * 1024)
}

/// Open a raster file as a lazy handle.
///
/// Only metadata is read here. Chunks are `chunk_scale * 2048` pixels along x
/// and `chunk_scale * 1024` along y.
pub fn load<P: AsRef<Path>>(path: P, chunk_scale: usize) -> DivinerResult<RasterHandle> {
    let raster = GdalRaster::open(path.as_ref())?;
    let mut handle = RasterHandle::from_source(Arc::new(raster), chunk_size(chunk_scale));
    if let Some(stem) = path.as_ref().file_stem().and_then(|s| s.to_str()) {
        handle.set_name(stem);
    }
    Ok(handle)
}

/// Open a Diviner map cycle, tagging it with the cycle parsed from its name.
///
/// The band axis becomes `time` with the cycle as its only label.
pub fn load_cycle<P: AsRef<Path>>(path: P, chunk_scale: usize) -> DivinerResult<RasterHandle> {
    let path = path.as_ref();
    let cycle = Cycle::from_path(path)?;
    let handle = load(path, chunk_scale)?;
    tag_cycle(handle, cycle)
}

/// Label a single-band handle with its cycle along a `time` axis
pub fn tag_cycle(handle: RasterHandle, cycle: Cycle) -> DivinerResult<RasterHandle> {
    log::debug!("Tagging {:?} with cycle {}", handle.name(), cycle);
    handle.assign_band_labels("time", vec![cycle.0 as i64])
}

fn load_path(path: &Path, chunk_scale: usize) -> DivinerResult<RasterHandle> {
    load(path, chunk_scale)
}

fn load_cycle_path(path: &Path, chunk_scale: usize) -> DivinerResult<RasterHandle> {
    load_cycle(path, chunk_scale)
}

/// [`load`] as a [`Loader`]
pub const LOAD: Loader = load_path;

/// [`load_cycle`] as a [`Loader`]
pub const LOAD_CYCLE: Loader = load_cycle_path;

/// Load every path and concatenate along `time`, keeping the given order.
///
/// Fails on the first load error; no partial stack is returned.
pub fn stack<P, L>(paths: &[P], name: &str, chunk_scale: usize, loader: L) -> DivinerResult<RasterHandle>
where
    P: AsRef<Path>,
    L: Fn(&Path, usize) -> DivinerResult<RasterHandle>,
{
    if paths.is_empty() {
        return Err(DivinerError::Config(format!(
            "No images given for stack '{}'",
            name
        )));
    }

    log::info!("Stacking {} image(s) into '{}'", paths.len(), name);
    let arrays = paths
        .iter()
        .map(|p| loader(p.as_ref(), chunk_scale))
        .collect::<DivinerResult<Vec<_>>>()?;

    let mut stacked = RasterHandle::concat(arrays, "time")?;
    stacked.set_name(name);
    Ok(stacked)
}

/// Calibrated time series of one pixel across `paths`.
///
/// Raw values equal to -32768 become NaN and stay in the series. The
/// scaling factor and offset come from the reader built for the first path.
pub fn pixel_timeseries<P, F, R>(
    xoff: usize,
    yoff: usize,
    reader_factory: F,
    paths: &[P],
    name: &str,
    chunk_scale: usize,
) -> DivinerResult<Array1<f64>>
where
    P: AsRef<Path>,
    F: FnOnce(&Path) -> DivinerResult<R>,
    R: Calibrated,
{
    pixel_timeseries_with(xoff, yoff, LOAD, reader_factory, paths, name, chunk_scale)
}

/// [`pixel_timeseries`] with a custom per-file loader
pub fn pixel_timeseries_with<P, L, F, R>(
    xoff: usize,
    yoff: usize,
    loader: L,
    reader_factory: F,
    paths: &[P],
    name: &str,
    chunk_scale: usize,
) -> DivinerResult<Array1<f64>>
where
    P: AsRef<Path>,
    L: Fn(&Path, usize) -> DivinerResult<RasterHandle>,
    F: FnOnce(&Path) -> DivinerResult<R>,
    R: Calibrated,
{
    let stacked = stack(paths, name, chunk_scale, loader)?;
    let pixel = stacked.isel(yoff, xoff)?.map(ElementOp::MaskEq(DIVINER_NODATA));

    // stack() rejects empty input, so the first path exists
    let reader = reader_factory(paths[0].as_ref())?;
    let scale = reader.scaling_factor()?;
    let offset = reader.offset()?;
    log::debug!(
        "Pixel ({}, {}) of '{}': scaling factor {}, offset {}",
        xoff,
        yoff,
        name,
        scale,
        offset
    );

    pixel.map(ElementOp::Affine { scale, offset }).compute_series()
}
