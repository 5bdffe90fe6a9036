use crate::types::{DivinerError, DivinerResult, GeoTransform, PixelWindow};
use gdal::raster::RasterBand;
use gdal::Dataset;
use ndarray::{s, Array2, Array3, Axis};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pixel storage behind a lazy raster handle.
///
/// Bands are numbered from 1, as in GDAL. Windows are given in pixel space
/// as (col, row) offsets plus a size.
pub trait RasterSource: fmt::Debug + Send + Sync {
    /// Human readable origin of the pixels (usually the file path)
    fn description(&self) -> String;

    /// Raster size as (cols, rows)
    fn size(&self) -> (usize, usize);

    fn band_count(&self) -> usize;

    /// Per-band scale factors, 1.0 where the band declares none
    fn scales(&self) -> Vec<f64>;

    fn geo_transform(&self) -> Option<GeoTransform>;

    /// Projection WKT, empty when unknown
    fn projection(&self) -> String {
        String::new()
    }

    /// Read one window of one band as `f64`
    fn read_window(&self, band: usize, window: PixelWindow) -> DivinerResult<Array2<f64>>;

    /// Read several windows of one band
    fn read_windows(
        &self,
        band: usize,
        windows: &[PixelWindow],
    ) -> DivinerResult<Vec<Array2<f64>>> {
        windows.iter().map(|w| self.read_window(band, *w)).collect()
    }
}

fn check_band(band: usize, count: usize, description: &str) -> DivinerResult<()> {
    if band == 0 || band > count {
        return Err(DivinerError::OutOfBounds(format!(
            "Band {} requested from {} with {} band(s)",
            band, description, count
        )));
    }
    Ok(())
}

/// GDAL-backed raster file.
///
/// Opening only reads metadata. Pixel reads reopen the dataset so the handle
/// stays `Send + Sync` and no file handle is kept alive between computations.
#[derive(Debug, Clone)]
pub struct GdalRaster {
    path: PathBuf,
    cols: usize,
    rows: usize,
    scales: Vec<f64>,
    geo_transform: Option<GeoTransform>,
    projection: String,
}

impl GdalRaster {
    pub fn open<P: AsRef<Path>>(path: P) -> DivinerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(DivinerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        log::info!("Opening raster: {}", path.display());
        let dataset = Dataset::open(&path)?;
        let (cols, rows) = dataset.raster_size();
        let band_count = dataset.raster_count().max(0) as usize;

        let scales = (1..=band_count)
            .map(|index| -> DivinerResult<f64> {
                Ok(dataset.rasterband(index as isize)?.scale().unwrap_or(1.0))
            })
            .collect::<DivinerResult<Vec<f64>>>()?;

        let geo_transform = dataset.geo_transform().ok().map(GeoTransform::from_gdal);
        let projection = dataset.projection();

        log::debug!(
            "Raster size: {}x{}, {} band(s), scales {:?}",
            cols,
            rows,
            band_count,
            scales
        );

        Ok(Self {
            path,
            cols,
            rows,
            scales,
            geo_transform,
            projection,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_band_window(
        &self,
        band: &RasterBand,
        window: PixelWindow,
    ) -> DivinerResult<Array2<f64>> {
        window.check_within(self.cols, self.rows)?;
        let size = (window.width, window.height);
        let buffer = band.read_as::<f64>(
            (window.xoff as isize, window.yoff as isize),
            size,
            size,
            None,
        )?;

        Array2::from_shape_vec((window.height, window.width), buffer.data).map_err(|e| {
            DivinerError::ShapeMismatch(format!("Failed to reshape window {:?}: {}", window, e))
        })
    }
}

impl RasterSource for GdalRaster {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn band_count(&self) -> usize {
        self.scales.len()
    }

    fn scales(&self) -> Vec<f64> {
        self.scales.clone()
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn read_window(&self, band: usize, window: PixelWindow) -> DivinerResult<Array2<f64>> {
        self.read_windows(band, &[window])?
            .pop()
            .ok_or_else(|| DivinerError::OutOfBounds("Empty window read".to_string()))
    }

    fn read_windows(
        &self,
        band: usize,
        windows: &[PixelWindow],
    ) -> DivinerResult<Vec<Array2<f64>>> {
        check_band(band, self.band_count(), &self.description())?;
        let dataset = Dataset::open(&self.path)?;
        let rasterband = dataset.rasterband(band as isize)?;
        log::debug!(
            "Reading {} window(s) from band {} of {}",
            windows.len(),
            band,
            self.path.display()
        );
        windows
            .iter()
            .map(|w| self.read_band_window(&rasterband, *w))
            .collect()
    }
}

/// In-memory raster, shaped (band, row, col).
///
/// Counts window reads so callers can observe when pixels are touched.
#[derive(Debug)]
pub struct MemoryRaster {
    name: String,
    data: Array3<f64>,
    scales: Vec<f64>,
    geo_transform: Option<GeoTransform>,
    projection: String,
    reads: AtomicUsize,
}

impl MemoryRaster {
    pub fn new<S: Into<String>>(name: S, data: Array3<f64>) -> Self {
        let bands = data.dim().0;
        Self {
            name: name.into(),
            data,
            scales: vec![1.0; bands],
            geo_transform: None,
            projection: String::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Single band raster from a (row, col) array
    pub fn from_band<S: Into<String>>(name: S, band: Array2<f64>) -> Self {
        Self::new(name, band.insert_axis(Axis(0)))
    }

    pub fn with_scales(mut self, scales: Vec<f64>) -> Self {
        self.scales = scales;
        self
    }

    pub fn with_geo_transform(mut self, geo_transform: GeoTransform) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    pub fn with_projection<S: Into<String>>(mut self, wkt: S) -> Self {
        self.projection = wkt.into();
        self
    }

    /// Number of window reads served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl RasterSource for MemoryRaster {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (cols, rows)
    }

    fn band_count(&self) -> usize {
        self.data.dim().0
    }

    fn scales(&self) -> Vec<f64> {
        self.scales.clone()
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn read_window(&self, band: usize, window: PixelWindow) -> DivinerResult<Array2<f64>> {
        check_band(band, self.band_count(), &self.name)?;
        let (cols, rows) = self.size();
        window.check_within(cols, rows)?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        Ok(self
            .data
            .slice(s![
                band - 1,
                window.yoff..window.yoff + window.height,
                window.xoff..window.xoff + window.width
            ])
            .to_owned())
    }
}
