use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sentinel used for missing pixels in Diviner GDR rasters
pub const DIVINER_NODATA: f64 = -32768.0;

/// Error types for raster access
#[derive(Debug, thiserror::Error)]
pub enum DivinerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Plotting error: {0}")]
    Plot(String),
}

/// Result type for raster operations
pub type DivinerResult<T> = Result<T, DivinerError>;

/// Observation cycle identifier encoded in Diviner filenames (e.g. `20090115`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cycle(pub u32);

impl Cycle {
    /// Parse the cycle from an underscore-delimited filename.
    ///
    /// The fifth token (index 4) carries the cycle followed by a single unit
    /// character, e.g. `dgdr_st_clc_cyl_20090115n_128_jp2.jp2` gives `20090115`.
    pub fn from_fname(fname: &str) -> DivinerResult<Self> {
        let token = fname.split('_').nth(4).ok_or_else(|| {
            DivinerError::Parse(format!("No cycle token in filename: {}", fname))
        })?;

        let mut chars = token.chars();
        chars.next_back();
        let digits = chars.as_str();

        digits
            .parse::<u32>()
            .map(Cycle)
            .map_err(|e| {
                DivinerError::Parse(format!(
                    "Invalid cycle token '{}' in filename {}: {}",
                    token, fname, e
                ))
            })
    }

    /// Parse the cycle from the file name component of a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> DivinerResult<Self> {
        let path = path.as_ref();
        let fname = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DivinerError::Parse(format!("Path has no file name: {}", path.display()))
            })?;
        Self::from_fname(fname)
    }

    /// First four digits of the cycle, used as the remote folder year
    pub fn year(&self) -> String {
        self.0.to_string().chars().take(4).collect()
    }

    /// Calendar date for cycles written as `YYYYMMDD`
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0.to_string(), "%Y%m%d").ok()
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rectangular pixel window: offset (col, row) and size (cols, rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub xoff: usize,
    pub yoff: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(xoff: usize, yoff: usize, width: usize, height: usize) -> Self {
        Self { xoff, yoff, width, height }
    }

    /// Check the window against a raster of `cols` x `rows`
    pub fn check_within(&self, cols: usize, rows: usize) -> DivinerResult<()> {
        let fits = |off: usize, len: usize, limit: usize| {
            len > 0 && off.checked_add(len).map_or(false, |end| end <= limit)
        };
        if !fits(self.xoff, self.width, cols) || !fits(self.yoff, self.height, rows) {
            return Err(DivinerError::OutOfBounds(format!(
                "Window {:?} outside raster of {}x{} pixels",
                self, cols, rows
            )));
        }
        Ok(())
    }
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Map coordinate of the center of column `col`
    pub fn col_center(&self, col: usize) -> f64 {
        self.top_left_x + (col as f64 + 0.5) * self.pixel_width
    }

    /// Map coordinate of the center of row `row`
    pub fn row_center(&self, row: usize) -> f64 {
        self.top_left_y + (row as f64 + 0.5) * self.pixel_height
    }

    /// Fractional (col, row) of a map coordinate; rotation terms are ignored
    pub fn map_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.top_left_x) / self.pixel_width,
            (y - self.top_left_y) / self.pixel_height,
        )
    }
}

/// Longitude convention of a geographic grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LonConvention {
    /// 0 to 360 degrees east
    Lon360,
    /// -180 to 180 degrees
    Lon180,
}

impl LonConvention {
    pub fn wrap(&self, lon: f64) -> f64 {
        match self {
            LonConvention::Lon360 => lon.rem_euclid(360.0),
            LonConvention::Lon180 => (lon + 180.0).rem_euclid(360.0) - 180.0,
        }
    }
}
