use crate::config::DataRoots;
use crate::core::l3::L3Product;
use crate::core::projection::GeoReference;
use crate::io::label::Label;
use crate::io::raster::{GdalRaster, RasterSource};
use crate::types::{Cycle, DivinerError, DivinerResult, PixelWindow};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Label block holding the image calibration keys
const IMAGE_BLOCK: [&str; 2] = ["UNCOMPRESSED_FILE", "IMAGE"];

/// Anything that can provide the calibration of stored digital numbers
pub trait Calibrated {
    fn scaling_factor(&self) -> DivinerResult<f64>;
    fn offset(&self) -> DivinerResult<f64>;
}

/// SCALING_FACTOR, OFFSET and MISSING_CONSTANT of one L3 image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub scaling_factor: f64,
    pub offset: f64,
    pub missing_constant: f64,
}

impl Calibration {
    pub fn from_label(label: &Label) -> DivinerResult<Self> {
        let key = |name: &'static str| [IMAGE_BLOCK[0], IMAGE_BLOCK[1], name];
        Ok(Self {
            scaling_factor: label.number_at(&key("SCALING_FACTOR"))?,
            offset: label.number_at(&key("OFFSET"))?,
            missing_constant: label.number_at(&key("MISSING_CONSTANT"))?,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> DivinerResult<Self> {
        Self::from_label(&Label::from_path(path)?)
    }

    /// Physical value of a raw number, NaN for the missing constant
    pub fn apply(&self, raw: f64) -> f64 {
        if raw == self.missing_constant {
            f64::NAN
        } else {
            raw * self.scaling_factor + self.offset
        }
    }
}

/// One Diviner GDR L3 image with label-driven calibration.
///
/// Calibration constants are read from the label on every access, so an
/// updated label is picked up without reopening the image.
#[derive(Debug)]
pub struct L3Image {
    product: L3Product,
    image_path: PathBuf,
    label_path: PathBuf,
    source: Arc<dyn RasterSource>,
    window: Option<PixelWindow>,
    buffer: Option<Array2<f64>>,
}

impl L3Image {
    /// Regolith temperature image of `cycle` under the configured L3 root
    pub fn open(cycle: Cycle, roots: &DataRoots) -> DivinerResult<Self> {
        Self::open_product(L3Product::new(cycle), roots)
    }

    /// Any L3 product under the configured L3 root
    pub fn open_product(product: L3Product, roots: &DataRoots) -> DivinerResult<Self> {
        let image_path = roots.l3_data.join(product.fname()?);
        let label_path = roots.l3_data.join(product.label()?);
        let source = GdalRaster::open(&image_path)?;
        Ok(Self::with_source(product, image_path, label_path, Arc::new(source)))
    }

    /// Open an image file directly, taking cycle and product from its name
    pub fn from_path<P: AsRef<Path>>(path: P) -> DivinerResult<Self> {
        let path = path.as_ref();
        let fname = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DivinerError::Parse(format!("Path has no file name: {}", path.display()))
            })?;
        let product = L3Product::from_fname(fname)?;
        let source = GdalRaster::open(path)?;
        Ok(Self::with_source(
            product,
            path.to_path_buf(),
            path.with_extension("lbl"),
            Arc::new(source),
        ))
    }

    /// Assemble a reader over an already opened pixel source
    pub fn with_source(
        product: L3Product,
        image_path: PathBuf,
        label_path: PathBuf,
        source: Arc<dyn RasterSource>,
    ) -> Self {
        log::debug!(
            "L3 image {} with label {}",
            image_path.display(),
            label_path.display()
        );
        Self {
            product,
            image_path,
            label_path,
            source,
            window: None,
            buffer: None,
        }
    }

    pub fn cycle(&self) -> Option<Cycle> {
        self.product.cycle()
    }

    pub fn product(&self) -> &L3Product {
        &self.product
    }

    pub fn fname(&self) -> &Path {
        &self.image_path
    }

    pub fn label_path(&self) -> &Path {
        &self.label_path
    }

    /// Window of the last `read_window` call
    pub fn window(&self) -> Option<PixelWindow> {
        self.window
    }

    /// Freshly parsed label
    pub fn label(&self) -> DivinerResult<Label> {
        Label::from_path(&self.label_path)
    }

    pub fn calibration(&self) -> DivinerResult<Calibration> {
        Calibration::from_label(&self.label()?)
    }

    pub fn nodata(&self) -> DivinerResult<f64> {
        Ok(self.calibration()?.missing_constant)
    }

    pub fn georeference(&self) -> DivinerResult<GeoReference> {
        let transform = self.source.geo_transform().ok_or_else(|| {
            DivinerError::Config(format!(
                "{} has no geotransform",
                self.source.description()
            ))
        })?;
        GeoReference::new(transform, &self.source.projection())
    }

    /// Read a square window into the internal buffer.
    ///
    /// The window starts at the upper left corner (`ul_lon`, `ul_lat`) and
    /// spans `width_degrees` to the east and to the south.
    pub fn read_window(&mut self, ul_lon: f64, ul_lat: f64, width_degrees: f64) -> DivinerResult<()> {
        let window = self
            .georeference()?
            .window_from_corner(ul_lon, ul_lat, width_degrees)?;
        let (cols, rows) = self.source.size();
        window.check_within(cols, rows)?;

        log::info!(
            "Reading window {:?} (lon {}, lat {}, {} deg) from {}",
            window,
            ul_lon,
            ul_lat,
            width_degrees,
            self.image_path.display()
        );
        self.buffer = Some(self.source.read_window(1, window)?);
        self.window = Some(window);
        Ok(())
    }

    /// Raw digital numbers of the buffered window, or of the full image
    /// before any window was read
    fn raw(&self) -> DivinerResult<Array2<f64>> {
        match &self.buffer {
            Some(buffer) => Ok(buffer.clone()),
            None => {
                let (cols, rows) = self.source.size();
                log::debug!("No window read yet, reading full {}x{} image", cols, rows);
                self.source.read_window(1, PixelWindow::new(0, 0, cols, rows))
            }
        }
    }

    /// Raw values with the missing constant replaced by NaN
    pub fn data(&self) -> DivinerResult<Array2<f64>> {
        let nodata = self.nodata()?;
        let mut data = self.raw()?;
        data.mapv_inplace(|v| if v == nodata { f64::NAN } else { v });
        Ok(data)
    }

    /// Calibrated values, NaN where data is missing
    pub fn scaled_data(&self) -> DivinerResult<Array2<f64>> {
        let calibration = self.calibration()?;
        let data = self.data()?;
        Ok(data.mapv(|v| v * calibration.scaling_factor + calibration.offset))
    }

    /// Calibrated value of a single pixel, NaN for the missing constant
    pub fn get_pixel(&self, xoff: usize, yoff: usize) -> DivinerResult<f64> {
        let value = self.source.read_window(1, PixelWindow::new(xoff, yoff, 1, 1))?;
        Ok(self.calibration()?.apply(value[[0, 0]]))
    }

    /// Mean of the valid calibrated values, NaN when none are valid
    pub fn window_mean(&self) -> DivinerResult<f64> {
        let valid = valid_values(&self.scaled_data()?);
        if valid.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(valid.iter().sum::<f64>() / valid.len() as f64)
    }

    /// Population standard deviation of the valid calibrated values
    pub fn window_std(&self) -> DivinerResult<f64> {
        let valid = valid_values(&self.scaled_data()?);
        if valid.is_empty() {
            return Ok(f64::NAN);
        }
        let n = valid.len() as f64;
        let mean = valid.iter().sum::<f64>() / n;
        let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Ok(variance.sqrt())
    }

    /// Number of pixels that are not the missing constant
    pub fn n_valid(&self) -> DivinerResult<usize> {
        Ok(self.data()?.iter().filter(|v| !v.is_nan()).count())
    }

    /// Render the calibrated window with the plasma colormap
    #[cfg(feature = "plot")]
    pub fn plot_window<P: AsRef<Path>>(&self, out: P) -> DivinerResult<()> {
        use crate::core::plot::{render, Colormap, PlotStyle};

        let title = format!("{} {}", self.product.datatype(), self.image_path.display());
        render(&self.scaled_data()?, &PlotStyle::new(title, Colormap::Plasma), out)
    }
}

impl Calibrated for L3Image {
    fn scaling_factor(&self) -> DivinerResult<f64> {
        Ok(self.calibration()?.scaling_factor)
    }

    fn offset(&self) -> DivinerResult<f64> {
        Ok(self.calibration()?.offset)
    }
}

fn valid_values(data: &Array2<f64>) -> Vec<f64> {
    data.iter().copied().filter(|v| !v.is_nan()).collect()
}
