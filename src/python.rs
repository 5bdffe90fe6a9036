//! Python bindings for the topography, L3 locator and L3 image readers

use crate::config::DataRoots;
use crate::core::l3::{DownloadOutcome, L3Product};
use crate::core::l3_image::{Calibrated, L3Image};
use crate::core::topo::{LolaTopo, ProductKind, Tile, DEFAULT_DATASET};
use crate::io::download::HttpRetriever;
use crate::types::{Cycle, DivinerError};
use numpy::ToPyArray;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

impl From<DivinerError> for PyErr {
    fn from(e: DivinerError) -> Self {
        match e {
            DivinerError::Config(_) | DivinerError::Parse(_) | DivinerError::OutOfBounds(_) => {
                PyValueError::new_err(e.to_string())
            }
            DivinerError::Io(_) | DivinerError::Download(_) => PyIOError::new_err(e.to_string()),
            _ => PyRuntimeError::new_err(e.to_string()),
        }
    }
}

fn roots(dems: Option<PathBuf>, l3_data: Option<PathBuf>) -> DataRoots {
    let defaults = DataRoots::default();
    DataRoots::new(
        dems.unwrap_or(defaults.dems),
        l3_data.unwrap_or(defaults.l3_data),
    )
}

#[pymodule]
fn diviner(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyLolaTopo>()?;
    m.add_class::<PyL3Product>()?;
    m.add_class::<PyL3Image>()?;
    Ok(())
}

/// Python wrapper for LolaTopo
#[pyclass(name = "LolaTopo")]
struct PyLolaTopo {
    inner: LolaTopo,
}

#[pymethods]
impl PyLolaTopo {
    #[new]
    #[pyo3(signature = (dataset = DEFAULT_DATASET, lat_limit = None, dems_root = None))]
    fn new(dataset: &str, lat_limit: Option<f64>, dems_root: Option<PathBuf>) -> PyResult<Self> {
        let inner = LolaTopo::open(dataset, lat_limit, &roots(dems_root, None))?;
        Ok(PyLolaTopo { inner })
    }

    #[getter]
    fn dataset_name(&self) -> String {
        self.inner.dataset_name().to_string()
    }

    #[getter]
    fn dem_scale(&self) -> f64 {
        self.inner.dem_scale()
    }

    #[getter]
    fn slope_scale(&self) -> f64 {
        self.inner.slope_scale()
    }

    #[getter]
    fn aspect_scale(&self) -> f64 {
        self.inner.aspect_scale()
    }

    fn convert_to_lon180(&mut self) {
        self.inner.convert_to_lon180();
    }

    fn convert_to_lon360(&mut self) {
        self.inner.convert_to_lon360();
    }

    fn assign_new_latlon(&mut self, lat: Vec<f64>, lon: Vec<f64>) -> PyResult<()> {
        Ok(self.inner.assign_new_latlon(lat, lon)?)
    }

    fn get_elev_by_pixel(&self, ilat: usize, ilon: usize) -> PyResult<f64> {
        Ok(self.inner.get_elev_by_pixel(ilat, ilon)?)
    }

    fn get_elev_by_coord(&self, lat: f64, lon: f64) -> PyResult<f64> {
        Ok(self.inner.get_elev_by_coord(lat, lon)?)
    }

    fn get_slope_by_pixel(&self, ilat: usize, ilon: usize) -> PyResult<f64> {
        Ok(self.inner.get_slope_by_pixel(ilat, ilon)?)
    }

    fn get_slope_by_coord(&self, lat: f64, lon: f64) -> PyResult<f64> {
        Ok(self.inner.get_slope_by_coord(lat, lon)?)
    }

    fn get_az_by_pixel(&self, ilat: usize, ilon: usize) -> PyResult<f64> {
        Ok(self.inner.get_az_by_pixel(ilat, ilon)?)
    }

    fn get_az_by_coord(&self, lat: f64, lon: f64) -> PyResult<f64> {
        Ok(self.inner.get_az_by_coord(lat, lon)?)
    }

    /// Returns (values, lat, lon) of the cropped product
    #[pyo3(signature = (data, lat_min, lon_min, dlat = 1.0, dlon = 1.0, lat_max = None, lon_max = None))]
    #[allow(clippy::too_many_arguments)]
    fn get_slice(
        &self,
        py: Python,
        data: &str,
        lat_min: f64,
        lon_min: f64,
        dlat: f64,
        dlon: f64,
        lat_max: Option<f64>,
        lon_max: Option<f64>,
    ) -> PyResult<(PyObject, Vec<f64>, Vec<f64>)> {
        let kind: ProductKind = data.parse()?;
        let tile = Tile::with_bounds(
            lat_min,
            lon_min,
            lat_max.unwrap_or(lat_min + dlat),
            lon_max.unwrap_or(lon_min + dlon),
        );
        let sliced = self.inner.get_slice(kind, &tile);
        let values = sliced.compute_2d()?;
        Ok((
            values.to_pyarray(py).into(),
            sliced.rows().coords().to_vec(),
            sliced.cols().coords().to_vec(),
        ))
    }

    fn __str__(&self) -> String {
        format!(
            "LolaTopo(dataset='{}', lat_limit={:?}, lon={:?})",
            self.inner.dataset_name(),
            self.inner.lat_limit(),
            self.inner.lon_convention()
        )
    }
}

/// Python wrapper for L3Product
#[pyclass(name = "L3Product")]
#[derive(Clone)]
struct PyL3Product {
    inner: L3Product,
}

#[pymethods]
impl PyL3Product {
    #[new]
    #[pyo3(signature = (cycle = None, datatype = "st", map_res = "001", year = None))]
    fn new(cycle: Option<u32>, datatype: &str, map_res: &str, year: Option<String>) -> PyResult<Self> {
        let mut inner = match cycle {
            Some(cycle) => L3Product::new(Cycle(cycle)),
            None => L3Product::default(),
        };
        inner.set_datatype(datatype)?;
        inner.set_map_res(map_res)?;
        if let Some(year) = year {
            inner = inner.with_year(year);
        }
        Ok(PyL3Product { inner })
    }

    #[getter]
    fn datatype(&self) -> String {
        self.inner.datatype().to_string()
    }

    #[setter]
    fn set_datatype(&mut self, value: &str) -> PyResult<()> {
        Ok(self.inner.set_datatype(value)?)
    }

    #[getter]
    fn map_res(&self) -> String {
        self.inner.map_res().to_string()
    }

    #[setter]
    fn set_map_res(&mut self, value: &str) -> PyResult<()> {
        Ok(self.inner.set_map_res(value)?)
    }

    #[getter]
    fn year(&self) -> Option<String> {
        self.inner.year()
    }

    #[getter]
    fn fname(&self) -> PyResult<String> {
        Ok(self.inner.fname()?)
    }

    #[getter]
    fn label(&self) -> PyResult<String> {
        Ok(self.inner.label()?)
    }

    #[getter]
    fn data_url(&self) -> PyResult<String> {
        Ok(self.inner.data_url()?.to_string())
    }

    #[getter]
    fn label_url(&self) -> PyResult<String> {
        Ok(self.inner.label_url()?.to_string())
    }

    fn download_label(&self, folder: PathBuf) -> PyResult<PathBuf> {
        Ok(self.inner.download_label(folder, &HttpRetriever::new()?)?)
    }

    /// Returns the local path and whether it was downloaded
    #[pyo3(signature = (folder, overwrite = false))]
    fn download_data(&self, folder: PathBuf, overwrite: bool) -> PyResult<(PathBuf, bool)> {
        Ok(
            match self.inner.download_data(folder, overwrite, &HttpRetriever::new()?)? {
                DownloadOutcome::Downloaded(path) => (path, true),
                DownloadOutcome::Skipped(path) => (path, false),
            },
        )
    }
}

/// Python wrapper for L3Image
#[pyclass(name = "L3Image")]
struct PyL3Image {
    inner: L3Image,
}

#[pymethods]
impl PyL3Image {
    #[new]
    #[pyo3(signature = (cycle, l3_root = None))]
    fn new(cycle: u32, l3_root: Option<PathBuf>) -> PyResult<Self> {
        let inner = L3Image::open(Cycle(cycle), &roots(None, l3_root))?;
        Ok(PyL3Image { inner })
    }

    #[staticmethod]
    fn from_path(path: PathBuf) -> PyResult<Self> {
        Ok(PyL3Image {
            inner: L3Image::from_path(path)?,
        })
    }

    #[pyo3(signature = (ul_lon = 0.0, ul_lat = 1.0, width_degrees = 1.0))]
    fn read_window(&mut self, ul_lon: f64, ul_lat: f64, width_degrees: f64) -> PyResult<()> {
        Ok(self.inner.read_window(ul_lon, ul_lat, width_degrees)?)
    }

    #[getter(SCALING_FACTOR)]
    fn scaling_factor(&self) -> PyResult<f64> {
        Ok(Calibrated::scaling_factor(&self.inner)?)
    }

    #[getter(OFFSET)]
    fn offset(&self) -> PyResult<f64> {
        Ok(Calibrated::offset(&self.inner)?)
    }

    #[getter(NODATA)]
    fn nodata(&self) -> PyResult<f64> {
        Ok(self.inner.nodata()?)
    }

    #[getter]
    fn data(&self, py: Python) -> PyResult<PyObject> {
        Ok(self.inner.data()?.to_pyarray(py).into())
    }

    #[getter]
    fn scaled_data(&self, py: Python) -> PyResult<PyObject> {
        Ok(self.inner.scaled_data()?.to_pyarray(py).into())
    }

    fn get_pixel(&self, xoff: usize, yoff: usize) -> PyResult<f64> {
        Ok(self.inner.get_pixel(xoff, yoff)?)
    }

    #[getter]
    fn window_mean(&self) -> PyResult<f64> {
        Ok(self.inner.window_mean()?)
    }

    #[getter]
    fn window_std(&self) -> PyResult<f64> {
        Ok(self.inner.window_std()?)
    }

    #[getter]
    fn n_valid(&self) -> PyResult<usize> {
        Ok(self.inner.n_valid()?)
    }
}
