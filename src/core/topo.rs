//! LOLA derived topography: elevation, slope and aspect on one lat/lon grid.

use crate::config::DataRoots;
use crate::core::array::{ElementOp, RasterHandle};
use crate::core::stack::{self, DEFAULT_CHUNK_SCALE};
use crate::types::{DivinerError, DivinerResult, LonConvention};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Dataset used when none is named
pub const DEFAULT_DATASET: &str = "divgdr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductKind {
    Dem,
    Slope,
    Aspect,
}

impl ProductKind {
    pub const ALL: [ProductKind; 3] = [ProductKind::Dem, ProductKind::Slope, ProductKind::Aspect];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Dem => "dem",
            ProductKind::Slope => "slope",
            ProductKind::Aspect => "aspect",
        }
    }
}

impl FromStr for ProductKind {
    type Err = DivinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dem" => Ok(ProductKind::Dem),
            "slope" => Ok(ProductKind::Slope),
            "aspect" => Ok(ProductKind::Aspect),
            _ => Err(DivinerError::Config(format!(
                "Unknown topography product '{}', use dem, slope or aspect",
                s
            ))),
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File of one product within a dataset, relative to the DEM root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductFile {
    pub kind: ProductKind,
    pub fname: &'static str,
    pub long_name: &'static str,
    pub units: &'static str,
}

/// Registry of known topography datasets
pub fn dataset(name: &str) -> DivinerResult<[ProductFile; 3]> {
    match name {
        "divgdr" => Ok([
            ProductFile {
                kind: ProductKind::Dem,
                fname: "divgdr/ldem_128_topo_img.tif",
                long_name: "Elevation",
                units: "m",
            },
            ProductFile {
                kind: ProductKind::Slope,
                fname: "divgdr/ldem_128_slope_img.tif",
                long_name: "Slope",
                units: "deg",
            },
            ProductFile {
                kind: ProductKind::Aspect,
                fname: "divgdr/ldem_128_az_img.tif",
                long_name: "Aspect",
                units: "deg(north)",
            },
        ]),
        _ => Err(DivinerError::Config(format!(
            "Unknown topography dataset '{}', known: [\"divgdr\"]",
            name
        ))),
    }
}

/// Whether the dataset stores aspect relative to the surface normal and
/// needs the 180 degree turn to true north
fn aspect_from_normal(dataset_name: &str) -> bool {
    dataset_name == "divgdr"
}

/// One scaled topography product with its metadata
#[derive(Debug, Clone)]
pub struct TopoProduct {
    kind: ProductKind,
    path: PathBuf,
    data: RasterHandle,
}

impl TopoProduct {
    pub fn kind(&self) -> ProductKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazy array with `lat`/`lon` dimensions
    pub fn data(&self) -> &RasterHandle {
        &self.data
    }

    /// Scale factor declared by the source band
    pub fn scale(&self) -> f64 {
        self.data.attrs().scales.first().copied().unwrap_or(1.0)
    }

    pub fn long_name(&self) -> Option<&str> {
        self.data.attrs().long_name.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.data.attrs().units.as_deref()
    }

    fn value_by_pixel(&self, ilat: usize, ilon: usize) -> DivinerResult<f64> {
        self.data.clone().isel(ilat, ilon)?.compute_scalar()
    }

    fn value_by_coord(&self, lat: f64, lon: f64) -> DivinerResult<f64> {
        self.data.clone().sel_nearest(lat, lon)?.compute_scalar()
    }
}

/// Geographic bounding box for slicing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl Tile {
    /// One degree tile with its lower left corner at (`lat_min`, `lon_min`)
    pub fn new(lat_min: f64, lon_min: f64) -> Self {
        Self::with_delta(lat_min, lon_min, 1.0, 1.0)
    }

    pub fn with_delta(lat_min: f64, lon_min: f64, dlat: f64, dlon: f64) -> Self {
        Self::with_bounds(lat_min, lon_min, lat_min + dlat, lon_min + dlon)
    }

    pub fn with_bounds(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lon_min,
            lat_max,
            lon_max,
        }
    }
}

/// Reader for LOLA topography products.
///
/// Elevation, slope and aspect always share one lat/lon grid. Longitude
/// conversions and coordinate reassignment apply to all three at once.
#[derive(Debug, Clone)]
pub struct LolaTopo {
    dataset_name: String,
    lat_limit: Option<f64>,
    lon_convention: LonConvention,
    dem: TopoProduct,
    slope: TopoProduct,
    aspect: TopoProduct,
}

impl LolaTopo {
    /// Open a dataset from the DEM root, optionally cropped to
    /// `[-lat_limit, lat_limit]`
    pub fn open(dataset_name: &str, lat_limit: Option<f64>, roots: &DataRoots) -> DivinerResult<Self> {
        Self::open_with(dataset_name, lat_limit, roots, stack::LOAD)
    }

    /// [`LolaTopo::open`] with a custom per-file loader
    pub fn open_with<L>(
        dataset_name: &str,
        lat_limit: Option<f64>,
        roots: &DataRoots,
        loader: L,
    ) -> DivinerResult<Self>
    where
        L: Fn(&Path, usize) -> DivinerResult<RasterHandle>,
    {
        let files = dataset(dataset_name)?;
        log::info!(
            "Opening topography dataset '{}' from {}",
            dataset_name,
            roots.dems.display()
        );

        let mut loaded = Vec::with_capacity(files.len());
        for file in files.iter() {
            let path = roots.dems.join(file.fname);
            let handle = loader(&path, DEFAULT_CHUNK_SCALE)?.squeeze();
            if handle.band_count() != 1 {
                return Err(DivinerError::ShapeMismatch(format!(
                    "{} has {} bands, expected one",
                    path.display(),
                    handle.band_count()
                )));
            }
            loaded.push((file, path, handle));
        }

        let (rows, cols) = (loaded[0].2.rows().len(), loaded[0].2.cols().len());
        for (file, _, handle) in &loaded[1..] {
            if handle.rows().len() != rows || handle.cols().len() != cols {
                return Err(DivinerError::ShapeMismatch(format!(
                    "{} grid is {}x{}, dem grid is {}x{}",
                    file.kind,
                    handle.rows().len(),
                    handle.cols().len(),
                    rows,
                    cols
                )));
            }
        }

        let lats = lat_grid(rows);
        let lons = lon_grid(cols);
        log::debug!("Topography grid: {} lat x {} lon", rows, cols);

        let mut products = Vec::with_capacity(loaded.len());
        for (file, path, handle) in loaded {
            let mut data = handle
                .assign_row_coords("lat", lats.clone())?
                .assign_col_coords("lon", lons.clone())?;

            let scale = data.attrs().scales.first().copied().unwrap_or(1.0);
            data = data.map(ElementOp::Scale(scale));
            if let Some(limit) = lat_limit {
                data = data.slice_rows(limit, -limit);
            }
            if file.kind == ProductKind::Aspect && aspect_from_normal(dataset_name) {
                data = data.map(ElementOp::Wrap {
                    shift: 180.0,
                    modulus: 360.0,
                });
            }

            let attrs = data.attrs_mut();
            attrs.long_name = Some(file.long_name.to_string());
            attrs.units = Some(file.units.to_string());
            data.set_name(file.kind.as_str());
            log::debug!("{} scale factor {}", file.kind, scale);

            products.push(TopoProduct {
                kind: file.kind,
                path,
                data,
            });
        }

        let mut products = products.into_iter();
        match (products.next(), products.next(), products.next()) {
            (Some(dem), Some(slope), Some(aspect)) => Ok(Self {
                dataset_name: dataset_name.to_string(),
                lat_limit,
                lon_convention: LonConvention::Lon360,
                dem,
                slope,
                aspect,
            }),
            _ => Err(DivinerError::Config(format!(
                "Dataset '{}' does not list dem, slope and aspect",
                dataset_name
            ))),
        }
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn lat_limit(&self) -> Option<f64> {
        self.lat_limit
    }

    pub fn lon_convention(&self) -> LonConvention {
        self.lon_convention
    }

    pub fn product(&self, kind: ProductKind) -> &TopoProduct {
        match kind {
            ProductKind::Dem => &self.dem,
            ProductKind::Slope => &self.slope,
            ProductKind::Aspect => &self.aspect,
        }
    }

    pub fn dem(&self) -> &TopoProduct {
        &self.dem
    }

    pub fn slope(&self) -> &TopoProduct {
        &self.slope
    }

    pub fn aspect(&self) -> &TopoProduct {
        &self.aspect
    }

    pub fn dem_scale(&self) -> f64 {
        self.dem.scale()
    }

    pub fn slope_scale(&self) -> f64 {
        self.slope.scale()
    }

    pub fn aspect_scale(&self) -> f64 {
        self.aspect.scale()
    }

    /// Product constrained to `[-lat, lat]`
    pub fn slice_lat(&self, kind: ProductKind, lat: f64) -> RasterHandle {
        self.product(kind).data.clone().slice_rows(lat, -lat)
    }

    /// Switch all three products to longitudes in [-180, 180)
    pub fn convert_to_lon180(&mut self) {
        self.remap_lon(LonConvention::Lon180);
    }

    /// Switch all three products to longitudes in [0, 360)
    pub fn convert_to_lon360(&mut self) {
        self.remap_lon(LonConvention::Lon360);
    }

    fn remap_lon(&mut self, convention: LonConvention) {
        log::debug!(
            "Converting topography longitudes from {:?} to {:?}",
            self.lon_convention,
            convention
        );
        for product in self.products_mut() {
            product.data = product
                .data
                .clone()
                .map_col_coords(|lon| convention.wrap(lon))
                .sort_by_cols();
        }
        self.lon_convention = convention;
    }

    /// Overwrite lat/lon coordinates of all three products and sort by lon.
    ///
    /// Only the lengths are checked; the caller owns the grid layout. Either
    /// all three products are updated or none.
    pub fn assign_new_latlon(&mut self, lat: Vec<f64>, lon: Vec<f64>) -> DivinerResult<()> {
        let mut updated = Vec::with_capacity(3);
        for product in [&self.dem, &self.slope, &self.aspect] {
            let rows_dim = product.data.rows().name().to_string();
            let cols_dim = product.data.cols().name().to_string();
            updated.push(
                product
                    .data
                    .clone()
                    .assign_row_coords(rows_dim, lat.clone())?
                    .assign_col_coords(cols_dim, lon.clone())?
                    .sort_by_cols(),
            );
        }

        for (product, data) in self.products_mut().into_iter().zip(updated) {
            product.data = data;
        }
        self.lon_convention = if lon.iter().any(|&l| l < 0.0) {
            LonConvention::Lon180
        } else {
            LonConvention::Lon360
        };
        Ok(())
    }

    fn products_mut(&mut self) -> [&mut TopoProduct; 3] {
        [&mut self.dem, &mut self.slope, &mut self.aspect]
    }

    /// Elevation at a grid index.
    ///
    /// The stored DEM already carries its band scale, so the value is
    /// returned as stored and is not multiplied by `dem_scale` again: the
    /// scale applies once, not squared. No offset is applied.
    pub fn get_elev_by_pixel(&self, ilat: usize, ilon: usize) -> DivinerResult<f64> {
        self.dem.value_by_pixel(ilat, ilon)
    }

    /// Elevation at the grid point nearest to `lat`/`lon`, scaled once like
    /// [`LolaTopo::get_elev_by_pixel`]
    pub fn get_elev_by_coord(&self, lat: f64, lon: f64) -> DivinerResult<f64> {
        self.dem.value_by_coord(lat, lon)
    }

    /// Dimensionless rise over run at a grid index
    pub fn get_slope_by_pixel(&self, ilat: usize, ilon: usize) -> DivinerResult<f64> {
        Ok(ElementOp::TanDegrees.apply(self.slope.value_by_pixel(ilat, ilon)?))
    }

    /// Dimensionless rise over run at the nearest grid point
    pub fn get_slope_by_coord(&self, lat: f64, lon: f64) -> DivinerResult<f64> {
        Ok(ElementOp::TanDegrees.apply(self.slope.value_by_coord(lat, lon)?))
    }

    pub fn get_az_by_pixel(&self, ilat: usize, ilon: usize) -> DivinerResult<f64> {
        self.aspect.value_by_pixel(ilat, ilon)
    }

    pub fn get_az_by_coord(&self, lat: f64, lon: f64) -> DivinerResult<f64> {
        self.aspect.value_by_coord(lat, lon)
    }

    /// Crop a product to a tile; latitude runs from `lat_max` down to `lat_min`
    pub fn get_slice(&self, kind: ProductKind, tile: &Tile) -> RasterHandle {
        self.product(kind)
            .data
            .clone()
            .slice_rows(tile.lat_max, tile.lat_min)
            .slice_cols(tile.lon_min, tile.lon_max)
    }

    #[cfg(feature = "plot")]
    fn plot<P: AsRef<Path>>(
        &self,
        kind: ProductKind,
        tile: &Tile,
        style: crate::core::plot::PlotStyle,
        out: P,
    ) -> DivinerResult<()> {
        let sliced = self.get_slice(kind, tile).compute_2d()?;
        crate::core::plot::render(&sliced, &style, out)
    }

    #[cfg(feature = "plot")]
    pub fn plot_dem<P: AsRef<Path>>(&self, tile: &Tile, out: P) -> DivinerResult<()> {
        use crate::core::plot::{Colormap, PlotStyle};
        self.plot(ProductKind::Dem, tile, PlotStyle::new("DEM", Colormap::Viridis), out)
    }

    #[cfg(feature = "plot")]
    pub fn plot_slope<P: AsRef<Path>>(&self, tile: &Tile, out: P) -> DivinerResult<()> {
        use crate::core::plot::{Colormap, PlotStyle};
        self.plot(
            ProductKind::Slope,
            tile,
            PlotStyle::new("Slope [degrees]", Colormap::Inferno),
            out,
        )
    }

    #[cfg(feature = "plot")]
    pub fn plot_aspect<P: AsRef<Path>>(&self, tile: &Tile, out: P) -> DivinerResult<()> {
        use crate::core::plot::{Colormap, PlotStyle};
        self.plot(
            ProductKind::Aspect,
            tile,
            PlotStyle::new("Azimuth [degrees]", Colormap::Cyclic).with_range(0.0, 360.0),
            out,
        )
    }
}

/// 90 to -90 inclusive
fn lat_grid(rows: usize) -> Vec<f64> {
    match rows {
        0 => Vec::new(),
        1 => vec![90.0],
        n => (0..n)
            .map(|i| 90.0 - 180.0 * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// 0 to 360, endpoint excluded
fn lon_grid(cols: usize) -> Vec<f64> {
    (0..cols).map(|i| 360.0 * i as f64 / cols as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stack::chunk_size;
    use crate::io::raster::MemoryRaster;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use std::sync::Arc;

    const ROWS: usize = 5;
    const COLS: usize = 8;

    /// dem: raw r*10+c, scale 2; slope: raw 22.5, scale 2; aspect: c*45
    fn memory_loader(path: &Path, chunk_scale: usize) -> DivinerResult<RasterHandle> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let source = if name.contains("topo") {
            MemoryRaster::from_band(name, Array2::from_shape_fn((ROWS, COLS), |(r, c)| (r * 10 + c) as f64))
                .with_scales(vec![2.0])
        } else if name.contains("slope") {
            MemoryRaster::from_band(name, Array2::from_elem((ROWS, COLS), 22.5)).with_scales(vec![2.0])
        } else if name.contains("az") {
            MemoryRaster::from_band(name, Array2::from_shape_fn((ROWS, COLS), |(_, c)| c as f64 * 45.0))
        } else {
            return Err(DivinerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                name.to_string(),
            )));
        };
        Ok(RasterHandle::from_source(Arc::new(source), chunk_size(chunk_scale)))
    }

    fn topo(lat_limit: Option<f64>) -> LolaTopo {
        LolaTopo::open_with("divgdr", lat_limit, &DataRoots::default(), memory_loader).unwrap()
    }

    #[test]
    fn test_grid() {
        let topo = topo(None);
        let dem = topo.dem().data();
        assert_eq!(dem.dims(), vec!["lat", "lon"]);
        assert_eq!(dem.rows().coords(), &[90.0, 45.0, 0.0, -45.0, -90.0]);

        let lons = dem.cols().coords();
        assert_eq!(lons.len(), COLS);
        assert_eq!(lons[0], 0.0);
        assert!(lons.windows(2).all(|w| w[0] < w[1]));
        assert!(lons.iter().all(|&l| (0.0..360.0).contains(&l)));

        for kind in ProductKind::ALL {
            let data = topo.product(kind).data();
            assert_eq!(data.rows().coords(), dem.rows().coords());
            assert_eq!(data.cols().coords(), dem.cols().coords());
        }
    }

    #[test]
    fn test_metadata() {
        let topo = topo(None);
        assert_eq!(topo.dem_scale(), 2.0);
        assert_eq!(topo.slope_scale(), 2.0);
        assert_eq!(topo.aspect_scale(), 1.0);
        assert_eq!(topo.dem().long_name(), Some("Elevation"));
        assert_eq!(topo.aspect().units(), Some("deg(north)"));
        assert_eq!(topo.slope().data().name(), Some("slope"));
        assert!(topo.dem().path().ends_with("divgdr/ldem_128_topo_img.tif"));
    }

    #[test]
    fn test_lookups() {
        let topo = topo(None);
        // raw 12 times scale 2, not times 4
        assert_eq!(topo.get_elev_by_pixel(1, 2).unwrap(), 24.0);
        assert_eq!(topo.get_elev_by_coord(44.0, 91.0).unwrap(), 24.0);
        assert_relative_eq!(topo.get_slope_by_pixel(3, 3).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(topo.get_slope_by_coord(-10.0, 200.0).unwrap(), 1.0, epsilon = 1e-12);
        assert!(topo.get_elev_by_pixel(ROWS, 0).is_err());
    }

    #[test]
    fn test_aspect_turned_to_north() {
        let topo = topo(None);
        assert_eq!(topo.get_az_by_pixel(0, 0).unwrap(), 180.0);
        assert_eq!(topo.get_az_by_pixel(0, 4).unwrap(), 0.0);
        assert_eq!(topo.get_az_by_coord(0.0, 315.0).unwrap(), 135.0);
    }

    #[test]
    fn test_lat_limit() {
        let topo = topo(Some(45.0));
        assert_eq!(topo.dem().data().rows().coords(), &[45.0, 0.0, -45.0]);
        assert_eq!(topo.get_elev_by_pixel(0, 0).unwrap(), 20.0);

        let sliced = topo.slice_lat(ProductKind::Slope, 0.0);
        assert_eq!(sliced.shape(), vec![1, COLS]);
    }

    #[test]
    fn test_lon_roundtrip() {
        let mut topo = topo(None);
        let before = topo.get_elev_by_coord(0.0, 270.0).unwrap();

        topo.convert_to_lon180();
        assert_eq!(topo.lon_convention(), LonConvention::Lon180);
        let lons = topo.aspect().data().cols().coords().to_vec();
        assert_eq!(lons.first(), Some(&-180.0));
        assert!(lons.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(topo.get_elev_by_coord(0.0, -90.0).unwrap(), before);
        assert_eq!(topo.slope().data().cols().coords(), lons.as_slice());

        topo.convert_to_lon360();
        assert_eq!(topo.dem().data().cols().coords()[0], 0.0);
        assert_eq!(topo.get_elev_by_coord(0.0, 270.0).unwrap(), before);
        assert_eq!(topo.dem().data().compute_2d().unwrap(), topo_dem_values());
    }

    fn topo_dem_values() -> Array2<f64> {
        Array2::from_shape_fn((ROWS, COLS), |(r, c)| (r * 10 + c) as f64 * 2.0)
    }

    #[test]
    fn test_get_slice() {
        let topo = topo(None);
        let tile = Tile::with_delta(0.0, 45.0, 45.0, 90.0);
        let sliced = topo.get_slice(ProductKind::Dem, &tile);
        assert_eq!(sliced.rows().coords(), &[45.0, 0.0]);
        assert_eq!(sliced.cols().coords(), &[45.0, 90.0, 135.0]);
        assert_eq!(sliced.compute_2d().unwrap()[[1, 0]], 21.0 * 2.0);

        assert_eq!(Tile::new(10.0, 20.0), Tile::with_bounds(10.0, 20.0, 11.0, 21.0));
    }

    #[test]
    fn test_inverted_slice_is_empty() {
        let topo = topo(None);
        let tile = Tile::with_bounds(45.0, 0.0, 0.0, 90.0);
        let sliced = topo.get_slice(ProductKind::Dem, &tile);
        assert_eq!(sliced.shape(), vec![0, 3]);
        assert_eq!(sliced.compute_2d().unwrap().len(), 0);
    }

    #[test]
    fn test_assign_new_latlon() {
        let mut topo = topo(None);
        let lat: Vec<f64> = (0..ROWS).map(|r| r as f64).collect();
        let lon: Vec<f64> = (0..COLS).map(|c| c as f64 - 4.0).collect();
        topo.assign_new_latlon(lat.clone(), lon.clone()).unwrap();
        assert_eq!(topo.lon_convention(), LonConvention::Lon180);
        assert_eq!(topo.aspect().data().rows().coords(), lat.as_slice());
        assert_eq!(topo.dem().data().cols().coords(), lon.as_slice());

        let short = vec![0.0; COLS - 1];
        assert!(matches!(
            topo.assign_new_latlon(lat.clone(), short),
            Err(DivinerError::ShapeMismatch(_))
        ));
        assert_eq!(topo.slope().data().cols().coords(), lon.as_slice());
    }

    #[test]
    fn test_unknown_dataset() {
        assert!(matches!(
            LolaTopo::open_with("pds", None, &DataRoots::default(), memory_loader),
            Err(DivinerError::Config(_))
        ));
        assert!(matches!("elevation".parse::<ProductKind>(), Err(DivinerError::Config(_))));
        assert_eq!("aspect".parse::<ProductKind>().unwrap(), ProductKind::Aspect);
    }

    #[test]
    fn test_grid_mismatch() {
        let loader = |path: &Path, chunk_scale: usize| {
            if path.to_string_lossy().contains("slope") {
                let source = MemoryRaster::from_band("slope", Array2::zeros((ROWS + 1, COLS)));
                Ok(RasterHandle::from_source(Arc::new(source), chunk_size(chunk_scale)))
            } else {
                memory_loader(path, chunk_scale)
            }
        };
        assert!(matches!(
            LolaTopo::open_with("divgdr", None, &DataRoots::default(), loader),
            Err(DivinerError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_grids() {
        assert_eq!(lat_grid(3), vec![90.0, 0.0, -90.0]);
        assert_eq!(lat_grid(1), vec![90.0]);
        assert_eq!(lon_grid(4), vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[cfg(feature = "plot")]
    #[test]
    fn test_plot_products() {
        let dir = tempfile::TempDir::new().unwrap();
        let topo = topo(None);
        let tile = Tile::with_delta(-90.0, 0.0, 180.0, 315.0);

        topo.plot_dem(&tile, dir.path().join("dem.svg")).unwrap();
        topo.plot_slope(&tile, dir.path().join("slope.svg")).unwrap();
        topo.plot_aspect(&tile, dir.path().join("aspect.svg")).unwrap();

        let svg = std::fs::read_to_string(dir.path().join("aspect.svg")).unwrap();
        assert!(svg.contains("<title>Azimuth [degrees]</title>"));
    }
}
