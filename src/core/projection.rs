use crate::types::{DivinerError, DivinerResult, GeoTransform, PixelWindow};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal_sys::OSRAxisMappingStrategy;
use std::fmt;

/// Geotransform plus the raster's spatial reference: everything needed to
/// locate a lon/lat position in pixel space.
///
/// Projected rasters get a GDAL/OSR transformation from the geographic CRS
/// on the same body to the raster CRS. Rasters without a projection, or with
/// a geographic one, use lon/lat directly as map coordinates.
pub struct GeoReference {
    transform: GeoTransform,
    to_map: Option<CoordTransform>,
}

impl fmt::Debug for GeoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoReference")
            .field("transform", &self.transform)
            .field("projected", &self.to_map.is_some())
            .finish()
    }
}

impl GeoReference {
    /// Build from a GDAL geotransform and projection WKT (empty when unknown)
    pub fn new(transform: GeoTransform, wkt: &str) -> DivinerResult<Self> {
        let wkt = wkt.trim();
        if wkt.is_empty() {
            log::debug!("No projection WKT, treating raster as geographic");
            return Ok(Self { transform, to_map: None });
        }

        let mut map_srs = SpatialRef::from_wkt(wkt)?;
        if !map_srs.is_projected() {
            log::debug!("Raster CRS is geographic");
            return Ok(Self { transform, to_map: None });
        }

        // always (lon, lat) and (x, y), whatever the CRS axis definitions say
        let mut geog_srs = map_srs.geog_cs()?;
        geog_srs.set_axis_mapping_strategy(OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
        map_srs.set_axis_mapping_strategy(OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
        let to_map = CoordTransform::new(&geog_srs, &map_srs)?;
        log::debug!("Raster CRS is projected, transforming from its geographic CRS");

        Ok(Self {
            transform,
            to_map: Some(to_map),
        })
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn is_projected(&self) -> bool {
        self.to_map.is_some()
    }

    /// Map coordinates of a lon/lat position in degrees
    pub fn lonlat_to_map(&self, lon: f64, lat: f64) -> DivinerResult<(f64, f64)> {
        match &self.to_map {
            None => Ok((lon, lat)),
            Some(to_map) => {
                let mut xs = [lon];
                let mut ys = [lat];
                let mut zs = [0.0];
                to_map.transform_coords(&mut xs, &mut ys, &mut zs)?;
                Ok((xs[0], ys[0]))
            }
        }
    }

    /// Fractional (col, row) of a lon/lat position
    pub fn lonlat_to_pixel(&self, lon: f64, lat: f64) -> DivinerResult<(f64, f64)> {
        let (x, y) = self.lonlat_to_map(lon, lat)?;
        Ok(self.transform.map_to_pixel(x, y))
    }

    /// Window between the upper left corner (`ul_lon`, `ul_lat`) and the
    /// point `width_degrees` further east and south.
    ///
    /// On projected grids the two corners need not map to upper left and
    /// lower right, so the window spans their pixel bounding box.
    pub fn window_from_corner(
        &self,
        ul_lon: f64,
        ul_lat: f64,
        width_degrees: f64,
    ) -> DivinerResult<PixelWindow> {
        if !(width_degrees > 0.0) {
            return Err(DivinerError::OutOfBounds(format!(
                "Window width must be positive, got {} deg",
                width_degrees
            )));
        }

        let (ul_col, ul_row) = self.lonlat_to_pixel(ul_lon, ul_lat)?;
        let (lr_col, lr_row) =
            self.lonlat_to_pixel(ul_lon + width_degrees, ul_lat - width_degrees)?;

        let col0 = ul_col.min(lr_col).floor();
        let row0 = ul_row.min(lr_row).floor();
        let width = (ul_col.max(lr_col).floor() - col0).round();
        let height = (ul_row.max(lr_row).floor() - row0).round();

        if !(col0 >= 0.0 && row0 >= 0.0 && width >= 1.0 && height >= 1.0) {
            return Err(DivinerError::OutOfBounds(format!(
                "Window at lon {} lat {} width {} deg maps to pixels ({}, {}) size {}x{}",
                ul_lon, ul_lat, width_degrees, col0, row0, width, height
            )));
        }

        Ok(PixelWindow::new(
            col0 as usize,
            row0 as usize,
            width as usize,
            height as usize,
        ))
    }
}
