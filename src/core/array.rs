//! Lazy, chunked, labeled raster arrays.
//!
//! A [`RasterHandle`] records which pixels of which bands are selected and
//! which element-wise operations apply to them. Nothing is read from the
//! underlying [`RasterSource`] until one of the `compute*` methods runs, and
//! then only the chunks containing selected pixels are touched.

use crate::io::raster::RasterSource;
use crate::types::{DivinerError, DivinerResult, PixelWindow};
use ndarray::{Array1, Array2, Array3};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Deferred element-wise operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementOp {
    /// `v * factor`
    Scale(f64),
    /// `v * scale + offset`
    Affine { scale: f64, offset: f64 },
    /// Replace `v == sentinel` with NaN
    MaskEq(f64),
    /// `(v + shift) mod modulus`, floored like numpy
    Wrap { shift: f64, modulus: f64 },
    /// `tan(radians(v))`
    TanDegrees,
}

impl ElementOp {
    pub fn apply(&self, v: f64) -> f64 {
        match *self {
            ElementOp::Scale(factor) => v * factor,
            ElementOp::Affine { scale, offset } => v * scale + offset,
            ElementOp::MaskEq(sentinel) => {
                if v == sentinel {
                    f64::NAN
                } else {
                    v
                }
            }
            ElementOp::Wrap { shift, modulus } => (v + shift).rem_euclid(modulus),
            ElementOp::TanDegrees => v.to_radians().tan(),
        }
    }
}

/// Spatial axis: positions into the source plus coordinate labels
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    positions: Vec<usize>,
    coords: Vec<f64>,
}

impl Axis {
    fn new<S: Into<String>>(name: S, coords: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            positions: (0..coords.len()).collect(),
            coords,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    fn take(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            positions: indices.iter().map(|&i| self.positions[i]).collect(),
            coords: indices.iter().map(|&i| self.coords[i]).collect(),
        }
    }

    fn index(&self, i: usize) -> DivinerResult<usize> {
        if i >= self.len() {
            return Err(DivinerError::OutOfBounds(format!(
                "Index {} out of range for axis '{}' of length {}",
                i,
                self.name,
                self.len()
            )));
        }
        Ok(i)
    }

    /// Index of the coordinate closest to `target`, first one on ties
    fn nearest(&self, target: f64) -> DivinerResult<usize> {
        self.coords
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_nan())
            .min_by(|(_, a), (_, b)| {
                (*a - target)
                    .abs()
                    .partial_cmp(&(*b - target).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .ok_or_else(|| {
                DivinerError::OutOfBounds(format!("Axis '{}' has no coordinates", self.name))
            })
    }

    /// Label-based slice following the axis direction.
    ///
    /// On an ascending axis keeps `start <= c <= stop`, on a descending axis
    /// keeps `start >= c >= stop`. Bounds given against the axis direction
    /// select nothing.
    fn slice_indices(&self, start: f64, stop: f64) -> Vec<usize> {
        let descending = self.coords.len() > 1 && self.coords[0] > self.coords[self.coords.len() - 1];
        let selected: Vec<usize> = self
            .coords
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                let c = **c;
                if descending {
                    c <= start && c >= stop
                } else {
                    c >= start && c <= stop
                }
            })
            .map(|(i, _)| i)
            .collect();

        let inverted = if descending { start < stop } else { start > stop };
        if selected.is_empty() && inverted {
            log::warn!(
                "Slice {}..{} runs against the {} order of axis '{}', result is empty",
                start,
                stop,
                if descending { "descending" } else { "ascending" },
                self.name
            );
        }
        selected
    }
}

/// One band of one source plus the operations queued on it
#[derive(Debug, Clone)]
struct Layer {
    source: Arc<dyn RasterSource>,
    band: usize,
    ops: Vec<ElementOp>,
}

/// Array attributes carried through operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs {
    pub scales: Vec<f64>,
    pub long_name: Option<String>,
    pub units: Option<String>,
}

/// Lazy labeled array over one or more raster bands.
///
/// Dimensions are (band, row, col). The band axis is called `band` after
/// loading and `time` after cycle tagging or stacking; a squeezed handle with
/// a single band reports only the two spatial dimensions.
#[derive(Clone)]
pub struct RasterHandle {
    name: Option<String>,
    band_dim: String,
    band_labels: Vec<i64>,
    layers: Vec<Layer>,
    squeezed: bool,
    rows: Axis,
    cols: Axis,
    chunks: (usize, usize),
    attrs: Attrs,
}

impl fmt::Debug for RasterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterHandle")
            .field("name", &self.name)
            .field("dims", &self.dims())
            .field("shape", &self.shape())
            .field("chunks", &self.chunks)
            .finish()
    }
}

impl RasterHandle {
    /// Wrap every band of `source`. `chunks` is (x, y) in pixels.
    pub fn from_source(source: Arc<dyn RasterSource>, chunks: (usize, usize)) -> Self {
        let (cols, rows) = source.size();
        let bands = source.band_count();

        let (x_coords, y_coords): (Vec<f64>, Vec<f64>) = match source.geo_transform() {
            Some(gt) => (
                (0..cols).map(|c| gt.col_center(c)).collect(),
                (0..rows).map(|r| gt.row_center(r)).collect(),
            ),
            None => (
                (0..cols).map(|c| c as f64).collect(),
                (0..rows).map(|r| r as f64).collect(),
            ),
        };

        let attrs = Attrs {
            scales: source.scales(),
            ..Attrs::default()
        };

        let layers = (1..=bands)
            .map(|band| Layer {
                source: Arc::clone(&source),
                band,
                ops: Vec::new(),
            })
            .collect();

        Self {
            name: None,
            band_dim: "band".to_string(),
            band_labels: (1..=bands as i64).collect(),
            layers,
            squeezed: false,
            rows: Axis::new("y", y_coords),
            cols: Axis::new("x", x_coords),
            chunks: (chunks.0.max(1), chunks.1.max(1)),
            attrs,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = Some(name.into());
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    /// Chunk size as (x, y)
    pub fn chunks(&self) -> (usize, usize) {
        self.chunks
    }

    pub fn rows(&self) -> &Axis {
        &self.rows
    }

    pub fn cols(&self) -> &Axis {
        &self.cols
    }

    pub fn band_dim(&self) -> &str {
        &self.band_dim
    }

    pub fn band_labels(&self) -> &[i64] {
        &self.band_labels
    }

    pub fn band_count(&self) -> usize {
        self.layers.len()
    }

    pub fn dims(&self) -> Vec<&str> {
        let mut dims = Vec::with_capacity(3);
        if !self.squeezed {
            dims.push(self.band_dim.as_str());
        }
        dims.push(self.rows.name());
        dims.push(self.cols.name());
        dims
    }

    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(3);
        if !self.squeezed {
            shape.push(self.layers.len());
        }
        shape.push(self.rows.len());
        shape.push(self.cols.len());
        shape
    }

    /// Drop the band dimension when it has length one
    pub fn squeeze(mut self) -> Self {
        if self.layers.len() == 1 {
            self.squeezed = true;
        }
        self
    }

    /// Rename the band axis and relabel its entries
    pub fn assign_band_labels<S: Into<String>>(
        mut self,
        dim: S,
        labels: Vec<i64>,
    ) -> DivinerResult<Self> {
        if labels.len() != self.layers.len() {
            return Err(DivinerError::ShapeMismatch(format!(
                "{} labels for {} band(s)",
                labels.len(),
                self.layers.len()
            )));
        }
        self.band_dim = dim.into();
        self.band_labels = labels;
        Ok(self)
    }

    /// Replace row coordinates and rename the row dimension
    pub fn assign_row_coords<S: Into<String>>(
        mut self,
        dim: S,
        coords: Vec<f64>,
    ) -> DivinerResult<Self> {
        check_coord_len(&self.rows, coords.len())?;
        self.rows.name = dim.into();
        self.rows.coords = coords;
        Ok(self)
    }

    /// Replace column coordinates and rename the column dimension
    pub fn assign_col_coords<S: Into<String>>(
        mut self,
        dim: S,
        coords: Vec<f64>,
    ) -> DivinerResult<Self> {
        check_coord_len(&self.cols, coords.len())?;
        self.cols.name = dim.into();
        self.cols.coords = coords;
        Ok(self)
    }

    /// Remap column coordinates without touching pixel order
    pub fn map_col_coords<F: Fn(f64) -> f64>(mut self, f: F) -> Self {
        self.cols.coords.iter_mut().for_each(|c| *c = f(*c));
        self
    }

    /// Reorder columns so coordinates ascend (stable on ties)
    pub fn sort_by_cols(mut self) -> Self {
        let mut order: Vec<usize> = (0..self.cols.len()).collect();
        order.sort_by(|&a, &b| {
            self.cols.coords[a]
                .partial_cmp(&self.cols.coords[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.cols = self.cols.take(&order);
        self
    }

    /// Queue an element-wise operation on every band
    pub fn map(mut self, op: ElementOp) -> Self {
        for layer in &mut self.layers {
            layer.ops.push(op);
        }
        self
    }

    /// Select a single pixel by position, keeping the band axis
    pub fn isel(mut self, row: usize, col: usize) -> DivinerResult<Self> {
        let row = self.rows.index(row)?;
        let col = self.cols.index(col)?;
        self.rows = self.rows.take(&[row]);
        self.cols = self.cols.take(&[col]);
        Ok(self)
    }

    /// Select the pixel nearest to the given row/column coordinates
    pub fn sel_nearest(self, row_coord: f64, col_coord: f64) -> DivinerResult<Self> {
        let row = self.rows.nearest(row_coord)?;
        let col = self.cols.nearest(col_coord)?;
        self.isel(row, col)
    }

    /// Label-based slice along rows
    pub fn slice_rows(mut self, start: f64, stop: f64) -> Self {
        let indices = self.rows.slice_indices(start, stop);
        self.rows = self.rows.take(&indices);
        self
    }

    /// Label-based slice along columns
    pub fn slice_cols(mut self, start: f64, stop: f64) -> Self {
        let indices = self.cols.slice_indices(start, stop);
        self.cols = self.cols.take(&indices);
        self
    }

    /// Concatenate handles along the band axis, in the given order.
    ///
    /// Spatial coordinates, chunks and attributes come from the first handle.
    pub fn concat<S: Into<String>>(handles: Vec<RasterHandle>, dim: S) -> DivinerResult<Self> {
        let mut iter = handles.into_iter();
        let mut result = iter.next().ok_or_else(|| {
            DivinerError::Config("Cannot concatenate an empty list of arrays".to_string())
        })?;
        result.band_dim = dim.into();
        result.squeezed = false;

        for handle in iter {
            if handle.rows.len() != result.rows.len() || handle.cols.len() != result.cols.len() {
                return Err(DivinerError::ShapeMismatch(format!(
                    "Cannot concatenate {}x{} array onto {}x{}",
                    handle.rows.len(),
                    handle.cols.len(),
                    result.rows.len(),
                    result.cols.len()
                )));
            }
            if handle.rows.positions != result.rows.positions
                || handle.cols.positions != result.cols.positions
            {
                return Err(DivinerError::ShapeMismatch(
                    "Cannot concatenate arrays with different pixel selections".to_string(),
                ));
            }
            result.band_labels.extend(handle.band_labels);
            result.layers.extend(handle.layers);
        }

        Ok(result)
    }

    /// Evaluate every band into a (band, row, col) array
    pub fn compute(&self) -> DivinerResult<Array3<f64>> {
        let (nrows, ncols) = (self.rows.len(), self.cols.len());
        let mut out = Array3::from_elem((self.layers.len(), nrows, ncols), f64::NAN);
        if nrows == 0 || ncols == 0 {
            return Ok(out);
        }

        for (b, layer) in self.layers.iter().enumerate() {
            let plan = ChunkPlan::new(&self.rows.positions, &self.cols.positions, self.chunks);
            log::debug!(
                "Computing band {} of {}: {} chunk(s)",
                layer.band,
                layer.source.description(),
                plan.windows.len()
            );
            let blocks = layer.source.read_windows(layer.band, &plan.windows)?;

            for (block, (window, targets)) in blocks.iter().zip(plan.windows.iter().zip(&plan.targets)) {
                for &(out_row, out_col, src_row, src_col) in targets {
                    let raw = block[[src_row - window.yoff, src_col - window.xoff]];
                    out[[b, out_row, out_col]] = layer.ops.iter().fold(raw, |v, op| op.apply(v));
                }
            }
        }

        Ok(out)
    }

    /// Evaluate a single-band handle into a (row, col) array
    pub fn compute_2d(&self) -> DivinerResult<Array2<f64>> {
        if self.layers.len() != 1 {
            return Err(DivinerError::ShapeMismatch(format!(
                "Expected a single band, found {}",
                self.layers.len()
            )));
        }
        Ok(self.compute()?.index_axis_move(ndarray::Axis(0), 0))
    }

    /// Evaluate a single-pixel handle into one value per band
    pub fn compute_series(&self) -> DivinerResult<Array1<f64>> {
        if self.rows.len() != 1 || self.cols.len() != 1 {
            return Err(DivinerError::ShapeMismatch(format!(
                "Expected a single pixel, found {}x{}",
                self.rows.len(),
                self.cols.len()
            )));
        }
        let values = self.compute()?;
        Ok(values.iter().copied().collect())
    }

    /// Evaluate a single-band, single-pixel handle
    pub fn compute_scalar(&self) -> DivinerResult<f64> {
        let series = self.compute_series()?;
        if series.len() != 1 {
            return Err(DivinerError::ShapeMismatch(format!(
                "Expected a single value, found {}",
                series.len()
            )));
        }
        Ok(series[0])
    }
}

fn check_coord_len(axis: &Axis, len: usize) -> DivinerResult<()> {
    if axis.len() != len {
        return Err(DivinerError::ShapeMismatch(format!(
            "{} coordinates for axis '{}' of length {}",
            len,
            axis.name,
            axis.len()
        )));
    }
    Ok(())
}

/// Source windows to read and where their pixels land in the output
struct ChunkPlan {
    windows: Vec<PixelWindow>,
    /// (out_row, out_col, src_row, src_col) per window
    targets: Vec<Vec<(usize, usize, usize, usize)>>,
}

impl ChunkPlan {
    fn new(rows: &[usize], cols: &[usize], chunks: (usize, usize)) -> Self {
        let (chunk_x, chunk_y) = chunks;
        let row_groups = group_by_chunk(rows, chunk_y);
        let col_groups = group_by_chunk(cols, chunk_x);

        let mut windows = Vec::with_capacity(row_groups.len() * col_groups.len());
        let mut targets = Vec::with_capacity(windows.capacity());

        for row_members in row_groups.values() {
            let (row_min, row_max) = span(row_members);
            for col_members in col_groups.values() {
                let (col_min, col_max) = span(col_members);
                windows.push(PixelWindow::new(
                    col_min,
                    row_min,
                    col_max - col_min + 1,
                    row_max - row_min + 1,
                ));

                let mut cell = Vec::with_capacity(row_members.len() * col_members.len());
                for &(out_row, src_row) in row_members {
                    for &(out_col, src_col) in col_members {
                        cell.push((out_row, out_col, src_row, src_col));
                    }
                }
                targets.push(cell);
            }
        }

        Self { windows, targets }
    }
}

/// (output index, source position) pairs keyed by chunk number
fn group_by_chunk(positions: &[usize], chunk: usize) -> BTreeMap<usize, Vec<(usize, usize)>> {
    let mut groups: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
    for (out, &pos) in positions.iter().enumerate() {
        groups.entry(pos / chunk).or_default().push((out, pos));
    }
    groups
}

fn span(members: &[(usize, usize)]) -> (usize, usize) {
    members.iter().fold((usize::MAX, 0), |(lo, hi), &(_, pos)| {
        (lo.min(pos), hi.max(pos))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::raster::MemoryRaster;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn grid(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * 100 + c) as f64)
    }

    fn handle(data: Array2<f64>, chunks: (usize, usize)) -> (Arc<MemoryRaster>, RasterHandle) {
        let source = Arc::new(MemoryRaster::from_band("mem", data));
        let handle = RasterHandle::from_source(source.clone(), chunks);
        (source, handle)
    }

    #[test]
    fn test_lazy_until_compute() {
        let (source, handle) = handle(grid(4, 6), (4, 2));
        let scaled = handle.map(ElementOp::Scale(2.0)).slice_rows(1.0, 2.0);
        assert_eq!(source.reads(), 0);

        let values = scaled.compute().unwrap();
        assert!(source.reads() > 0);
        assert_eq!(values.dim(), (1, 2, 6));
        assert_eq!(values[[0, 0, 3]], 206.0);
        assert_eq!(values[[0, 1, 5]], 410.0);
    }

    #[test]
    fn test_chunking_does_not_change_values() {
        let data = grid(7, 9);
        for chunks in [(1, 1), (2, 3), (4, 4), (9, 7), (100, 100)] {
            let (_, h) = handle(data.clone(), chunks);
            assert_eq!(h.compute_2d().unwrap(), data);
        }
    }

    #[test]
    fn test_only_needed_chunks_are_read() {
        let (source, h) = handle(grid(8, 8), (2, 2));
        let value = h.isel(5, 6).unwrap().compute_scalar().unwrap();
        assert_eq!(value, 506.0);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_dims_and_squeeze() {
        let (_, h) = handle(grid(2, 3), (2, 2));
        assert_eq!(h.dims(), vec!["band", "y", "x"]);
        assert_eq!(h.shape(), vec![1, 2, 3]);

        let h = h.squeeze();
        assert_eq!(h.dims(), vec!["y", "x"]);
        assert_eq!(h.shape(), vec![2, 3]);
    }

    #[test]
    fn test_relabel_and_nearest() {
        let (_, h) = handle(grid(3, 4), (4, 4));
        let h = h
            .assign_row_coords("lat", vec![10.0, 0.0, -10.0])
            .unwrap()
            .assign_col_coords("lon", vec![0.0, 90.0, 180.0, 270.0])
            .unwrap();
        assert_eq!(h.dims(), vec!["band", "lat", "lon"]);

        let v = h.clone().sel_nearest(-4.0, 100.0).unwrap().compute_scalar().unwrap();
        assert_eq!(v, 101.0);
        let v = h.sel_nearest(-6.0, 230.0).unwrap().compute_scalar().unwrap();
        assert_eq!(v, 203.0);
    }

    #[test]
    fn test_coord_length_checked() {
        let (_, h) = handle(grid(3, 4), (4, 4));
        assert!(matches!(
            h.assign_row_coords("lat", vec![1.0]),
            Err(DivinerError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_slice_follows_axis_direction() {
        let (_, h) = handle(grid(5, 5), (8, 8));
        let h = h
            .assign_row_coords("lat", vec![2.0, 1.0, 0.0, -1.0, -2.0])
            .unwrap()
            .assign_col_coords("lon", vec![0.0, 1.0, 2.0, 3.0, 4.0])
            .unwrap();

        let tile = h.clone().slice_rows(1.0, -1.0).slice_cols(1.0, 2.0);
        assert_eq!(tile.rows().coords(), &[1.0, 0.0, -1.0]);
        assert_eq!(tile.cols().coords(), &[1.0, 2.0]);
        assert_eq!(
            tile.compute_2d().unwrap(),
            array![[101.0, 102.0], [201.0, 202.0], [301.0, 302.0]]
        );

        let inverted = h.slice_rows(-1.0, 1.0);
        assert_eq!(inverted.shape(), vec![1, 0, 5]);
        assert_eq!(inverted.compute().unwrap().len(), 0);
    }

    #[test]
    fn test_sort_by_cols() {
        let (_, h) = handle(grid(1, 4), (8, 8));
        let h = h
            .assign_col_coords("lon", vec![0.0, 90.0, 180.0, 270.0])
            .unwrap()
            .map_col_coords(|lon| ((lon + 180.0) % 360.0) - 180.0)
            .sort_by_cols();
        assert_eq!(h.cols().coords(), &[-180.0, -90.0, 0.0, 90.0]);
        assert_eq!(h.compute_2d().unwrap(), array![[2.0, 3.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_element_ops() {
        assert_eq!(ElementOp::Scale(0.5).apply(4.0), 2.0);
        assert_eq!(ElementOp::Affine { scale: 2.0, offset: 1.0 }.apply(3.0), 7.0);
        assert!(ElementOp::MaskEq(-32768.0).apply(-32768.0).is_nan());
        assert_eq!(ElementOp::MaskEq(-32768.0).apply(5.0), 5.0);
        assert_eq!(ElementOp::Wrap { shift: 180.0, modulus: 360.0 }.apply(270.0), 90.0);
        assert_eq!(ElementOp::Wrap { shift: 180.0, modulus: 360.0 }.apply(-200.0), 340.0);
        assert_relative_eq!(ElementOp::TanDegrees.apply(45.0), 1.0, epsilon = 1e-12);
        assert!(ElementOp::Affine { scale: 2.0, offset: 1.0 }.apply(f64::NAN).is_nan());
    }

    #[test]
    fn test_concat() {
        let (_, a) = handle(grid(2, 2), (2, 2));
        let (_, b) = handle(grid(2, 2) + 1000.0, (2, 2));
        let (_, c) = handle(grid(3, 2), (2, 2));

        let stacked = RasterHandle::concat(vec![a.clone(), b], "time").unwrap();
        assert_eq!(stacked.dims(), vec!["time", "y", "x"]);
        assert_eq!(stacked.shape(), vec![2, 2, 2]);
        let series = stacked.isel(1, 1).unwrap().compute_series().unwrap();
        assert_eq!(series.to_vec(), vec![101.0, 1101.0]);

        assert!(matches!(
            RasterHandle::concat(vec![a, c], "time"),
            Err(DivinerError::ShapeMismatch(_))
        ));
        assert!(matches!(
            RasterHandle::concat(Vec::new(), "time"),
            Err(DivinerError::Config(_))
        ));
    }

    #[test]
    fn test_out_of_range_isel() {
        let (_, h) = handle(grid(2, 2), (2, 2));
        assert!(matches!(h.isel(2, 0), Err(DivinerError::OutOfBounds(_))));
    }
}
