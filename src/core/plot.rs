//! Raster previews rendered as SVG images

use crate::types::{DivinerError, DivinerResult};
use ndarray::{s, Array2};
use plotters::prelude::*;
use std::path::Path;

/// Colormaps used for the different products
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Viridis,
    Inferno,
    Plasma,
    /// Cyclic map for angular data such as aspect
    Cyclic,
}

impl Colormap {
    fn gradient(&self) -> colorous::Gradient {
        match self {
            Colormap::Viridis => colorous::VIRIDIS,
            Colormap::Inferno => colorous::INFERNO,
            Colormap::Plasma => colorous::PLASMA,
            Colormap::Cyclic => colorous::SINEBOW,
        }
    }

    /// Color for a value normalized to [0, 1]
    pub fn color(&self, u: f64) -> RGBColor {
        let c = self.gradient().eval_continuous(u.clamp(0.0, 1.0)).as_tuple();
        RGBColor(c.0, c.1, c.2)
    }
}

#[derive(Debug, Clone)]
pub struct PlotStyle {
    /// Written as the SVG `<title>` element
    pub title: String,
    pub colormap: Colormap,
    /// Side of one drawn cell in output pixels
    pub cell_size: u32,
    /// Largest number of cells drawn along either axis; bigger arrays are strided
    pub max_cells: usize,
    /// Fixed color range, otherwise the finite min/max of the data
    pub range: Option<(f64, f64)>,
}

impl PlotStyle {
    pub fn new<S: Into<String>>(title: S, colormap: Colormap) -> Self {
        Self {
            title: title.into(),
            colormap,
            cell_size: 4,
            max_cells: 512,
            range: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

fn finite_range(data: &Array2<f64>) -> Option<(f64, f64)> {
    data.iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Draw `data` as a grid of colored cells, row 0 on top.
///
/// NaN cells stay white.
pub fn render<P: AsRef<Path>>(data: &Array2<f64>, style: &PlotStyle, out: P) -> DivinerResult<()> {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 {
        return Err(DivinerError::Plot("Nothing to plot in an empty array".to_string()));
    }

    let max_cells = style.max_cells.max(1);
    let stride = ((rows.max(cols) + max_cells - 1) / max_cells) as isize;
    let view = data.slice(s![..;stride, ..;stride]);
    let (view_rows, view_cols) = view.dim();

    let (lo, hi) = match style.range.or_else(|| finite_range(data)) {
        Some(range) => range,
        None => {
            log::warn!("No finite values to plot, writing a blank image");
            (0.0, 1.0)
        }
    };
    let span = if hi > lo { hi - lo } else { 1.0 };

    let cell = style.cell_size.max(1);
    let size = (view_cols as u32 * cell, view_rows as u32 * cell);
    log::info!(
        "Plotting {}x{} array (stride {}) to {}",
        rows,
        cols,
        stride,
        out.as_ref().display()
    );

    let plot_err = |e: DrawingAreaErrorKind<_>| DivinerError::Plot(e.to_string());
    {
        let root = SVGBackend::new(out.as_ref(), size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        for ((r, c), &v) in view.indexed_iter() {
            if !v.is_finite() {
                continue;
            }
            let color = style.colormap.color((v - lo) / span);
            let x = (c as u32 * cell) as i32;
            let y = (r as u32 * cell) as i32;
            root.draw(&Rectangle::new(
                [(x, y), (x + cell as i32, y + cell as i32)],
                color.filled(),
            ))
            .map_err(plot_err)?;
        }

        root.present().map_err(plot_err)?;
    }

    insert_title(out.as_ref(), &style.title)
}

/// Add a `<title>` as first child of the root `<svg>` element
fn insert_title(path: &Path, title: &str) -> DivinerResult<()> {
    if title.is_empty() {
        return Ok(());
    }
    let svg = std::fs::read_to_string(path)?;
    let open = svg
        .find("<svg")
        .and_then(|start| svg[start..].find('>').map(|end| start + end + 1))
        .ok_or_else(|| DivinerError::Plot(format!("No <svg> element in {}", path.display())))?;

    let escaped = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let mut out = String::with_capacity(svg.len() + escaped.len() + 16);
    out.push_str(&svg[..open]);
    out.push_str("\n<title>");
    out.push_str(&escaped);
    out.push_str("</title>");
    out.push_str(&svg[open..]);
    std::fs::write(path, out)?;
    Ok(())
}
