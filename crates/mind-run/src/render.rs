use anyhow::Result;
use mind_lib::plot::{Heatmap, PlotBackend};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const MARGIN: u32 = 8;

/// Renders heat maps to a PNG file through the plotters bitmap backend.
pub struct PngHeatmap {
    path: PathBuf,
    cell_px: u32,
}

impl PngHeatmap {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            cell_px: 64,
        }
    }

    pub fn with_cell_size(mut self, cell_px: u32) -> Self {
        self.cell_px = cell_px.max(1);
        self
    }
}

impl PlotBackend for PngHeatmap {
    fn draw(&mut self, fig: &Heatmap) -> Result<()> {
        let cols = fig.cols().max(1) as u32;
        let rows = fig.rows().max(1) as u32;
        let size = (
            cols * self.cell_px + 2 * MARGIN,
            rows * self.cell_px + 2 * MARGIN,
        );
        let root = BitMapBackend::new(&self.path, size).into_drawing_area();
        root.fill(&WHITE)?;
        let cell = self.cell_px as i32;
        for (r, row) in fig.cells.iter().enumerate() {
            for (c, color) in row.iter().enumerate() {
                let x0 = MARGIN as i32 + c as i32 * cell;
                let y0 = MARGIN as i32 + r as i32 * cell;
                let corners = [(x0, y0), (x0 + cell, y0 + cell)];
                let (red, green, blue) = color.rgb();
                root.draw(&Rectangle::new(
                    corners,
                    RGBColor(red, green, blue).filled(),
                ))?;
                root.draw(&Rectangle::new(corners, BLACK.stroke_width(1)))?;
            }
        }
        root.present()?;
        Ok(())
    }
}
