use serde::{Deserialize, Serialize};

use crate::metrics::ConfusionMatrix;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

/// Grid of shaded cells, row 0 drawn at the top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heatmap {
    pub title: Option<String>,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub cells: Vec<Vec<Color>>,
}

impl Heatmap {
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map(|row| row.len()).unwrap_or(0)
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Heatmap) -> anyhow::Result<()>;
}

/// Linear blend from white (0) to `high` (1).
pub fn shade(fraction: f64, high: Color) -> Color {
    let t = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (r, g, b) = high.rgb();
    let mix = |c: u8| -> u32 { (255.0 + (c as f64 - 255.0) * t).round() as u32 };
    Color((mix(r) << 16) | (mix(g) << 8) | mix(b))
}

/// Cells shaded by count relative to the largest count in the matrix.
pub fn figure_from_confusion(title: &str, matrix: &ConfusionMatrix) -> Heatmap {
    let max = matrix.max_count().max(1) as f64;
    let high = Color(0x1F4E9A);
    Heatmap {
        title: Some(title.into()),
        row_labels: matrix.labels.clone(),
        col_labels: matrix.labels.clone(),
        cells: matrix
            .counts
            .iter()
            .map(|row| row.iter().map(|c| shade(*c as f64 / max, high)).collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_endpoints() {
        let high = Color(0x1F4E9A);
        assert_eq!(shade(0.0, high), Color(0xFFFFFF));
        assert_eq!(shade(1.0, high), high);
        assert_eq!(shade(f64::NAN, high), Color(0xFFFFFF));
    }

    #[test]
    fn confusion_figure_matches_matrix_shape() {
        let matrix = ConfusionMatrix {
            labels: vec!["a".into(), "b".into(), "c".into()],
            counts: vec![vec![2, 0, 0], vec![1, 1, 0], vec![0, 0, 3]],
        };
        let fig = figure_from_confusion("p01 svc", &matrix);
        assert_eq!(fig.rows(), 3);
        assert_eq!(fig.cols(), 3);
        assert_eq!(fig.cells[2][2], Color(0x1F4E9A));
        assert_eq!(fig.cells[0][1], Color(0xFFFFFF));
    }
}
