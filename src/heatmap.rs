//! Categorical heatmap with square cells and a labelled colour bar.

use crate::chart::{BLACK, FONT_FAMILY};
use svg::Document;
use svg::node::element::{Group, Line, Rectangle, Text};

const MAX_GRID_WIDTH: f32 = 960.0;
const MAX_CELL: f32 = 20.0;
const MIN_CELL: f32 = 2.0;
const MARGIN: f32 = 16.0;
const TITLE_HEIGHT: f32 = 40.0;
const AXIS_HEIGHT: f32 = 44.0;
const COLORBAR_WIDTH: f32 = 18.0;
const COLORBAR_ROW: f32 = 14.0;
const MIN_TICK_SPACING: f32 = 32.0;

const VIRIDIS: [(u8, u8, u8); 9] = [
    (0x44, 0x01, 0x54),
    (0x47, 0x2d, 0x7b),
    (0x3b, 0x52, 0x8b),
    (0x2c, 0x72, 0x8e),
    (0x21, 0x91, 0x8c),
    (0x28, 0xae, 0x80),
    (0x5e, 0xc9, 0x62),
    (0xad, 0xdc, 0x30),
    (0xfd, 0xe7, 0x25),
];

fn label_text(text: &str, x: f32, y: f32, size: u32) -> Text {
    Text::new(text)
        .set("x", x)
        .set("y", y)
        .set("font-family", FONT_FAMILY)
        .set("font-size", size)
        .set("fill", "#202020")
}

/// Viridis colour at `t` in [0, 1], linearly interpolated between stops.
pub fn viridis(t: f64) -> String {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(VIRIDIS.len() - 1);
    let f = scaled - lo as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[hi]);
    format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[derive(Clone, Debug, Default)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub row_labels: Vec<String>,
    /// Cell codes in `min_code..min_code + scale_labels.len()`.
    pub matrix: Vec<Vec<i32>>,
    pub min_code: i32,
    /// Colour-bar label for each code, starting at `min_code`.
    pub scale_labels: Vec<String>,
}

impl Heatmap {
    pub fn columns(&self) -> usize {
        self.matrix.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn color_for(&self, code: i32) -> String {
        let span = (self.scale_labels.len() as f64 - 1.0).max(1.0);
        viridis((code - self.min_code) as f64 / span)
    }

    /// Cells are square: one unit on x equals one unit on y.
    pub fn cell_size(&self) -> f32 {
        let columns = self.columns().max(1) as f32;
        (MAX_GRID_WIDTH / columns).clamp(MIN_CELL, MAX_CELL)
    }

    pub fn to_svg(&self) -> String {
        let cell = self.cell_size();
        let columns = self.columns();
        let rows = self.matrix.len();
        let label_width = self
            .row_labels
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .min(32) as f32
            * 6.5
            + 30.0;
        let grid_left = MARGIN + label_width;
        let grid_top = TITLE_HEIGHT;
        let grid_width = cell * columns as f32;
        let grid_height = cell * rows as f32;
        let bar_left = grid_left + grid_width + 24.0;
        let bar_height = COLORBAR_ROW * self.scale_labels.len() as f32;
        let width = bar_left + COLORBAR_WIDTH + 70.0;
        let height = grid_top + grid_height.max(bar_height + 20.0) + AXIS_HEIGHT;

        let mut doc = Document::new()
            .set("viewBox", (0, 0, width, height))
            .set("width", width)
            .set("height", height)
            .add(
                Rectangle::new()
                    .set("width", width)
                    .set("height", height)
                    .set("fill", "#ffffff"),
            )
            .add(label_text(&self.title, MARGIN, 24.0, 15));

        let mut cells = Group::new().set("shape-rendering", "crispEdges");
        for (row, codes) in self.matrix.iter().enumerate() {
            for (col, code) in codes.iter().enumerate() {
                cells = cells.add(
                    Rectangle::new()
                        .set("x", grid_left + col as f32 * cell)
                        .set("y", grid_top + row as f32 * cell)
                        .set("width", cell)
                        .set("height", cell)
                        .set("fill", self.color_for(*code)),
                );
            }
        }
        doc = doc.add(cells);

        let label_size = (cell * 0.8).clamp(6.0, 11.0) as u32;
        for (row, label) in self.row_labels.iter().enumerate() {
            doc = doc.add(
                label_text(
                    label,
                    grid_left - 6.0,
                    grid_top + (row as f32 + 0.5) * cell + label_size as f32 * 0.35,
                    label_size,
                )
                .set("text-anchor", "end"),
            );
        }

        let every = ((MIN_TICK_SPACING / cell).ceil() as usize).max(1);
        let grid_bottom = grid_top + grid_height;
        for col in (0..columns).step_by(every) {
            let x = grid_left + (col as f32 + 0.5) * cell;
            doc = doc
                .add(
                    Line::new()
                        .set("x1", x)
                        .set("y1", grid_bottom)
                        .set("x2", x)
                        .set("y2", grid_bottom + 4.0)
                        .set("stroke", BLACK)
                        .set("stroke-width", 0.8),
                )
                .add(
                    label_text(&col.to_string(), x, grid_bottom + 15.0, 9)
                        .set("text-anchor", "middle"),
                );
        }
        doc = doc.add(
            label_text(&self.x_label, grid_left + grid_width / 2.0, grid_bottom + 34.0, 11)
                .set("text-anchor", "middle"),
        );
        let (yx, yy) = (MARGIN, grid_top + grid_height / 2.0);
        doc = doc.add(
            label_text(&self.y_label, yx, yy, 11)
                .set("text-anchor", "middle")
                .set("transform", format!("rotate(-90 {yx} {yy})")),
        );

        doc = doc.add(label_text("Residues", bar_left, grid_top - 6.0, 10));
        for (idx, label) in self.scale_labels.iter().enumerate() {
            let y = grid_top + idx as f32 * COLORBAR_ROW;
            doc = doc
                .add(
                    Rectangle::new()
                        .set("x", bar_left)
                        .set("y", y)
                        .set("width", COLORBAR_WIDTH)
                        .set("height", COLORBAR_ROW)
                        .set("fill", self.color_for(self.min_code + idx as i32)),
                )
                .add(label_text(
                    label,
                    bar_left + COLORBAR_WIDTH + 6.0,
                    y + COLORBAR_ROW * 0.75,
                    10,
                ));
        }
        doc.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(viridis(0.0), "#440154");
        assert_eq!(viridis(1.0), "#fde725");
        assert_eq!(viridis(0.5), "#21918c");
        assert_eq!(viridis(f64::NAN), "#440154");
    }

    #[test]
    fn test_heatmap_svg() {
        let heatmap = Heatmap {
            title: "Alignment".to_string(),
            x_label: "Position".to_string(),
            y_label: "Sequences".to_string(),
            row_labels: vec!["a".to_string(), "b".to_string()],
            matrix: vec![vec![0, 1, 2], vec![1, -1, -1]],
            min_code: -1,
            scale_labels: vec!["*", "A", "C", "D"].into_iter().map(String::from).collect(),
        };
        assert_eq!(heatmap.cell_size(), MAX_CELL);
        assert_eq!(heatmap.color_for(-1), "#440154");
        assert_eq!(heatmap.color_for(2), "#fde725");
        let svg = heatmap.to_svg();
        // 6 cells, 4 colour-bar blocks, 1 background
        assert_eq!(svg.matches("<rect").count(), 11);
        assert!(svg.contains("Residues"));
        assert!(svg.contains("*"));
    }
}
