//! Per-residue numeric arrays (SASA, COREX, B-factor, entropy, APL scores)
//! drawn as a single line chart and exported as a one-column CSV.

use crate::{
    chart::{Axes, COLOR_CYCLE, Figure, LineSeries, Stroke},
    engine::{RawValue, TypeEngine, ViewOptions, numbers_preview},
    error::Result,
    file_unit::FileUnit,
    io_type::IoType,
    table::DataTable,
};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;

/// Applies the shared title, axis-label and grid options to a chart panel.
/// Each label goes to its own axis.
pub fn apply_view_options(axes: Axes, options: &ViewOptions, default_title: &str) -> Axes {
    let mut axes = axes
        .title(options.title.as_deref().unwrap_or(default_title))
        .labels(options.x_label.as_deref(), options.y_label.as_deref());
    axes.grid = options.grid;
    axes
}

#[derive(Clone, Debug)]
pub struct ProteinValuesEngine {
    kind: &'static str,
    io_type: IoType,
    values: Vec<f64>,
}

impl ProteinValuesEngine {
    pub fn new(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Self> {
        Ok(Self {
            kind,
            io_type: io_type.clone(),
            values: value.numbers()?,
        })
    }

    pub fn boxed(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Box<dyn TypeEngine>> {
        Ok(Box::new(Self::new(kind, value, io_type)?))
    }

    #[inline(always)]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn figure(&self, options: &ViewOptions) -> Figure {
        let mut axes = apply_view_options(Axes::new(), options, &self.io_type.name);
        axes.add_series(LineSeries::indexed(
            &self.values,
            0.0,
            Stroke::solid(COLOR_CYCLE[0], 1.5),
        ));
        let mut figure = Figure::new(
            options.width.unwrap_or(DEFAULT_WIDTH),
            options.height.unwrap_or(DEFAULT_HEIGHT),
        );
        figure.add_panel(axes, 1.0);
        figure
    }

    pub fn to_table(&self, name: &str) -> DataTable {
        DataTable::from_padded_columns(vec![(name.to_string(), self.values.clone())])
    }
}

impl TypeEngine for ProteinValuesEngine {
    fn kind(&self) -> &str {
        self.kind
    }

    fn io_type(&self) -> &IoType {
        &self.io_type
    }

    fn preview(&self) -> String {
        numbers_preview(&self.values)
    }

    fn view_html(&self, options: &ViewOptions) -> Result<String> {
        self.figure(options).into_img_tag(options.image_format)
    }

    fn figure_svg(&self, options: &ViewOptions) -> Result<Option<String>> {
        Ok(Some(self.figure(options).to_svg()?))
    }

    fn default_ext(&self) -> &'static str {
        "csv"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        let name = self.file_name(name);
        let csv = self.to_table(name).to_csv()?;
        Ok(FileUnit::new(csv, name, ext.unwrap_or(self.default_ext())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ImageFormat;

    fn engine(values: Vec<f64>) -> ProteinValuesEngine {
        ProteinValuesEngine::new("sasa", &RawValue::Numbers(values), &IoType::new("SASA")).unwrap()
    }

    #[test]
    fn test_title_defaults_to_io_name() {
        let svg = engine(vec![0.1, 0.5, 0.3]).figure(&ViewOptions::default()).to_svg().unwrap();
        assert!(svg.contains("SASA"));
    }

    #[test]
    fn test_labels_go_to_their_own_axes() {
        let options = ViewOptions::default()
            .with_title("Accessibility")
            .with_labels("Residue", "Relative ASA")
            .with_grid(true);
        let figure = engine(vec![0.1, 0.5, 0.3]).figure(&options);
        let axes = figure.panels().next().unwrap();
        assert_eq!(axes.x_label.as_deref(), Some("Residue"));
        assert_eq!(axes.y_label.as_deref(), Some("Relative ASA"));
        assert!(axes.grid);
        let svg = figure.to_svg().unwrap();
        assert!(svg.contains("Accessibility"));
        assert!(svg.contains("Relative ASA"));
    }

    #[test]
    fn test_constant_large_values_render() {
        let engine = engine(vec![1e19, 1e19]);
        let svg = engine.figure_svg(&ViewOptions::default()).unwrap().unwrap();
        assert!(!svg.contains("NaN"));
        assert!(engine.view_html(&ViewOptions::default()).is_ok());
    }

    #[test]
    fn test_view_html_embeds_image() {
        let options = ViewOptions {
            image_format: ImageFormat::Png,
            ..Default::default()
        };
        let html = engine(vec![1.0, 2.0, 4.0]).view_html(&options).unwrap();
        assert!(html.starts_with("<img src=\"data:image/png;base64,"));
        let html = engine(vec![1.0, 2.0, 4.0]).repr_markdown().unwrap();
        assert!(html.starts_with("<img src=\"data:image/jpg;base64,"));
    }

    #[test]
    fn test_csv_round_trip() {
        let values = vec![0.1, 12.345678901234567, -3.0, 1e-7, 250.0];
        let unit = engine(values.clone()).file(Some("sasa"), None).unwrap();
        assert_eq!(unit.file_name(), "sasa.csv");
        let mut reader = csv::Reader::from_reader(unit.content());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[1], "sasa");
        let read: Vec<f64> = reader
            .records()
            .map(|r| r.unwrap()[1].parse::<f64>().unwrap())
            .collect();
        assert_eq!(read, values);
    }

    #[test]
    fn test_json_text_value() {
        let engine = ProteinValuesEngine::new(
            "corex",
            &RawValue::from("[1, 2, 3, 4]"),
            &IoType::new("COREX"),
        )
        .unwrap();
        assert_eq!(engine.preview(), "[1, 2, 3, ...] (n=4)");
        assert!(
            ProteinValuesEngine::new("corex", &RawValue::from("ACDE"), &IoType::new("x")).is_err()
        );
    }
}
