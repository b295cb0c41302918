//! MHC-II binding prediction tables: one line per numeric column.

use crate::{
    chart::{Axes, COLOR_CYCLE, Figure, LineSeries, Stroke},
    engine::{RawValue, TypeEngine, ViewOptions, json_preview},
    error::{EngineError, Result},
    file_unit::FileUnit,
    io_type::IoType,
    table::DataTable,
    values::{DEFAULT_HEIGHT, DEFAULT_WIDTH, apply_view_options},
};

#[derive(Clone, Debug)]
pub struct MhcTableEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl MhcTableEngine {
    pub fn new(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Self> {
        Ok(Self {
            kind,
            io_type: io_type.clone(),
            value: value.text()?.to_string(),
        })
    }

    pub fn boxed(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Box<dyn TypeEngine>> {
        Ok(Box::new(Self::new(kind, value, io_type)?))
    }

    pub fn table(&self) -> Result<DataTable> {
        DataTable::from_json_str(&self.value)
    }

    /// Numeric columns plotted against row position. Text columns such as
    /// `Peptide` are skipped.
    pub fn figure(&self, options: &ViewOptions) -> Result<Figure> {
        let table = self.table()?;
        let columns = table.numeric_columns();
        if columns.is_empty() {
            return Err(EngineError::invalid("table has no numeric columns to plot"));
        }
        let mut axes = apply_view_options(Axes::new(), options, &self.io_type.name);
        for (idx, (name, values)) in columns.iter().enumerate() {
            let color = COLOR_CYCLE[idx % COLOR_CYCLE.len()];
            axes.add_series(
                LineSeries::indexed(values, 0.0, Stroke::solid(color, 1.5)).labeled(name),
            );
        }
        axes.show_legend = true;
        tracing::debug!(kind = self.kind, series = columns.len(), "plotted binding table");
        let mut figure = Figure::new(
            options.width.unwrap_or(DEFAULT_WIDTH),
            options.height.unwrap_or(DEFAULT_HEIGHT),
        );
        figure.add_panel(axes, 1.0);
        Ok(figure)
    }
}

impl TypeEngine for MhcTableEngine {
    fn kind(&self) -> &str {
        self.kind
    }

    fn io_type(&self) -> &IoType {
        &self.io_type
    }

    fn preview(&self) -> String {
        json_preview(&self.value)
    }

    fn view_html(&self, options: &ViewOptions) -> Result<String> {
        self.figure(options)?.into_img_tag(options.image_format)
    }

    fn figure_svg(&self, options: &ViewOptions) -> Result<Option<String>> {
        Ok(Some(self.figure(options)?.to_svg()?))
    }

    fn default_ext(&self) -> &'static str {
        "csv"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        Ok(FileUnit::new(
            self.table()?.to_csv()?,
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MHC_JSON: &str = r#"{
        "Peptide": {"0": "MKVLAGQRS", "1": "KVLAGQRST", "2": "VLAGQRSTW"},
        "DRB1_0101": {"0": 12.5, "1": 40.0, "2": 7.25},
        "DRB1_0401": {"0": 3.0, "1": 18.0, "2": 55.5}
    }"#;

    fn engine(json: &str) -> MhcTableEngine {
        MhcTableEngine::new("mhcii", &RawValue::from(json), &IoType::new("MHC-II")).unwrap()
    }

    #[test]
    fn test_one_series_per_numeric_column() {
        let options = ViewOptions::default().with_labels("Peptide", "IC50");
        let figure = engine(MHC_JSON).figure(&options).unwrap();
        let axes = figure.panels().next().unwrap();
        assert_eq!(axes.series.len(), 2);
        assert_eq!(axes.series[1].stroke.color, COLOR_CYCLE[1]);
        assert_eq!(axes.y_label.as_deref(), Some("IC50"));
        let svg = figure.to_svg().unwrap();
        assert!(svg.contains("DRB1_0401"));
        assert!(svg.contains("MHC-II"));
    }

    #[test]
    fn test_preview_and_csv() {
        let engine = engine(MHC_JSON);
        assert_eq!(engine.preview(), "JSON:3 fields");
        let unit = engine.file(Some("mhc"), None).unwrap();
        assert_eq!(unit.file_name(), "mhc.csv");
        assert_eq!(
            unit.as_text(),
            Some(",Peptide,DRB1_0101,DRB1_0401\n0,MKVLAGQRS,12.5,3\n1,KVLAGQRST,40,18\n2,VLAGQRSTW,7.25,55.5\n")
        );
    }

    #[test]
    fn test_malformed_table_fails_at_render() {
        let engine = engine("{\"Peptide\": ");
        assert_eq!(engine.preview(), "{\"Peptide\": ");
        assert!(engine.view_html(&ViewOptions::default()).is_err());
        assert!(engine.file(None, None).is_err());
        let text_only = engine_text_only();
        assert!(matches!(
            text_only.figure(&ViewOptions::default()).unwrap_err(),
            EngineError::InvalidFormat(_)
        ));
    }

    fn engine_text_only() -> MhcTableEngine {
        engine(r#"{"Peptide": ["A", "B"]}"#)
    }
}
