//! Composite antigen table: per-residue scores over the primary sequence and
//! a peptide-level TP/FN track, exported as a reconstructed CSV.

use crate::{
    chart::{Axes, BLACK, BLUE, CYAN, Figure, LineSeries, Locator, MAGENTA, RED, Stroke, YELLOW},
    engine::{RawValue, TypeEngine, ViewOptions, json_preview},
    error::{EngineError, Result},
    file_unit::FileUnit,
    io_type::IoType,
    scoring::{Label, Percentile, ScoreTrack},
    table::DataTable,
};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const FIGURE_WIDTH: u32 = 640;
pub const FIGURE_HEIGHT: u32 = 680;
const PANEL_GAP: u32 = 48;
const LONG_SEQUENCE: usize = 500;

/// Per-residue series: input field, plot label, export label, colour, width.
const RESIDUE_SERIES: [(&str, &str, &str, &str, f32); 6] = [
    ("APL", "Likelihood", "Likelihood", MAGENTA, 2.0),
    ("Aggregate", "Aggregate", "Aggregate", BLUE, 2.0),
    ("COREX", "COREX", "COREX", RED, 1.0),
    ("SASA", "ASA", "ASA", BLUE, 1.0),
    ("B-Factor", "B-factor", "B-factor", CYAN, 1.0),
    ("Sequence Entropy", "Seq Entropy", "Conservation", YELLOW, 1.0),
];

pub(crate) fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| EngineError::missing(name))
}

/// A nested JSON document stored either as an encoded string or inline.
pub(crate) fn embedded_json(value: Value, field: &str) -> Result<Value> {
    match value {
        Value::String(text) => serde_json::from_str(&text).map_err(|e| {
            EngineError::invalid(format!("field '{field}' is not valid JSON: {e}"))
        }),
        other => Ok(other),
    }
}

#[derive(Debug, Default, Deserialize)]
struct AplTableFields {
    #[serde(rename = "Antigen")]
    antigen: Option<String>,
    #[serde(rename = "APL")]
    apl: Option<Vec<f64>>,
    #[serde(rename = "Aggregate")]
    aggregate: Option<Vec<f64>>,
    #[serde(rename = "COREX")]
    corex: Option<Vec<f64>>,
    #[serde(rename = "SASA")]
    sasa: Option<Vec<f64>>,
    #[serde(rename = "B-Factor")]
    b_factor: Option<Vec<f64>>,
    #[serde(rename = "Sequence Entropy")]
    sequence_entropy: Option<Vec<f64>>,
    #[serde(rename = "Peptide-Likelihood")]
    peptide_likelihood: Option<Vec<f64>>,
    #[serde(rename = "APL-Threshold")]
    threshold: Option<Percentile>,
    #[serde(rename = "Regular-Mers")]
    regular_mers: Option<Value>,
}

impl AplTableFields {
    /// The six per-residue arrays, in plotting order.
    fn residue_series(&self) -> Result<Vec<Vec<f64>>> {
        let fields = [
            &self.apl,
            &self.aggregate,
            &self.corex,
            &self.sasa,
            &self.b_factor,
            &self.sequence_entropy,
        ];
        fields
            .into_iter()
            .zip(RESIDUE_SERIES.iter())
            .map(|(values, (name, ..))| required(values.clone(), name))
            .collect()
    }
}

/// Labels of the regular-mer records, in document order.
fn regular_mer_labels(value: Value) -> Result<Vec<Label>> {
    let records: Map<String, Value> = match embedded_json(value, "Regular-Mers")? {
        Value::Object(map) => map,
        _ => {
            return Err(EngineError::invalid(
                "Regular-Mers must map identifiers to records",
            ));
        }
    };
    records
        .values()
        .map(|record| {
            let label = record.get("label").ok_or_else(|| EngineError::missing("label"))?;
            Label::from_value(label)
        })
        .collect()
}

/// Validated composite record.
#[derive(Clone, Debug, PartialEq)]
pub struct AplTable {
    pub antigen: String,
    /// APL, Aggregate, COREX, SASA, B-Factor and Sequence Entropy.
    pub residue_series: Vec<Vec<f64>>,
    pub peptide_likelihood: Vec<f64>,
    pub threshold: Percentile,
    pub labels: Vec<Label>,
}

impl AplTable {
    pub fn parse(text: &str) -> Result<Self> {
        let fields: AplTableFields = serde_json::from_str(text)?;
        let antigen = required(fields.antigen.clone(), "Antigen")?;
        let residue_series = fields.residue_series()?;
        Ok(Self {
            antigen,
            residue_series,
            peptide_likelihood: required(fields.peptide_likelihood, "Peptide-Likelihood")?,
            threshold: required(fields.threshold, "APL-Threshold")?,
            labels: regular_mer_labels(required(fields.regular_mers, "Regular-Mers")?)?,
        })
    }

    /// Length of the Aggregate array, which every plotted series follows.
    pub fn sequence_length(&self) -> usize {
        self.residue_series[1].len()
    }

    fn residue_axes(&self, options: &ViewOptions) -> Result<Axes> {
        let len = self.sequence_length();
        let mut axes = Axes::new()
            .title(
                options
                    .title
                    .as_deref()
                    .unwrap_or(&format!("{} Residue APL", self.antigen)),
            )
            .labels(
                Some(options.x_label.as_deref().unwrap_or("Primary Sequence")),
                Some(options.y_label.as_deref().unwrap_or("Score")),
            );
        axes.grid = options.grid;
        for (values, (name, label, _, color, width)) in
            self.residue_series.iter().zip(RESIDUE_SERIES.iter())
        {
            if values.len() < len {
                return Err(EngineError::LengthMismatch {
                    field: name.to_string(),
                    expected: len,
                    found: values.len(),
                });
            }
            axes.add_series(
                LineSeries::indexed(&values[..len], 1.0, Stroke::solid(color, *width))
                    .labeled(label),
            );
        }
        let (lo, hi) = self
            .residue_series
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if lo <= hi {
            axes.y_limits = Some((lo - 0.1, hi + 0.1));
        }
        axes.x_limits = Some((0.0, len as f64 + 1.0));
        axes.major_x = Locator::Multiple(if len > LONG_SEQUENCE { 100.0 } else { 50.0 });
        axes.minor_x = Some(10.0);
        axes.axhline(0.0, Stroke::dashed(BLACK, 1.0));
        axes.show_legend = true;
        Ok(axes)
    }

    pub fn peptide_track(&self) -> Result<ScoreTrack> {
        ScoreTrack::build(
            &format!("{} Peptide APL", self.antigen),
            &self.peptide_likelihood,
            &self.labels,
            self.threshold,
        )
    }

    pub fn figure(&self, options: &ViewOptions) -> Result<Figure> {
        let mut figure = Figure::new(
            options.width.unwrap_or(FIGURE_WIDTH),
            options.height.unwrap_or(FIGURE_HEIGHT),
        )
        .with_hspace(PANEL_GAP);
        figure.add_panel(self.residue_axes(options)?, 3.0);
        figure.add_panel(self.peptide_track()?.axes(), 1.0);
        Ok(figure)
    }
}

#[derive(Clone, Debug)]
pub struct AplTableEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl AplTableEngine {
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

    pub fn record(&self) -> Result<AplTable> {
        AplTable::parse(&self.value)
    }

    /// Export frame under display labels, padded with NaN to the longest
    /// series. Only the per-residue arrays are needed.
    pub fn to_table(&self) -> Result<DataTable> {
        let fields: AplTableFields = serde_json::from_str(&self.value)?;
        let columns = fields
            .residue_series()?
            .into_iter()
            .zip(RESIDUE_SERIES.iter())
            .map(|(values, (_, _, export, ..))| (export.to_string(), values))
            .collect();
        Ok(DataTable::from_padded_columns(columns))
    }
}

impl TypeEngine for AplTableEngine {
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
        let figure = self.record()?.figure(options)?;
        figure.into_img_tag(options.image_format)
    }

    fn figure_svg(&self, options: &ViewOptions) -> Result<Option<String>> {
        Ok(Some(self.record()?.figure(options)?.to_svg()?))
    }

    fn default_ext(&self) -> &'static str {
        "csv"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        Ok(FileUnit::new(
            self.to_table()?.to_csv()?,
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ImageFormat;
    use crate::scoring::MarkerKind;

    const WITHOUT_APL: &str = r#"{"Antigen":"X","Aggregate":[0.1,0.2],"COREX":[0.1,0.2],"SASA":[0.1,0.2],"B-Factor":[0.1,0.2],"Sequence Entropy":[0.1,0.2],"Peptide-Likelihood":[1,5],"APL-Threshold":0.5,"Regular-Mers":"{}"}"#;

    const WITH_APL: &str = r#"{"Antigen":"X","APL":[0.3,0.4],"Aggregate":[0.1,0.2],"COREX":[0.1,0.2],"SASA":[0.1,0.2],"B-Factor":[0.1,0.2],"Sequence Entropy":[0.1,0.2],"Peptide-Likelihood":[1,5],"APL-Threshold":0.5,"Regular-Mers":"{}"}"#;

    fn engine(json: &str) -> AplTableEngine {
        AplTableEngine::new("apl-table", &RawValue::from(json), &IoType::new("apl")).unwrap()
    }

    #[test]
    fn test_composite_renders_and_exports() {
        let engine = engine(WITH_APL);
        let svg = engine.figure_svg(&ViewOptions::default()).unwrap().unwrap();
        assert!(svg.contains("X Residue APL"));
        assert!(svg.contains("X Peptide APL"));
        assert!(svg.contains("Seq Entropy"));
        let html = engine
            .view_html(&ViewOptions {
                image_format: ImageFormat::Png,
                ..Default::default()
            })
            .unwrap();
        assert!(html.starts_with("<img src=\"data:image/png;base64,"));

        let unit = engine.file(Some("apl"), None).unwrap();
        let csv = unit.as_text().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(",Likelihood,Aggregate,COREX,ASA,B-factor,Conservation")
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_missing_apl_is_error() {
        let engine = engine(WITHOUT_APL);
        assert!(matches!(
            engine.view_html(&ViewOptions::default()).unwrap_err(),
            EngineError::MissingField(field) if field == "APL"
        ));
        assert!(matches!(
            engine.file(None, None).unwrap_err(),
            EngineError::MissingField(field) if field == "APL"
        ));
    }

    #[test]
    fn test_missing_threshold_is_error() {
        let json = WITH_APL.replace(r#""APL-Threshold":0.5,"#, "");
        assert!(matches!(
            AplTable::parse(&json).unwrap_err(),
            EngineError::MissingField(field) if field == "APL-Threshold"
        ));
    }

    #[test]
    fn test_export_pads_with_nan() {
        let json = WITH_APL.replace(r#""COREX":[0.1,0.2]"#, r#""COREX":[0.1,0.2,0.3]"#);
        let table = engine(&json).to_table().unwrap();
        assert_eq!(table.rows(), 3);
        assert!(table.numeric_column("Likelihood").unwrap()[2].is_nan());
        let csv = table.to_csv().unwrap();
        assert!(csv.ends_with("2,,,0.3,,,\n"));
    }

    #[test]
    fn test_short_series_is_length_mismatch() {
        let json = WITH_APL.replace(r#""SASA":[0.1,0.2]"#, r#""SASA":[0.1]"#);
        let record = AplTable::parse(&json).unwrap();
        assert!(matches!(
            record.figure(&ViewOptions::default()).unwrap_err(),
            EngineError::LengthMismatch { field, expected: 2, found: 1 } if field == "SASA"
        ));
    }

    #[test]
    fn test_residue_axes_settings() {
        let mut record = AplTable::parse(WITH_APL).unwrap();
        let figure = record.figure(&ViewOptions::default()).unwrap();
        let top = figure.panels().next().unwrap();
        assert_eq!(top.x_limits, Some((0.0, 3.0)));
        assert_eq!(top.major_x, Locator::Multiple(50.0));
        assert_eq!(top.minor_x, Some(10.0));
        let (lo, hi) = top.y_limits.unwrap();
        assert!((lo - 0.0).abs() < 1e-9 && (hi - 0.5).abs() < 1e-9);
        assert_eq!(top.series[0].points, vec![(1.0, 0.3), (2.0, 0.4)]);

        record.residue_series = vec![vec![0.5; 600]; 6];
        let figure = record.figure(&ViewOptions::default()).unwrap();
        assert_eq!(
            figure.panels().next().unwrap().major_x,
            Locator::Multiple(100.0)
        );
    }

    #[test]
    fn test_view_options_override_top_panel() {
        let record = AplTable::parse(WITH_APL).unwrap();
        let options = ViewOptions::default()
            .with_title("T")
            .with_labels("XL", "YL")
            .with_grid(true);
        let figure = record.figure(&options).unwrap();
        let panels: Vec<&Axes> = figure.panels().collect();
        let top = panels[0];
        assert_eq!(top.title.as_deref(), Some("T"));
        assert_eq!(top.x_label.as_deref(), Some("XL"));
        assert_eq!(top.y_label.as_deref(), Some("YL"));
        assert!(top.grid);
        assert_eq!(panels[1].title.as_deref(), Some("X Peptide APL"));
        assert_eq!(panels[1].x_label, None);
        assert!(!panels[1].grid);

        let defaults = record.figure(&ViewOptions::default()).unwrap();
        let top = defaults.panels().next().unwrap();
        assert_eq!(top.title.as_deref(), Some("X Residue APL"));
        assert_eq!(top.x_label.as_deref(), Some("Primary Sequence"));
        assert_eq!(top.y_label.as_deref(), Some("Score"));
    }

    #[test]
    fn test_long_sequence_keeps_minor_ticks() {
        let mut record = AplTable::parse(WITH_APL).unwrap();
        record.residue_series = vec![vec![0.5; 34350]; 6];
        let figure = record.figure(&ViewOptions::default()).unwrap();
        let top = figure.panels().next().unwrap();
        assert_eq!(top.x_ticks().len(), 344);
        let minor = top.minor_x_ticks();
        assert!(!minor.is_empty());
        assert!(minor.len() <= crate::chart::MAX_TICKS);
    }

    #[test]
    fn test_regular_mer_labels_in_order() {
        let json = WITH_APL
            .replace(r#""Peptide-Likelihood":[1,5]"#, r#""Peptide-Likelihood":[1,5,3,2]"#)
            .replace(
                r#""Regular-Mers":"{}""#,
                r#""Regular-Mers":{"m1":{"label":true},"m2":{"label":"True"},"m3":{"label":0},"m4":{"label":false}}"#,
            );
        let record = AplTable::parse(&json).unwrap();
        assert_eq!(
            record.labels,
            vec![Label(true), Label(true), Label(false), Label(false)]
        );
        let track = record.peptide_track().unwrap();
        assert_eq!(track.count(MarkerKind::TruePositive), 1);
        assert_eq!(track.count(MarkerKind::FalseNegative), 1);
    }

    #[test]
    fn test_regular_mer_without_label() {
        let json = WITH_APL.replace(r#""Regular-Mers":"{}""#, r#""Regular-Mers":"{\"m1\":{}}""#);
        assert!(matches!(
            AplTable::parse(&json).unwrap_err(),
            EngineError::MissingField(field) if field == "label"
        ));
    }
}
