//! APL and MHC-II predictions side by side: one TP/FN score track per
//! score column, exported as the peptide-joined frame.

use crate::{
    apl_table::{embedded_json, required},
    chart::{Axes, Figure},
    engine::{RawValue, TypeEngine, ViewOptions, json_preview},
    error::Result,
    file_unit::FileUnit,
    io_type::IoType,
    scoring::{Label, Percentile, ScoreTrack},
    table::{Cell, DataTable},
};
use serde::Deserialize;
use serde_json::Value;

pub const PEPTIDE_KEY: &str = "Peptide";
pub const COMBINED_PREFIX: &str = "combined-";
const FIGURE_WIDTH: u32 = 640;
const MIN_FIGURE_HEIGHT: u32 = 480;
const PANEL_HEIGHT: u32 = 170;
const PANEL_GAP: u32 = 36;

#[derive(Debug, Default, Deserialize)]
struct AplMhcFields {
    #[serde(rename = "MHC")]
    mhc: Option<Value>,
    #[serde(rename = "APL-MHC")]
    combined: Option<Value>,
    #[serde(rename = "Peptide-Likelihood")]
    peptide_likelihood: Option<Vec<f64>>,
    #[serde(rename = "Labels")]
    labels: Option<Vec<Label>>,
    #[serde(rename = "Antigen")]
    antigen: Option<String>,
    #[serde(rename = "APL-Threshold")]
    threshold: Option<Percentile>,
}

fn peptide_table(value: Value, field: &str) -> Result<DataTable> {
    DataTable::from_json_value(&embedded_json(value, field)?)?.set_index(PEPTIDE_KEY)
}

/// Validated combined record. Both tables are indexed by peptide.
#[derive(Clone, Debug, PartialEq)]
pub struct AplMhcTable {
    pub antigen: String,
    pub mhc: DataTable,
    pub combined: DataTable,
    pub peptide_likelihood: Vec<f64>,
    pub labels: Vec<Label>,
    pub threshold: Percentile,
}

impl AplMhcTable {
    pub fn parse(text: &str) -> Result<Self> {
        let fields: AplMhcFields = serde_json::from_str(text)?;
        Ok(Self {
            mhc: peptide_table(required(fields.mhc, "MHC")?, "MHC")?,
            combined: peptide_table(required(fields.combined, "APL-MHC")?, "APL-MHC")?,
            peptide_likelihood: required(fields.peptide_likelihood, "Peptide-Likelihood")?,
            labels: required(fields.labels, "Labels")?,
            antigen: required(fields.antigen, "Antigen")?,
            threshold: required(fields.threshold, "APL-Threshold")?,
        })
    }

    /// Likelihood track, then one per MHC column, then one per combined
    /// column. Every track uses the top-level labels.
    pub fn tracks(&self) -> Result<Vec<ScoreTrack>> {
        let antigen = &self.antigen;
        let mut tracks = vec![ScoreTrack::build(
            &format!("{antigen} Peptide APL"),
            &self.peptide_likelihood,
            &self.labels,
            self.threshold,
        )?];
        for name in self.mhc.column_names() {
            tracks.push(ScoreTrack::build(
                &format!("{antigen} MHC-II ({name})"),
                &self.mhc.numeric_column(name)?,
                &self.labels,
                self.threshold,
            )?);
        }
        for name in self.combined.column_names() {
            tracks.push(ScoreTrack::build(
                &format!("{antigen} APL & MHC-II ({name}) Combined"),
                &self.combined.numeric_column(name)?,
                &self.labels,
                self.threshold,
            )?);
        }
        Ok(tracks)
    }

    pub fn figure(&self, options: &ViewOptions) -> Result<Figure> {
        let tracks = self.tracks()?;
        let longest = tracks.iter().map(|t| t.scores.len()).max().unwrap_or(0);
        let panels: Vec<Axes> = tracks
            .iter()
            .enumerate()
            .map(|(idx, track)| {
                let mut axes = track.axes();
                axes.x_limits = Some((0.0, longest as f64 + 1.0));
                axes.grid = options.grid;
                let x_label = if idx + 1 == tracks.len() {
                    options.x_label.as_deref()
                } else {
                    None
                };
                axes.labels(x_label, options.y_label.as_deref())
            })
            .collect();
        let height = options
            .height
            .unwrap_or((PANEL_HEIGHT * panels.len() as u32).max(MIN_FIGURE_HEIGHT));
        let mut figure = Figure::new(options.width.unwrap_or(FIGURE_WIDTH), height)
            .with_title(options.title.as_deref())
            .with_hspace(PANEL_GAP);
        for axes in panels {
            figure.add_panel(axes, 1.0);
        }
        Ok(figure)
    }

    /// MHC columns joined with `combined-` prefixed columns on the peptide
    /// key, plus the raw likelihood.
    pub fn merged(&self) -> Result<DataTable> {
        let combined = self.combined.clone().prefix_columns(COMBINED_PREFIX);
        let mut merged = self.mhc.inner_join(&combined);
        tracing::debug!(
            mhc = self.mhc.rows(),
            combined = combined.rows(),
            joined = merged.rows(),
            "merged peptide tables"
        );
        let likelihood = self.peptide_likelihood.iter().copied().map(Cell::from).collect();
        merged.push_column("likelihood", likelihood)?;
        Ok(merged)
    }
}

#[derive(Clone, Debug)]
pub struct AplMhcTableEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl AplMhcTableEngine {
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

    pub fn record(&self) -> Result<AplMhcTable> {
        AplMhcTable::parse(&self.value)
    }
}

impl TypeEngine for AplMhcTableEngine {
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
        self.record()?
            .figure(options)?
            .into_img_tag(options.image_format)
    }

    fn figure_svg(&self, options: &ViewOptions) -> Result<Option<String>> {
        Ok(Some(self.record()?.figure(options)?.to_svg()?))
    }

    fn default_ext(&self) -> &'static str {
        "csv"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        let merged = self.record()?.merged()?;
        if merged.rows() == 0 {
            tracing::warn!(kind = self.kind, "no peptides shared by the MHC and APL-MHC tables");
        }
        Ok(FileUnit::new(
            merged.to_csv()?,
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::EngineError, scoring::MarkerKind};

    fn record_json(likelihood: &str) -> String {
        let mhc = r#"{"Peptide": {"0": "P1", "1": "P2", "2": "P3"}, "DRB1_0101": {"0": 1.5, "1": 2.0, "2": 3.25}}"#;
        let combined = r#"{"Peptide": {"0": "P1", "1": "P2", "2": "P4"}, "DRB1_0101": {"0": 0.1, "1": 0.2, "2": 0.3}}"#;
        serde_json::json!({
            "MHC": mhc,
            "APL-MHC": combined,
            "Peptide-Likelihood": serde_json::from_str::<Value>(likelihood).unwrap(),
            "Labels": [true, false, "True"],
            "Antigen": "X",
            "APL-Threshold": "0.5",
        })
        .to_string()
    }

    fn engine(json: &str) -> AplMhcTableEngine {
        AplMhcTableEngine::new("aplmhc-table", &RawValue::from(json), &IoType::new("aplmhc"))
            .unwrap()
    }

    #[test]
    fn test_inner_join_on_peptide() {
        let unit = engine(&record_json("[0.7, 0.9]")).file(None, None).unwrap();
        assert_eq!(unit.file_name(), "aplmhc.csv");
        assert_eq!(
            unit.as_text(),
            Some("Peptide,DRB1_0101,combined-DRB1_0101,likelihood\nP1,1.5,0.1,0.7\nP2,2,0.2,0.9\n")
        );
    }

    #[test]
    fn test_likelihood_length_must_match_join() {
        let err = engine(&record_json("[1, 5, 3]")).file(None, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::LengthMismatch { expected: 2, found: 3, .. }
        ));
    }

    #[test]
    fn test_one_track_per_score_column() {
        let record = AplMhcTable::parse(&record_json("[1, 5, 3]")).unwrap();
        let tracks = record.tracks().unwrap();
        let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "X Peptide APL",
                "X MHC-II (DRB1_0101)",
                "X APL & MHC-II (DRB1_0101) Combined",
            ]
        );
        // likelihood [0, 1, .5]: rank 1 from the top gives threshold 1
        assert_eq!(tracks[0].threshold, 1.0);
        assert_eq!(tracks[0].count(MarkerKind::TruePositive), 0);
        assert_eq!(tracks[0].count(MarkerKind::FalseNegative), 2);
        // MHC [1.5, 2, 3.25] normalizes to [0, .29, 1]; position 3 is a hit
        assert_eq!(tracks[1].count(MarkerKind::TruePositive), 1);
    }

    #[test]
    fn test_figure_layout() {
        let record = AplMhcTable::parse(&record_json("[1, 5, 3]")).unwrap();
        let options = ViewOptions::default()
            .with_title("Combined")
            .with_labels("Peptide", "Score");
        let figure = record.figure(&options).unwrap();
        let panels: Vec<&Axes> = figure.panels().collect();
        assert_eq!(panels.len(), 3);
        assert!(panels.iter().all(|p| p.y_label.as_deref() == Some("Score")));
        assert!(panels.iter().all(|p| p.x_limits == Some((0.0, 4.0))));
        assert_eq!(panels[0].x_label, None);
        assert_eq!(panels[2].x_label.as_deref(), Some("Peptide"));
        let svg = engine(&record_json("[1, 5, 3]"))
            .figure_svg(&options)
            .unwrap()
            .unwrap();
        assert!(svg.contains("Combined"));
        assert!(svg.contains("MHC-II (DRB1_0101) Combined"));
    }

    #[test]
    fn test_missing_labels() {
        let json = record_json("[1, 5, 3]").replace(r#""Labels""#, r#""Truth""#);
        assert!(matches!(
            AplMhcTable::parse(&json).unwrap_err(),
            EngineError::MissingField(field) if field == "Labels"
        ));
    }

    #[test]
    fn test_table_without_peptide_key() {
        let json = serde_json::json!({
            "MHC": {"score": [1.0, 2.0]},
            "APL-MHC": {"Peptide": ["P1", "P2"], "score": [1.0, 2.0]},
            "Peptide-Likelihood": [1.0, 2.0],
            "Labels": [true, true],
            "Antigen": "X",
            "APL-Threshold": 0.5,
        })
        .to_string();
        assert!(matches!(
            AplMhcTable::parse(&json).unwrap_err(),
            EngineError::MissingField(field) if field == "Peptide"
        ));
    }
}
