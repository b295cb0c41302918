//! Score normalization, percentile thresholds and TP/FN classification used
//! by the peptide score tracks.

use crate::{
    chart::{Axes, GREY, LegendEntry, LineSeries, MAGENTA, Stroke},
    error::{EngineError, Result},
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Boolean-like ground-truth label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Label(pub bool);

impl Label {
    pub fn from_value(value: &Value) -> Result<Self> {
        let truthy = match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "t" | "y" => true,
                "false" | "0" | "no" | "f" | "n" | "" => false,
                other => {
                    return Err(EngineError::invalid(format!(
                        "label '{other}' is not boolean-like"
                    )));
                }
            },
            other => {
                return Err(EngineError::invalid(format!(
                    "label {other} is not boolean-like"
                )));
            }
        };
        Ok(Label(truthy))
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Label::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Rank cutoff in [0, 1]. Accepts a JSON number or a numeric string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Percentile(f64);

impl Percentile {
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::invalid(format!(
                "percentile threshold {value} is outside [0, 1]"
            )));
        }
        Ok(Self(value))
    }

    #[inline(always)]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Percentile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| serde::de::Error::custom("threshold is not a number"))?;
        Percentile::new(value).map_err(serde::de::Error::custom)
    }
}

/// Min-max scaling into [0, 1]. NaN entries are ignored for the range and
/// stay NaN.
pub fn normalize_score(values: &[f64]) -> Result<Vec<f64>> {
    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(*v), max.max(*v))
        });
    if min > max {
        return Err(EngineError::EmptyInput(
            "cannot normalize an empty score array".to_string(),
        ));
    }
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return Err(EngineError::DegenerateInput(format!(
            "score range is {range} (min {min}, max {max})"
        )));
    }
    Ok(values.iter().map(|v| (v - min) / range).collect())
}

/// Value at rank `floor(percentile * len)` counted from the top of the sorted
/// unique scores. A rank of zero selects the smallest unique score.
pub fn percentile_threshold(scores: &[f64], percentile: Percentile) -> Result<f64> {
    let mut unique: Vec<f64> = scores.iter().copied().filter(|v| v.is_finite()).collect();
    unique.sort_by(|a, b| a.total_cmp(b));
    unique.dedup();
    if unique.is_empty() {
        return Err(EngineError::EmptyInput(
            "no finite scores to threshold".to_string(),
        ));
    }
    let rank = (percentile.value() * scores.len() as f64).floor() as usize;
    if rank == 0 {
        return Ok(unique[0]);
    }
    if rank > unique.len() {
        return Err(EngineError::invalid(format!(
            "rank {rank} exceeds the {} unique scores",
            unique.len()
        )));
    }
    Ok(unique[unique.len() - rank])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    TruePositive,
    FalseNegative,
}

impl MarkerKind {
    pub fn color(&self) -> &'static str {
        match self {
            MarkerKind::TruePositive => "green",
            MarkerKind::FalseNegative => "blue",
        }
    }

    pub fn legend(&self) -> &'static str {
        match self {
            MarkerKind::TruePositive => "TP",
            MarkerKind::FalseNegative => "FN",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    /// 1-based position along the track.
    pub position: usize,
    pub kind: MarkerKind,
}

/// Marks every labelled position. Scores and labels are paired up to the
/// shorter of the two.
pub fn classify(scores: &[f64], labels: &[Label], threshold: f64) -> Vec<Marker> {
    scores
        .iter()
        .zip(labels)
        .enumerate()
        .filter(|(_, (_, label))| label.0)
        .map(|(x, (score, _))| Marker {
            position: x + 1,
            kind: if *score >= threshold {
                MarkerKind::TruePositive
            } else {
                MarkerKind::FalseNegative
            },
        })
        .collect()
}

/// One normalized, thresholded and classified peptide score series.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreTrack {
    pub title: String,
    pub scores: Vec<f64>,
    pub threshold: f64,
    pub markers: Vec<Marker>,
}

impl ScoreTrack {
    pub fn build(
        title: &str,
        raw_scores: &[f64],
        labels: &[Label],
        percentile: Percentile,
    ) -> Result<Self> {
        let scores = normalize_score(raw_scores)?;
        let threshold = percentile_threshold(&scores, percentile)?;
        let markers = classify(&scores, labels, threshold);
        tracing::debug!(
            title,
            threshold,
            markers = markers.len(),
            "built score track"
        );
        Ok(Self {
            title: title.to_string(),
            scores,
            threshold,
            markers,
        })
    }

    pub fn count(&self, kind: MarkerKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }

    /// Grey score line over x = 1..=n, dashed threshold guide when positive,
    /// full-height TP/FN markers and a fixed two-entry legend.
    pub fn axes(&self) -> Axes {
        let mut axes = Axes::new().title(&self.title);
        if self.threshold > 0.0 {
            axes.axhline(self.threshold, Stroke::dashed(MAGENTA, 1.0));
        }
        for marker in &self.markers {
            axes.axvline(marker.position as f64, Stroke::solid(marker.kind.color(), 2.0));
        }
        axes.add_series(LineSeries::indexed(&self.scores, 1.0, Stroke::solid(GREY, 2.0)));
        axes.y_limits = Some((0.0, 1.1));
        axes.legend = [MarkerKind::TruePositive, MarkerKind::FalseNegative]
            .iter()
            .map(|kind| LegendEntry {
                label: kind.legend().to_string(),
                stroke: Stroke::solid(kind.color(), 2.0),
            })
            .collect();
        axes.show_legend = true;
        axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(flags: &[bool]) -> Vec<Label> {
        flags.iter().map(|b| Label(*b)).collect()
    }

    #[test]
    fn test_normalize_score() {
        let norm = normalize_score(&[1.0, 5.0, 3.0]).unwrap();
        assert_eq!(norm, vec![0.0, 1.0, 0.5]);
        let again = normalize_score(&norm).unwrap();
        assert_eq!(again, norm);
    }

    #[test]
    fn test_normalize_constant_is_degenerate() {
        let err = normalize_score(&[2.0, 2.0, 2.0]).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateInput(_)));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(
            normalize_score(&[]).unwrap_err(),
            EngineError::EmptyInput(_)
        ));
    }

    #[test]
    fn test_normalize_keeps_nan() {
        let norm = normalize_score(&[0.0, f64::NAN, 2.0]).unwrap();
        assert_eq!(norm[0], 0.0);
        assert!(norm[1].is_nan());
        assert_eq!(norm[2], 1.0);
    }

    #[test]
    fn test_percentile_threshold_median_rank() {
        let scores = [0.0, 0.25, 0.5, 0.75, 1.0, 0.9];
        // rank floor(0.5 * 6) = 3 from the top of [0, .25, .5, .75, .9, 1]
        let t = percentile_threshold(&scores, Percentile::new(0.5).unwrap()).unwrap();
        assert_eq!(t, 0.75);
    }

    #[test]
    fn test_percentile_threshold_rank_zero_and_duplicates() {
        let scores = [0.0, 1.0, 1.0, 1.0];
        let t = percentile_threshold(&scores, Percentile::new(0.1).unwrap()).unwrap();
        assert_eq!(t, 0.0);
        let t = percentile_threshold(&scores, Percentile::new(0.5).unwrap()).unwrap();
        assert_eq!(t, 0.0);
        assert!(percentile_threshold(&scores, Percentile::new(1.0).unwrap()).is_err());
    }

    #[test]
    fn test_percentile_bounds() {
        assert!(Percentile::new(1.5).is_err());
        assert!(Percentile::new(-0.1).is_err());
        let p: Percentile = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(p.value(), 0.25);
        assert!(serde_json::from_str::<Percentile>("2").is_err());
    }

    #[test]
    fn test_classify() {
        let scores = [0.1, 0.8, 0.5, 0.9];
        let markers = classify(&scores, &labels(&[true, true, false, true]), 0.5);
        assert_eq!(
            markers,
            vec![
                Marker {
                    position: 1,
                    kind: MarkerKind::FalseNegative
                },
                Marker {
                    position: 2,
                    kind: MarkerKind::TruePositive
                },
                Marker {
                    position: 4,
                    kind: MarkerKind::TruePositive
                },
            ]
        );
    }

    #[test]
    fn test_labels_from_json() {
        let parsed: Vec<Label> =
            serde_json::from_str(r#"[true, 0, 1, "False", "yes", null, ""]"#).unwrap();
        assert_eq!(
            parsed,
            labels(&[true, false, true, false, true, false, false])
        );
        assert!(serde_json::from_str::<Vec<Label>>(r#"["maybe"]"#).is_err());
    }

    #[test]
    fn test_score_track() {
        let track = ScoreTrack::build(
            "X Peptide APL",
            &[1.0, 5.0, 3.0, 2.0],
            &labels(&[true, true, false, false]),
            Percentile::new(0.5).unwrap(),
        )
        .unwrap();
        // normalized [0, 1, .5, .25], rank 2 from top of unique -> 0.5
        assert_eq!(track.threshold, 0.5);
        assert_eq!(track.count(MarkerKind::TruePositive), 1);
        assert_eq!(track.count(MarkerKind::FalseNegative), 1);
    }

    #[test]
    fn test_track_axes() {
        let track = ScoreTrack::build(
            "X Peptide APL",
            &[1.0, 5.0, 3.0, 2.0],
            &labels(&[true, true, false, false]),
            Percentile::new(0.5).unwrap(),
        )
        .unwrap();
        let axes = track.axes();
        assert_eq!(axes.y_range(), (0.0, 1.1));
        assert_eq!(axes.hlines.len(), 1);
        assert_eq!(axes.hlines[0].stroke, Stroke::dashed(MAGENTA, 1.0));
        let colors: Vec<&str> = axes.vlines.iter().map(|l| l.stroke.color.as_str()).collect();
        assert_eq!(colors, vec!["blue", "green"]);
        assert_eq!(axes.vlines[1].value, 2.0);
        assert_eq!(axes.series[0].points[0], (1.0, 0.0));
        let legend: Vec<&str> = axes.legend.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(legend, vec!["TP", "FN"]);
    }

    #[test]
    fn test_zero_threshold_has_no_guide() {
        let track = ScoreTrack::build(
            "t",
            &[0.0, 1.0, 1.0, 1.0],
            &labels(&[true, true]),
            Percentile::new(0.1).unwrap(),
        )
        .unwrap();
        assert_eq!(track.threshold, 0.0);
        let axes = track.axes();
        assert!(axes.hlines.is_empty());
        assert!(axes.vlines.iter().all(|l| l.stroke.color == "green"));
    }
}
