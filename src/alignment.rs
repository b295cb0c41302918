//! FASTA alignment engine: header/body extraction and residue heatmap.

use crate::{
    engine::{RawValue, TypeEngine, ViewOptions, text_preview},
    error::{EngineError, Result},
    file_unit::FileUnit,
    heatmap::Heatmap,
    html,
    io_type::IoType,
};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

/// Code assigned to padding cells after the end of a shorter sequence.
pub const PAD_CODE: i32 = -1;
pub const PAD_LABEL: &str = "*";

lazy_static! {
    static ref FASTA_RECORD: Regex = Regex::new(r">([^\n]*)\n([^>]*)").expect("valid FASTA pattern");
}

/// Residue-code matrix driving the alignment heatmap.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapData {
    pub matrix: Vec<Vec<i32>>,
    pub names: Vec<String>,
    /// Pad placeholder followed by the sorted residue alphabet.
    pub residues: Vec<String>,
}

/// Extracts `(identifier, sequence)` pairs in input order. A repeated
/// identifier replaces the earlier sequence in place.
pub fn fetch_sequences(alignment: &str) -> Vec<(String, String)> {
    let mut sequences: Vec<(String, String)> = vec![];
    for caps in FASTA_RECORD.captures_iter(alignment) {
        let id = caps[1].trim_end_matches('\r').to_string();
        let body: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
        match sequences.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = body,
            None => sequences.push((id, body)),
        }
    }
    sequences
}

/// Maps each residue to its rank in the sorted alphabet and pads rows with
/// [`PAD_CODE`] to the longest sequence.
pub fn heatmap_data(sequences: &[(String, String)]) -> Result<HeatmapData> {
    let max_len = sequences
        .iter()
        .map(|(_, seq)| seq.chars().count())
        .max()
        .ok_or_else(|| EngineError::EmptyInput("alignment contains no sequences".to_string()))?;
    let alphabet: Vec<char> = sequences
        .iter()
        .flat_map(|(_, seq)| seq.chars())
        .sorted()
        .dedup()
        .collect();
    let matrix = sequences
        .iter()
        .map(|(_, seq)| {
            let mut row: Vec<i32> = seq
                .chars()
                .map(|c| alphabet.binary_search(&c).map_or(PAD_CODE, |i| i as i32))
                .collect();
            row.resize(max_len, PAD_CODE);
            row
        })
        .collect();
    let residues = std::iter::once(PAD_LABEL.to_string())
        .chain(alphabet.iter().map(char::to_string))
        .collect();
    Ok(HeatmapData {
        matrix,
        names: sequences.iter().map(|(id, _)| id.clone()).collect(),
        residues,
    })
}

#[derive(Clone, Debug)]
pub struct SequenceAlignmentEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl SequenceAlignmentEngine {
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

    pub fn sequences(&self) -> Vec<(String, String)> {
        fetch_sequences(&self.value)
    }

    pub fn heatmap(&self) -> Result<Heatmap> {
        let data = heatmap_data(&self.sequences())?;
        tracing::debug!(
            sequences = data.names.len(),
            residues = data.residues.len() - 1,
            "built alignment heatmap"
        );
        Ok(Heatmap {
            title: "FASTA Alignment Visualization".to_string(),
            x_label: "Position".to_string(),
            y_label: "Sequences".to_string(),
            row_labels: data.names,
            matrix: data.matrix,
            min_code: PAD_CODE,
            scale_labels: data.residues,
        })
    }

    fn sequence_table(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .sequences()
            .into_iter()
            .map(|(id, seq)| vec![id, seq])
            .collect();
        html::table(&["ID", "Sequence"], &rows)
    }
}

impl TypeEngine for SequenceAlignmentEngine {
    fn kind(&self) -> &str {
        self.kind
    }

    fn io_type(&self) -> &IoType {
        &self.io_type
    }

    fn preview(&self) -> String {
        text_preview(&self.value)
    }

    fn view_html(&self, _options: &ViewOptions) -> Result<String> {
        Ok(format!("<div>{}</div>", self.heatmap()?.to_svg()))
    }

    fn figure_svg(&self, _options: &ViewOptions) -> Result<Option<String>> {
        Ok(Some(self.heatmap()?.to_svg()))
    }

    fn repr_markdown(&self) -> Result<String> {
        Ok(format!(
            "{}\n{}",
            self.view_html(&ViewOptions::default())?,
            self.sequence_table()
        ))
    }

    fn default_ext(&self) -> &'static str {
        "fasta"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        Ok(FileUnit::new(
            self.value.as_bytes(),
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}
