//! Single protein sequence engine: indexed, fragment-highlighted HTML block
//! and single-record FASTA export.

use crate::{
    engine::{RawValue, TypeEngine, ViewOptions, text_preview},
    error::{EngineError, Result},
    file_unit::FileUnit,
    html::escape_html,
    io_type::IoType,
};
use bio::io::fasta;

pub const DEFAULT_FRAGMENT_LENGTH: usize = 10;
pub const DEFAULT_COLUMN_NUM: usize = 6;

/// Lays the sequence out as rows of `column_num` fragments, each with its
/// fragment index above it and its first residue highlighted.
pub fn render_sequence(sequence: &str, fragment_length: usize, column_num: usize) -> Result<String> {
    if fragment_length == 0 || column_num == 0 {
        return Err(EngineError::invalid(
            "fragment length and column count must be positive",
        ));
    }
    let residues: Vec<char> = sequence.chars().collect();
    let mut index_content = vec![];
    let mut fragment_content = vec![];
    for (index, fragment) in residues.chunks(fragment_length).enumerate() {
        let label = index.to_string();
        let padding = "&nbsp;".repeat(fragment_length.saturating_sub(label.len()));
        index_content.push(format!("<b>{label}</b>{padding}"));
        let head = escape_html(&fragment[0].to_string());
        let tail = escape_html(&fragment[1..].iter().collect::<String>());
        fragment_content.push(format!(
            "<span style=\"background-color:grey;\"><b>{head}</b></span>{tail}"
        ));
    }
    let content = index_content
        .chunks(column_num)
        .zip(fragment_content.chunks(column_num))
        .map(|(indices, fragments)| {
            format!("{}<br>{}", indices.join("&nbsp;"), fragments.join("&nbsp;"))
        })
        .collect::<Vec<_>>()
        .join("<br><br>");
    Ok(format!(
        "<div style=\"overflow:scroll; font-family: Courier,monospace;\">{content}</div>"
    ))
}

#[derive(Clone, Debug)]
pub struct ProteinSequenceEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl ProteinSequenceEngine {
    pub fn new(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Self> {
        Ok(Self {
            kind,
            io_type: io_type.clone(),
            value: value.text()?.to_string(),
        })
    }

    #[inline(always)]
    pub fn sequence(&self) -> &str {
        &self.value
    }

    pub fn boxed(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Box<dyn TypeEngine>> {
        Ok(Box::new(Self::new(kind, value, io_type)?))
    }
}

impl TypeEngine for ProteinSequenceEngine {
    fn kind(&self) -> &str {
        self.kind
    }

    fn io_type(&self) -> &IoType {
        &self.io_type
    }

    fn preview(&self) -> String {
        text_preview(&self.value)
    }

    fn view_html(&self, options: &ViewOptions) -> Result<String> {
        render_sequence(
            &self.value,
            options.fragment_length.unwrap_or(DEFAULT_FRAGMENT_LENGTH),
            options.column_num.unwrap_or(DEFAULT_COLUMN_NUM),
        )
    }

    fn default_ext(&self) -> &'static str {
        "fasta"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        let name = self.file_name(name);
        let mut content = Vec::new();
        {
            let mut writer = fasta::Writer::new(&mut content);
            writer.write(name, None, self.value.trim().as_bytes())?;
            writer.flush()?;
        }
        Ok(FileUnit::new(content, name, ext.unwrap_or(self.default_ext())))
    }
}
