//! Pass-through engines for peptide sets and regular-mer records.

use crate::{
    engine::{RawValue, TypeEngine, ViewOptions, json_preview, text_markdown, text_preview},
    error::Result,
    file_unit::FileUnit,
    io_type::IoType,
};

/// Plain peptide list stored as text.
#[derive(Clone, Debug)]
pub struct PeptidesEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl PeptidesEngine {
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
}

impl TypeEngine for PeptidesEngine {
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
        Ok(text_markdown(&self.value))
    }

    fn default_ext(&self) -> &'static str {
        "txt"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        Ok(FileUnit::new(
            self.value.as_bytes(),
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}

/// Regular-mer records produced by pattern extraction, stored as JSON.
#[derive(Clone, Debug)]
pub struct RegularMersEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
    parsed: serde_json::Value,
}

impl RegularMersEngine {
    pub fn new(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Self> {
        let value = value.text()?.to_string();
        let parsed = serde_json::from_str(&value)?;
        Ok(Self {
            kind,
            io_type: io_type.clone(),
            value,
            parsed,
        })
    }

    pub fn boxed(kind: &'static str, value: &RawValue, io_type: &IoType) -> Result<Box<dyn TypeEngine>> {
        Ok(Box::new(Self::new(kind, value, io_type)?))
    }
}

impl TypeEngine for RegularMersEngine {
    fn kind(&self) -> &str {
        self.kind
    }

    fn io_type(&self) -> &IoType {
        &self.io_type
    }

    fn preview(&self) -> String {
        json_preview(&self.value)
    }

    fn view_html(&self, _options: &ViewOptions) -> Result<String> {
        Ok(text_markdown(&serde_json::to_string_pretty(&self.parsed)?))
    }

    fn default_ext(&self) -> &'static str {
        "json"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        Ok(FileUnit::new(
            self.value.as_bytes(),
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}
