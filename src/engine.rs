//! The type-engine contract every data kind implements, together with the
//! raw value it wraps and the options accepted by the HTML renderers.

use crate::{
    error::{EngineError, Result},
    file_unit::FileUnit,
    html,
    io_type::IoType,
};
use serde::{Deserialize, Serialize};
use std::fmt;

const TEXT_PREVIEW_LENGTH: usize = 32;

/// Unprocessed value of one column entry, as stored by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Numbers(Vec<f64>),
    Text(String),
}

impl RawValue {
    pub fn text(&self) -> Result<&str> {
        match self {
            RawValue::Text(text) => Ok(text),
            RawValue::Numbers(_) => Err(EngineError::invalid(
                "expected a text value, found a numeric array",
            )),
        }
    }

    /// Numeric arrays may also arrive as a JSON-encoded string.
    pub fn numbers(&self) -> Result<Vec<f64>> {
        match self {
            RawValue::Numbers(values) => Ok(values.clone()),
            RawValue::Text(text) => serde_json::from_str::<Vec<f64>>(text).map_err(|e| {
                EngineError::invalid(format!("expected a JSON array of numbers: {e}"))
            }),
        }
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_string())
    }
}

impl From<Vec<f64>> for RawValue {
    fn from(values: Vec<f64>) -> Self {
        RawValue::Numbers(values)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_subtype(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// Rendering options. Every field is optional; engines ignore the ones that
/// do not apply to them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub grid: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fragment_length: Option<usize>,
    pub column_num: Option<usize>,
    pub image_format: ImageFormat,
}

impl ViewOptions {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = Some(x_label.to_string());
        self.y_label = Some(y_label.to_string());
        self
    }

    pub fn with_grid(mut self, grid: bool) -> Self {
        self.grid = grid;
        self
    }
}

pub trait TypeEngine: fmt::Debug {
    /// Data-kind name the engine was created for.
    fn kind(&self) -> &str;

    fn io_type(&self) -> &IoType;

    fn preview(&self) -> String;

    fn view_html(&self, options: &ViewOptions) -> Result<String>;

    fn repr_markdown(&self) -> Result<String> {
        self.view_html(&ViewOptions::default())
    }

    /// Vector form of the chart behind `view_html`, for engines that draw one.
    fn figure_svg(&self, _options: &ViewOptions) -> Result<Option<String>> {
        Ok(None)
    }

    fn default_ext(&self) -> &'static str;

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit>;

    fn file_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.unwrap_or(&self.io_type().name)
    }
}

pub fn text_preview(text: &str) -> String {
    if text.chars().count() <= TEXT_PREVIEW_LENGTH {
        return text.to_string();
    }
    let head: String = text.chars().take(TEXT_PREVIEW_LENGTH - 3).collect();
    format!("{head}...")
}

pub fn json_preview(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => format!("JSON:{} fields", map.len()),
        Ok(serde_json::Value::Array(items)) => format!("JSON:{} items", items.len()),
        _ => text_preview(text),
    }
}

pub fn numbers_preview(values: &[f64]) -> String {
    let head = values
        .iter()
        .take(3)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if values.len() > 3 {
        format!("[{head}, ...] (n={})", values.len())
    } else {
        format!("[{head}] (n={})", values.len())
    }
}

pub fn text_markdown(text: &str) -> String {
    html::pre(text)
}
