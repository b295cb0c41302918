//! PDB structure engine: line table, 3Dmol.js cartoon viewer and raw export.

use crate::{
    engine::{RawValue, TypeEngine, ViewOptions},
    error::Result,
    file_unit::FileUnit,
    html,
    io_type::IoType,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::hash::{DefaultHasher, Hash, Hasher};

const VIEWER_SCRIPT: &str = "https://cdnjs.cloudflare.com/ajax/libs/3Dmol/2.4.2/3Dmol-min.js";
const DEFAULT_WIDTH: u32 = 400;
const DEFAULT_HEIGHT: u32 = 300;

lazy_static! {
    static ref FIELD_SEPARATOR: Regex = Regex::new(r" +").expect("valid field separator");
}

#[derive(Clone, Debug)]
pub struct ProteinPdbEngine {
    kind: &'static str,
    io_type: IoType,
    value: String,
}

impl ProteinPdbEngine {
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

    /// Non-empty lines split into fields on runs of spaces.
    pub fn table_value(&self) -> Vec<Vec<String>> {
        self.value
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                FIELD_SEPARATOR
                    .split(line.trim())
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.value.lines().filter(|line| !line.trim().is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Standalone viewer fragment: every model added as a frame, drawn as a
    /// spectrum-coloured cartoon and zoomed to fit.
    pub fn viewer_html(&self, width: u32, height: u32) -> String {
        let mut hasher = DefaultHasher::new();
        self.value.hash(&mut hasher);
        let id = format!("3dmolviewer_{:016x}", hasher.finish());
        // serde_json string escaping is valid JavaScript, minus "</" inside a script
        let data = serde_json::Value::String(self.value.clone())
            .to_string()
            .replace("</", "<\\/");
        format!(
            r#"<div id="{id}" style="position: relative; width: {width}px; height: {height}px;"></div>
<script src="{VIEWER_SCRIPT}"></script>
<script>
(function() {{
  var viewer = $3Dmol.createViewer(document.getElementById("{id}"), {{backgroundColor: "white"}});
  viewer.addModelsAsFrames({data}, "pdb");
  viewer.setStyle({{"model": -1}}, {{"cartoon": {{"color": "spectrum"}}}});
  viewer.zoomTo();
  viewer.render();
}})();
</script>"#
        )
    }

    fn table_html(&self) -> String {
        let rows = self.table_value();
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let header: Vec<String> = (0..columns).map(|i| i.to_string()).collect();
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect();
        html::table(&header, &rows)
    }
}

impl TypeEngine for ProteinPdbEngine {
    fn kind(&self) -> &str {
        self.kind
    }

    fn io_type(&self) -> &IoType {
        &self.io_type
    }

    fn preview(&self) -> String {
        format!("PDB:{} lines", self.len())
    }

    fn view_html(&self, options: &ViewOptions) -> Result<String> {
        Ok(self.viewer_html(
            options.width.unwrap_or(DEFAULT_WIDTH),
            options.height.unwrap_or(DEFAULT_HEIGHT),
        ))
    }

    fn repr_markdown(&self) -> Result<String> {
        Ok(format!(
            "{}\n{}",
            self.viewer_html(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            self.table_html()
        ))
    }

    fn default_ext(&self) -> &'static str {
        "pdb"
    }

    fn file(&self, name: Option<&str>, ext: Option<&str>) -> Result<FileUnit> {
        Ok(FileUnit::new(
            self.value.as_bytes(),
            self.file_name(name),
            ext.unwrap_or(self.default_ext()),
        ))
    }
}
