use crate::error::Result;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Export artifact handed back to the host: a name, an extension and the
/// serialized content.
#[derive(Clone, Debug, PartialEq)]
pub struct FileUnit {
    name: String,
    ext: String,
    content: Vec<u8>,
}

impl FileUnit {
    pub fn new(content: impl Into<Vec<u8>>, name: &str, ext: &str) -> Self {
        Self {
            name: name.to_string(),
            ext: ext.trim_start_matches('.').to_string(),
            content: content.into(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn ext(&self) -> &str {
        &self.ext
    }

    #[inline(always)]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn file_name(&self) -> String {
        if self.ext.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.ext)
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, &self.content)?;
        tracing::debug!(path = %path.display(), bytes = self.content.len(), "wrote file unit");
        Ok(path)
    }
}
