use serde::{Deserialize, Serialize};

/// Descriptor the host attaches to a column. `name` doubles as the default
/// chart title and export file name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IoType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IoType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_type_from_json() {
        let io: IoType = serde_json::from_str(r#"{"name":"SASA"}"#).unwrap();
        assert_eq!(io, IoType::new("SASA"));
        let io: IoType =
            serde_json::from_str(r#"{"name":"pdb","kind":"pdb","description":"x"}"#).unwrap();
        assert_eq!(io.kind.as_deref(), Some("pdb"));
    }
}
