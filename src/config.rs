//! Per-field settings, as chosen in the section editor.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::date_iterator::DEFAULT_MAX_OCCURRENCES;
use crate::render::is_xml_name;
use crate::{Error, Result};

fn default_true() -> bool {
    true
}

fn default_max_occurrences() -> usize {
    DEFAULT_MAX_OCCURRENCES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSettings {
    /// Shown to authors and used in validation messages.
    pub label: String,

    /// Element name used when rendering. Derived from the label if absent.
    #[serde(default)]
    pub handle: Option<String>,

    /// Fill empty start/end inputs with the current date.
    #[serde(default = "default_true")]
    pub pre_populate: bool,

    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: usize,
}

impl FieldSettings {
    pub fn new(label: impl Into<String>) -> Self {
        FieldSettings {
            label: label.into(),
            handle: None,
            pre_populate: true,
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: FieldSettings = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(handle) = settings.handle.as_deref().filter(|h| !is_xml_name(h)) {
            return Err(Error::Config(format!("handle '{handle}' is not a valid element name")));
        }
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("could not read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn handle(&self) -> String {
        match &self.handle {
            Some(handle) => handle.clone(),
            None => handle_from_label(&self.label),
        }
    }
}

fn handle_from_label(label: &str) -> String {
    let mut handle = String::with_capacity(label.len());
    for c in label.trim().chars() {
        if c.is_alphanumeric() {
            handle.extend(c.to_lowercase());
        } else if !handle.ends_with('-') {
            handle.push('-');
        }
    }

    match handle.trim_matches('-') {
        "" => String::from("repeating-date"),
        trimmed if is_xml_name(trimmed) => trimmed.to_owned(),
        trimmed => format!("field-{trimmed}"),
    }
}
