//! [`ConfigNode`] over a parsed TOML document.
//!
//! A repeated block is written as an array of tables (`[[model_type]]`) and
//! a repeated bare value as an array (`external_agent = ["robot1"]`).

use std::fs;
use std::path::Path;

use toml::Value;

use super::ConfigNode;
use crate::error::{CrowdError, Result};

/// Reads and parses a TOML configuration file.
///
/// # Errors
/// Returns [`CrowdError::Configuration`] if the file cannot be read or is
/// not valid TOML.
pub fn load_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| CrowdError::configuration(path.display().to_string(), e.to_string()))?;
    text.parse::<Value>()
        .map_err(|e| CrowdError::configuration(path.display().to_string(), e.to_string()))
}

/// One element of a TOML document plus the siblings that follow it.
#[derive(Debug, Clone, Copy)]
pub struct TomlNode<'a> {
    value: &'a Value,
    following: &'a [Value],
}

impl<'a> TomlNode<'a> {
    /// Wraps the root of a document.
    #[must_use]
    pub const fn root(value: &'a Value) -> Self {
        Self {
            value,
            following: &[],
        }
    }

    fn first(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.split_first().map(|(value, following)| Self {
                value,
                following,
            }),
            other => Some(Self::root(other)),
        }
    }
}

fn as_double(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        #[expect(clippy::cast_precision_loss, reason = "config integers are small")]
        Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

impl ConfigNode for TomlNode<'_> {
    fn has_field(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    fn get_string(&self, name: &str) -> Option<String> {
        self.child(name)?.value_string()
    }

    fn get_double(&self, name: &str) -> Option<f64> {
        as_double(self.child(name)?.value)
    }

    fn child(&self, name: &str) -> Option<Self> {
        self.value.get(name).and_then(Self::first)
    }

    fn next_sibling(&self) -> Option<Self> {
        self.following
            .split_first()
            .map(|(value, following)| Self { value, following })
    }

    fn value_string(&self) -> Option<String> {
        self.value.as_str().map(str::to_owned)
    }
}
