//! Configuration access for the crowd bridge.
//!
//! Settings are read through the narrow [`ConfigNode`] capability so any
//! configuration tree can feed the bridge. [`TomlNode`] is the adapter used
//! by the binary and the tests.

mod settings;
mod toml_node;

pub use settings::{read_settings, CrowdSettings, ModelTypeSettings, SettingsReport};
pub use toml_node::{load_document, TomlNode};

/// Read-only view of one element of a configuration tree.
///
/// An element has named fields. A field may repeat; [`ConfigNode::child`]
/// yields the first occurrence and [`ConfigNode::next_sibling`] walks the
/// remaining ones.
pub trait ConfigNode: Sized {
    /// Returns `true` if at least one field called `name` exists.
    fn has_field(&self, name: &str) -> bool;

    /// String value of the first field called `name`.
    fn get_string(&self, name: &str) -> Option<String>;

    /// Numeric value of the first field called `name`.
    fn get_double(&self, name: &str) -> Option<f64>;

    /// First element called `name`.
    fn child(&self, name: &str) -> Option<Self>;

    /// Next element sharing this element's name.
    fn next_sibling(&self) -> Option<Self>;

    /// This element's own value when it is a bare string.
    fn value_string(&self) -> Option<String>;

    /// Iterates over this element and every following sibling.
    fn siblings(self) -> Siblings<Self> {
        Siblings { next: Some(self) }
    }
}

/// Iterator returned by [`ConfigNode::siblings`].
#[derive(Debug)]
pub struct Siblings<N> {
    next: Option<N>,
}

impl<N: ConfigNode> Iterator for Siblings<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next.take()?;
        self.next = current.next_sibling();
        Some(current)
    }
}
