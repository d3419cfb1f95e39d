//! Agent type definitions keyed by type name.
//!
//! The registry is filled once while configuration is read and is then
//! handed to the bridge, which only reads from it. Definitions are shared
//! through [`Arc`] so agent records can hold on to their type without
//! borrowing the registry.

use std::sync::Arc;

use hashbrown::HashMap;
use log::debug;

use crate::error::{CrowdError, Result};
use crate::pose::Pose;

/// Spawn metadata for one agent type.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTypeDefinition {
    /// Unique registry key.
    pub type_name: String,
    /// Visual (skin/mesh) reference handed to the host.
    pub visual: String,
    /// Offset applied to the engine position when the host creates the model.
    pub spawn_offset: Pose,
    /// Walk animation reference.
    pub animation: String,
    /// Animation playback per metre travelled.
    pub animation_speed: f64,
}

/// Mapping from type name to [`AgentTypeDefinition`].
#[derive(Debug, Default, Clone)]
pub struct AgentTypeRegistry {
    types: HashMap<String, Arc<AgentTypeDefinition>>,
}

impl AgentTypeRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under its type name.
    ///
    /// # Errors
    /// Returns [`CrowdError::DuplicateType`] if the name is taken; the stored
    /// definition is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use crowd_bridge::{AgentTypeDefinition, AgentTypeRegistry, CrowdError, Pose};
    /// let guard = AgentTypeDefinition {
    ///     type_name: "guard".into(),
    ///     visual: "guard.dae".into(),
    ///     spawn_offset: Pose::default(),
    ///     animation: "walk".into(),
    ///     animation_speed: 1.0,
    /// };
    /// let mut registry = AgentTypeRegistry::new();
    /// registry.define(guard.clone()).expect("first definition");
    /// assert_eq!(
    ///     registry.define(guard),
    ///     Err(CrowdError::DuplicateType("guard".into()))
    /// );
    /// ```
    pub fn define(&mut self, definition: AgentTypeDefinition) -> Result<Arc<AgentTypeDefinition>> {
        if self.types.contains_key(&definition.type_name) {
            return Err(CrowdError::DuplicateType(definition.type_name));
        }
        debug!("registered agent type `{}`", definition.type_name);
        let stored = Arc::new(definition);
        self.types
            .insert(stored.type_name.clone(), Arc::clone(&stored));
        Ok(stored)
    }

    /// Looks up a type by name.
    ///
    /// # Errors
    /// Returns [`CrowdError::TypeNotFound`] if the name was never defined.
    pub fn lookup(&self, type_name: &str) -> Result<&Arc<AgentTypeDefinition>> {
        self.types
            .get(type_name)
            .ok_or_else(|| CrowdError::TypeNotFound(type_name.to_owned()))
    }

    /// Number of registered types.
    #[must_use]
    pub fn count(&self) -> usize {
        self.types.len()
    }

    /// `true` when no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over the registered type names in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn definition(name: &str, visual: &str) -> AgentTypeDefinition {
        AgentTypeDefinition {
            type_name: name.to_owned(),
            visual: visual.to_owned(),
            spawn_offset: Pose::default(),
            animation: "walk".to_owned(),
            animation_speed: 4.0,
        }
    }

    #[fixture]
    fn registry() -> AgentTypeRegistry {
        let mut registry = AgentTypeRegistry::new();
        registry
            .define(definition("guard", "guard.dae"))
            .expect("guard should register");
        registry
    }

    #[rstest]
    fn duplicate_keeps_first_definition(mut registry: AgentTypeRegistry) {
        let err = registry
            .define(definition("guard", "other.dae"))
            .expect_err("duplicate must be rejected");
        assert_eq!(err, CrowdError::DuplicateType("guard".into()));
        let stored = registry.lookup("guard").expect("guard remains");
        assert_eq!(stored.visual, "guard.dae");
        assert_eq!(registry.count(), 1);
    }

    #[rstest]
    fn lookup_reports_missing_type(registry: AgentTypeRegistry) {
        assert_eq!(
            registry.lookup("visitor").map(|d| d.type_name.clone()),
            Err(CrowdError::TypeNotFound("visitor".into()))
        );
    }

    #[rstest]
    fn define_returns_shared_reference(mut registry: AgentTypeRegistry) {
        let stored = registry
            .define(definition("visitor", "visitor.dae"))
            .expect("visitor should register");
        let looked_up = registry.lookup("visitor").expect("visitor present");
        assert!(Arc::ptr_eq(&stored, looked_up));
        assert_eq!(registry.count(), 2);
        let mut names: Vec<_> = registry.type_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["guard", "visitor"]);
    }
}
