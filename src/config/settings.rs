//! Crowd settings and their validation.

use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use log::info;
use serde::Serialize;

use super::ConfigNode;
use crate::error::{CrowdError, Result};
use crate::logging::Diagnostic;
use crate::pose::Pose;
use crate::registry::{AgentTypeDefinition, AgentTypeRegistry};

/// One `model_type` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTypeSettings {
    /// Registry key, matched against scene type tags.
    pub type_name: String,
    /// Visual model reference.
    pub filename: String,
    /// Walk animation reference.
    pub animation: String,
    /// Animation seconds per metre travelled.
    pub animation_speed: f64,
    /// Offset composed onto engine poses for this type.
    pub initial_pose: Pose,
}

impl From<&ModelTypeSettings> for AgentTypeDefinition {
    fn from(settings: &ModelTypeSettings) -> Self {
        Self {
            type_name: settings.type_name.clone(),
            visual: settings.filename.clone(),
            spawn_offset: settings.initial_pose,
            animation: settings.animation.clone(),
            animation_speed: settings.animation_speed,
        }
    }
}

/// Validated crowd configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdSettings {
    /// Directory the scene and behaviour files are resolved against.
    pub resource_path: PathBuf,
    /// Behaviour file, relative to `resource_path`.
    pub behavior_file: String,
    /// Scene file, relative to `resource_path`.
    pub scene_file: String,
    /// Fixed engine timestep in seconds.
    pub update_time_step: f64,
    /// Declared agent types, in file order.
    pub model_types: Vec<ModelTypeSettings>,
    /// Host models driving, rather than driven by, the engine.
    pub external_agents: Vec<String>,
}

impl CrowdSettings {
    /// Builds the type registry from the `model_type` blocks.
    ///
    /// # Errors
    /// [`CrowdError::DuplicateType`] if two blocks share a type name.
    pub fn registry(&self) -> Result<AgentTypeRegistry> {
        let mut registry = AgentTypeRegistry::new();
        for model in &self.model_types {
            registry.define(model.into())?;
        }
        Ok(registry)
    }
}

/// Settings together with the non-fatal findings made while reading them.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsReport {
    /// Validated settings.
    pub settings: CrowdSettings,
    /// Warnings raised while reading; errors abort instead.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
struct Reader {
    diagnostics: Vec<Diagnostic>,
}

impl Reader {
    fn warn(&mut self, field: &str, description: impl Into<String>) {
        let diagnostic = Diagnostic::warning(field, description);
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    /// Emits an error diagnostic and returns the matching configuration error.
    fn fail(&mut self, field: &str, description: impl Into<String>) -> CrowdError {
        self.fail_with(field, description, |field, detail| {
            CrowdError::configuration(field, detail)
        })
    }

    fn fail_with(
        &mut self,
        field: &str,
        description: impl Into<String>,
        error: impl FnOnce(&str, String) -> CrowdError,
    ) -> CrowdError {
        let diagnostic = Diagnostic::error(field, description);
        diagnostic.emit();
        let err = error(field, diagnostic.description.clone());
        self.diagnostics.push(diagnostic);
        err
    }

    fn required_string<N: ConfigNode>(&mut self, node: &N, field: &str, label: &str) -> Result<String> {
        match node.get_string(field) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(_) => Err(self.fail(label, "must not be empty")),
            None if node.has_field(field) => Err(self.fail(label, "must be a string")),
            None => Err(self.fail(label, "required")),
        }
    }

    fn required_double<N: ConfigNode>(&mut self, node: &N, field: &str, label: &str) -> Result<f64> {
        match node.get_double(field) {
            Some(value) if value.is_finite() => Ok(value),
            Some(value) => Err(self.fail(label, format!("must be finite, got {value}"))),
            None if node.has_field(field) => Err(self.fail(label, "must be a number")),
            None => Err(self.fail(label, "required")),
        }
    }

    fn resource_path<N: ConfigNode>(&mut self, node: &N, fallback: Option<&Path>) -> Result<PathBuf> {
        if node.has_field("resource_path") {
            return self
                .required_string(node, "resource_path", "resource_path")
                .map(PathBuf::from);
        }
        if let Some(path) = fallback {
            self.warn(
                "resource_path",
                format!("not configured, using fallback `{}`", path.display()),
            );
            return Ok(path.to_path_buf());
        }
        Err(self.fail(
            "resource_path",
            "not configured and no fallback location is available",
        ))
    }

    fn model_type<N: ConfigNode>(&mut self, node: &N, position: usize) -> Result<ModelTypeSettings> {
        let label = |field: &str| format!("model_type[{position}].{field}");
        let type_name = self.required_string(node, "typename", &label("typename"))?;
        let filename = self.required_string(node, "filename", &label("filename"))?;
        let animation = self.required_string(node, "animation", &label("animation"))?;
        let animation_speed =
            self.required_double(node, "animation_speed", &label("animation_speed"))?;
        if animation_speed < 0.0 {
            return Err(self.fail(&label("animation_speed"), "must not be negative"));
        }
        let pose_text = self.required_string(node, "initial_pose", &label("initial_pose"))?;
        let mut initial_pose = Pose::default();
        if let Err(parse) = initial_pose.parse_into(&pose_text) {
            return Err(self.fail_with(
                &label("initial_pose"),
                format!("`{pose_text}` in type `{type_name}`: {parse}"),
                |_, _| CrowdError::PoseParse(parse.clone()),
            ));
        }
        Ok(ModelTypeSettings {
            type_name,
            filename,
            animation,
            animation_speed,
            initial_pose,
        })
    }

    fn model_types<N: ConfigNode>(&mut self, node: &N) -> Result<Vec<ModelTypeSettings>> {
        let Some(first) = node.child("model_type") else {
            return Err(self.fail("model_type", "at least one model_type block is required"));
        };
        let mut seen = HashSet::new();
        let mut models = Vec::new();
        for (position, block) in first.siblings().enumerate() {
            let model = self.model_type(&block, position)?;
            if !seen.insert(model.type_name.clone()) {
                return Err(self.fail_with(
                    &format!("model_type[{position}].typename"),
                    format!("type `{}` is defined twice", model.type_name),
                    |_, _| CrowdError::DuplicateType(model.type_name.clone()),
                ));
            }
            models.push(model);
        }
        Ok(models)
    }

    fn external_agents<N: ConfigNode>(&mut self, node: &N) -> Result<Vec<String>> {
        let Some(first) = node.child("external_agent") else {
            self.warn(
                "external_agent",
                "no external agents configured; every scene agent is engine driven",
            );
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for (position, entry) in first.siblings().enumerate() {
            let field = format!("external_agent[{position}]");
            let Some(name) = entry.value_string().filter(|n| !n.trim().is_empty()) else {
                return Err(self.fail(&field, "must be a non-empty model name"));
            };
            if !seen.insert(name.clone()) {
                return Err(self.fail(&field, format!("`{name}` is listed twice")));
            }
            info!("external agent `{name}`");
            names.push(name);
        }
        Ok(names)
    }
}

/// Reads and validates crowd settings from a configuration element.
///
/// `fallback_resource_path` is used when the element has no
/// `resource_path`; the caller decides where it comes from. Every rejected
/// field produces an error [`Diagnostic`] before the error is returned.
///
/// # Errors
/// [`CrowdError::Configuration`] for missing or malformed fields,
/// [`CrowdError::PoseParse`] for a malformed `initial_pose` and
/// [`CrowdError::DuplicateType`] for a repeated `typename`.
pub fn read_settings<N: ConfigNode>(
    node: &N,
    fallback_resource_path: Option<&Path>,
) -> Result<SettingsReport> {
    let mut reader = Reader::default();
    let resource_path = reader.resource_path(node, fallback_resource_path)?;
    let behavior_file = reader.required_string(node, "behavior_file", "behavior_file")?;
    let scene_file = reader.required_string(node, "scene_file", "scene_file")?;
    let update_time_step = reader.required_double(node, "update_time_step", "update_time_step")?;
    if !update_time_step.is_finite() || update_time_step <= 0.0 {
        return Err(reader.fail(
            "update_time_step",
            format!("must be positive, got {update_time_step}"),
        ));
    }
    let model_types = reader.model_types(node)?;
    let external_agents = reader.external_agents(node)?;

    Ok(SettingsReport {
        settings: CrowdSettings {
            resource_path,
            behavior_file,
            scene_file,
            update_time_step,
            model_types,
            external_agents,
        },
        diagnostics: reader.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TomlNode;
    use crate::error::PoseParseError;
    use crate::logging::Severity;
    use rstest::rstest;
    use toml::Value;

    const VALID: &str = r#"
        resource_path = "/srv/crowd"
        behavior_file = "behavior.toml"
        scene_file = "scene.toml"
        update_time_step = 0.1
        external_agent = ["robot1"]

        [[model_type]]
        typename = "guard"
        filename = "guard.dae"
        animation = "walk"
        animation_speed = 4.5
        initial_pose = "0 0 0.5 0 0 1.5708"
    "#;

    fn read(text: &str, fallback: Option<&Path>) -> Result<SettingsReport> {
        let document: Value = text.parse().expect("valid toml");
        read_settings(&TomlNode::root(&document), fallback)
    }

    fn without(field: &str) -> String {
        VALID
            .lines()
            .filter(|line| !line.trim_start().starts_with(field))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[rstest]
    fn valid_settings_are_read() {
        let report = read(VALID, None).expect("settings are valid");
        let settings = &report.settings;
        assert_eq!(settings.resource_path, PathBuf::from("/srv/crowd"));
        assert_eq!(settings.external_agents, ["robot1"]);
        let guard = &settings.model_types[0];
        assert_eq!(guard.initial_pose, Pose::new(0.0, 0.0, 0.5, 0.0, 0.0, 1.5708));
        assert!(report.diagnostics.is_empty());
        assert_eq!(settings.registry().expect("registry").count(), 1);
    }

    #[rstest]
    #[case("behavior_file")]
    #[case("scene_file")]
    #[case("update_time_step")]
    fn missing_required_field_is_reported(#[case] field: &str) {
        let err = read(&without(field), None).expect_err("field is required");
        assert_eq!(
            err,
            CrowdError::Configuration {
                field: field.to_owned(),
                detail: "required".to_owned()
            }
        );
    }

    #[rstest]
    #[case("typename")]
    #[case("filename")]
    #[case("animation =")]
    #[case("animation_speed")]
    #[case("initial_pose")]
    fn model_type_fields_are_required(#[case] field: &str) {
        let err = read(&without(field), None).expect_err("model_type field is required");
        let CrowdError::Configuration { field: reported, .. } = err else {
            panic!("expected configuration error, got {err:?}");
        };
        assert!(reported.starts_with("model_type[0]."));
    }

    #[rstest]
    fn fallback_resource_path_is_used_with_a_warning() {
        let report = read(&without("resource_path"), Some(Path::new("/opt/res")))
            .expect("fallback resolves");
        assert_eq!(report.settings.resource_path, PathBuf::from("/opt/res"));
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].severity, Severity::Warning);
    }

    #[rstest]
    fn missing_resource_path_without_fallback_fails() {
        let err = read(&without("resource_path"), None).expect_err("no resource path");
        assert!(matches!(err, CrowdError::Configuration { ref field, .. } if field == "resource_path"));
    }

    #[rstest]
    #[case("0.0")]
    #[case("-1.0")]
    #[case("nan")]
    fn non_positive_or_nan_timestep_is_rejected(#[case] value: &str) {
        let text = VALID.replace("update_time_step = 0.1", &format!("update_time_step = {value}"));
        assert!(matches!(
            read(&text, None),
            Err(CrowdError::Configuration { ref field, .. }) if field == "update_time_step"
        ));
    }

    #[rstest]
    fn five_token_pose_is_a_parse_error() {
        let text = VALID.replace("0 0 0.5 0 0 1.5708", "0 0 0.5 0 0");
        assert_eq!(
            read(&text, None),
            Err(CrowdError::PoseParse(PoseParseError::TokenCount { found: 5 }))
        );
    }

    #[rstest]
    fn duplicate_type_is_rejected() {
        let duplicate = r#"
        [[model_type]]
        typename = "guard"
        filename = "other.dae"
        animation = "run"
        animation_speed = 1.0
        initial_pose = "0 0 0 0 0 0"
        "#;
        let text = format!("{VALID}{duplicate}");
        assert_eq!(
            read(&text, None),
            Err(CrowdError::DuplicateType("guard".into()))
        );
    }

    #[rstest]
    fn zero_external_agents_is_a_warning() {
        let report = read(&without("external_agent"), None).expect("externals are optional");
        assert!(report.settings.external_agents.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].field, "external_agent");
    }

    #[rstest]
    #[case(r#"external_agent = ["robot1", "robot1"]"#, "external_agent[1]")]
    #[case(r#"external_agent = ["robot1", ""]"#, "external_agent[1]")]
    fn bad_external_agents_are_rejected(#[case] line: &str, #[case] field: &str) {
        let text = VALID.replace(r#"external_agent = ["robot1"]"#, line);
        assert!(matches!(
            read(&text, None),
            Err(CrowdError::Configuration { field: ref reported, .. }) if reported == field
        ));
    }

    #[rstest]
    fn missing_model_type_is_rejected() {
        let text: String = VALID
            .split("[[model_type]]")
            .next()
            .expect("prefix")
            .to_owned();
        assert!(matches!(
            read(&text, None),
            Err(CrowdError::Configuration { ref field, .. }) if field == "model_type"
        ));
    }
}
