//! Declarative actor and scene descriptions
//!
//! A resources directory holds `templates/<name>.template` and
//! `scenes/<name>.scene` JSON files, plus the game configuration. Template and
//! scene entries share one actor shape:
//!
//! ```json
//! { "template": "Orc", "name": "Boss", "components": { "1": { "hp": 40 } } }
//! ```
//!
//! Every content problem found here is fatal and surfaces as a [`ResourceError`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::actor::{ActorTemplate, ComponentTemplate, TemplateRegistry};
use crate::component::ComponentRegistry;
use crate::scene::SceneBlueprint;
use crate::script::Value;

/// Directory holding actor templates
pub const TEMPLATE_DIR: &str = "templates";
/// Directory holding scene descriptions
pub const SCENE_DIR: &str = "scenes";
/// File extension of actor templates
pub const TEMPLATE_EXTENSION: &str = "template";
/// File extension of scene descriptions
pub const SCENE_EXTENSION: &str = "scene";
/// Game configuration file inside a resources directory
pub const CONFIG_FILE: &str = "game.toml";

const INTEGRAL_TOLERANCE: f64 = 1e-10;

/// Fatal content faults
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A type name that is neither native nor a defined prototype
    #[error("component type '{0}' is not defined")]
    UnknownComponentType(String),

    /// A component entry without `type` whose key the base template lacks
    #[error("component type unspecified for '{key}' on '{actor}'")]
    UnspecifiedComponentType {
        /// Component key in the description
        key: String,
        /// Actor the entry belongs to
        actor: String,
    },

    /// Template lookup failed
    #[error("template '{0}' is missing")]
    MissingTemplate(String),

    /// Scene lookup failed
    #[error("scene '{0}' is missing")]
    MissingScene(String),

    /// An override value the component refused
    #[error("invalid override '{field}' on component '{key}': {message}")]
    InvalidOverride {
        /// Component key in the description
        key: String,
        /// Field being overridden
        field: String,
        /// Why the component refused it
        message: String,
    },

    /// A resource file could not be read
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A resource file is not valid JSON of the expected shape
    #[error("invalid JSON in '{origin}': {source}")]
    Json {
        /// File or label the JSON came from
        origin: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },
}

/// One actor entry of a template or scene file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorDescription {
    /// Base template, scene entries only
    #[serde(default)]
    pub template: Option<String>,
    /// Actor name, overriding the template's
    #[serde(default)]
    pub name: Option<String>,
    /// Component entries by key; each may carry `type` and field overrides
    #[serde(default)]
    pub components: BTreeMap<String, BTreeMap<String, JsonValue>>,
}

impl ActorDescription {
    /// Parse a single actor description
    pub fn from_json(origin: &str, json: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(json).map_err(|source| ResourceError::Json {
            origin: origin.to_string(),
            source,
        })
    }

    /// Build a template from this entry on top of an optional base
    ///
    /// An entry naming a `type` gets a fresh component of that type. An entry
    /// without one derives from the base's component under the same key.
    pub fn build(
        &self,
        components: &ComponentRegistry,
        base: Option<&ActorTemplate>,
    ) -> Result<ActorTemplate, ResourceError> {
        let mut template = base.cloned().unwrap_or_default();
        if let Some(name) = &self.name {
            template.set_name(name.clone());
        }

        for (key, entry) in &self.components {
            let mut component = match entry.get("type").and_then(JsonValue::as_str) {
                Some(type_name) => ComponentTemplate::from_registry(components, type_name)?,
                None => match template.component(key) {
                    Some(existing) => existing.derive(),
                    None => {
                        return Err(ResourceError::UnspecifiedComponentType {
                            key: key.clone(),
                            actor: template.name().to_string(),
                        })
                    }
                },
            };

            for (field, json) in entry {
                let Some(value) = coerce(json) else {
                    debug!("Skipping non-coercible override '{}' on '{}'", field, key);
                    continue;
                };
                component
                    .apply_override(field, value)
                    .map_err(|err| ResourceError::InvalidOverride {
                        key: key.clone(),
                        field: field.clone(),
                        message: err.to_string(),
                    })?;
            }

            template.insert_component(key.clone(), component);
        }

        Ok(template)
    }
}

/// Contents of a scene file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneDescription {
    /// Actors spawned whenever the scene loads
    #[serde(default)]
    pub actors: Vec<ActorDescription>,
}

impl SceneDescription {
    /// Parse a scene description
    pub fn from_json(origin: &str, json: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(json).map_err(|source| ResourceError::Json {
            origin: origin.to_string(),
            source,
        })
    }

    /// Resolve every actor entry into a blueprint named `name`
    pub fn build(
        &self,
        name: &str,
        components: &ComponentRegistry,
        templates: &TemplateRegistry,
    ) -> Result<SceneBlueprint, ResourceError> {
        let mut blueprint = SceneBlueprint::new(name);
        for actor in &self.actors {
            let base = match &actor.template {
                Some(template) => Some(templates.get(template)?),
                None => None,
            };
            blueprint.push_actor(actor.build(components, base)?);
        }
        Ok(blueprint)
    }
}

/// Convert a JSON override into a script value
///
/// Numbers within `1e-10` of an integer become `Int`, arrays become float
/// lists (two-dimensional when the first element is itself an array). Null
/// and objects have no script counterpart.
pub fn coerce(json: &JsonValue) -> Option<Value> {
    match json {
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(number) => {
            let value = number.as_f64()?;
            let truncated = value.trunc();
            if (truncated - value).abs() < INTEGRAL_TOLERANCE && truncated.abs() < i64::MAX as f64 {
                Some(Value::Int(truncated as i64))
            } else {
                Some(Value::Float(value))
            }
        }
        JsonValue::String(s) => Some(Value::Str(s.clone())),
        JsonValue::Array(items) => match items.first() {
            Some(JsonValue::Array(_)) => Some(Value::Grid(items.iter().map(float_row).collect())),
            _ => Some(Value::List(float_row(json))),
        },
        JsonValue::Null | JsonValue::Object(_) => None,
    }
}

fn float_row(json: &JsonValue) -> Vec<f32> {
    json.as_array()
        .map(|row| row.iter().filter_map(JsonValue::as_f64).map(|v| v as f32).collect())
        .unwrap_or_default()
}

/// A resources directory on disk
#[derive(Debug, Clone)]
pub struct ResourceDirectory {
    root: PathBuf,
}

impl ResourceDirectory {
    /// Wrap a resources root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the game configuration file
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Load every `templates/*.template` file
    ///
    /// A missing directory yields an empty registry.
    pub fn load_templates(&self, components: &ComponentRegistry) -> Result<TemplateRegistry, ResourceError> {
        let mut templates = TemplateRegistry::new();
        for (name, path) in list_files(&self.root.join(TEMPLATE_DIR), TEMPLATE_EXTENSION)? {
            let json = read(&path)?;
            let description = ActorDescription::from_json(&path.display().to_string(), &json)?;
            templates.insert(name, description.build(components, None)?);
        }
        info!("Loaded {} actor templates", templates.len());
        Ok(templates)
    }

    /// Load every `scenes/*.scene` file into blueprints
    pub fn load_scenes(
        &self,
        components: &ComponentRegistry,
        templates: &TemplateRegistry,
    ) -> Result<Vec<SceneBlueprint>, ResourceError> {
        let mut scenes = Vec::new();
        for (name, path) in list_files(&self.root.join(SCENE_DIR), SCENE_EXTENSION)? {
            let json = read(&path)?;
            let description = SceneDescription::from_json(&path.display().to_string(), &json)?;
            scenes.push(description.build(&name, components, templates)?);
        }
        info!("Loaded {} scenes", scenes.len());
        Ok(scenes)
    }
}

fn read(path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Files in `dir` with the given extension as (stem, path), sorted by stem
fn list_files(dir: &Path, extension: &str) -> Result<Vec<(String, PathBuf)>, ResourceError> {
    if !dir.is_dir() {
        debug!("Resource directory '{}' not present", dir.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| ResourceError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ResourceError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptObject;
    use serde_json::json;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::with_builtins();
        registry.define_prototype(
            "Mover",
            ScriptObject::new()
                .with_field("speed", 1.5_f64)
                .with_field("label", "idle")
                .with_field("active", true)
                .with_field("lanes", Value::List(Vec::new())),
        );
        registry
    }

    #[test]
    fn test_coercion_rules() {
        assert_eq!(coerce(&json!(true)), Some(Value::Bool(true)));
        assert_eq!(coerce(&json!(3.0)), Some(Value::Int(3)));
        assert_eq!(coerce(&json!(3.5)), Some(Value::Float(3.5)));
        assert_eq!(coerce(&json!("hi")), Some(Value::from("hi")));
        assert_eq!(coerce(&json!([1, 2.5])), Some(Value::List(vec![1.0, 2.5])));
        assert_eq!(
            coerce(&json!([[1, 2], [3]])),
            Some(Value::Grid(vec![vec![1.0, 2.0], vec![3.0]]))
        );
        assert!(coerce(&json!(null)).is_none());
        assert!(coerce(&json!({"a": 1})).is_none());
    }

    #[test]
    fn test_template_entry_builds_components() {
        let description = ActorDescription::from_json(
            "inline",
            r#"{ "name": "Runner", "components": {
                "1": { "type": "Mover", "speed": 4, "label": "run", "bogus": 7 },
                "2": { "type": "Rigidbody", "body_type": "static", "width": 3.5 }
            } }"#,
        )
        .unwrap();
        let template = description.build(&registry(), None).unwrap();

        assert_eq!(template.name(), "Runner");
        let mover = template.component("1").unwrap();
        assert_eq!(mover.field("speed"), Some(Value::Int(4)));
        assert_eq!(mover.field("label"), Some(Value::from("run")));
        assert!(mover.field("bogus").is_none());
        let body = template.component("2").unwrap();
        assert_eq!(body.field("body_type"), Some(Value::from("static")));
        assert_eq!(body.field("width"), Some(Value::Float(3.5)));
    }

    #[test]
    fn test_untyped_entry_needs_base_component() {
        let description = ActorDescription::from_json("inline", r#"{ "components": { "9": { "speed": 2 } } }"#).unwrap();
        let err = description.build(&registry(), None).err().unwrap();
        assert!(matches!(err, ResourceError::UnspecifiedComponentType { ref key, .. } if key == "9"));
    }

    #[test]
    fn test_scene_entries_override_template_components() {
        let registry = registry();
        let mut templates = TemplateRegistry::new();
        let base = ActorDescription::from_json(
            "base",
            r#"{ "name": "Runner", "components": { "1": { "type": "Mover" } } }"#,
        )
        .unwrap()
        .build(&registry, None)
        .unwrap();
        templates.insert("Runner", base);

        let scene = SceneDescription::from_json(
            "level",
            r#"{ "actors": [
                { "template": "Runner", "name": "Fast", "components": { "1": { "speed": 9.25 } } },
                { "template": "Runner" }
            ] }"#,
        )
        .unwrap()
        .build("level", &registry, &templates)
        .unwrap();

        assert_eq!(scene.name(), "level");
        assert_eq!(scene.actors().len(), 2);
        assert_eq!(scene.actors()[0].name(), "Fast");
        assert_eq!(scene.actors()[0].component("1").unwrap().field("speed"), Some(Value::Float(9.25)));
        assert_eq!(scene.actors()[1].component("1").unwrap().field("speed"), Some(Value::Float(1.5)));
    }

    #[test]
    fn test_scene_with_missing_template_fails() {
        let scene = SceneDescription::from_json("level", r#"{ "actors": [ { "template": "Nope" } ] }"#).unwrap();
        let err = scene.build("level", &registry(), &TemplateRegistry::new()).err().unwrap();
        assert!(matches!(err, ResourceError::MissingTemplate(name) if name == "Nope"));
    }

    #[test]
    fn test_invalid_json_reports_origin() {
        let err = SceneDescription::from_json("broken.scene", "{ actors: ").unwrap_err();
        assert!(err.to_string().contains("broken.scene"));
    }

    #[test]
    fn test_directory_loading() {
        let root = std::env::temp_dir().join(format!("actor_engine_resources_{}", std::process::id()));
        std::fs::create_dir_all(root.join(TEMPLATE_DIR)).unwrap();
        std::fs::create_dir_all(root.join(SCENE_DIR)).unwrap();
        std::fs::write(
            root.join(TEMPLATE_DIR).join("Runner.template"),
            r#"{ "name": "Runner", "components": { "1": { "type": "Mover" } } }"#,
        )
        .unwrap();
        std::fs::write(root.join(TEMPLATE_DIR).join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            root.join(SCENE_DIR).join("basic.scene"),
            r#"{ "actors": [ { "template": "Runner" } ] }"#,
        )
        .unwrap();

        let directory = ResourceDirectory::new(&root);
        let registry = registry();
        let templates = directory.load_templates(&registry).unwrap();
        let scenes = directory.load_scenes(&registry, &templates).unwrap();

        assert!(templates.contains("Runner"));
        assert_eq!(templates.len(), 1);
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].name(), "basic");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_directories_are_empty() {
        let directory = ResourceDirectory::new("/nonexistent/actor_engine");
        let templates = directory.load_templates(&registry()).unwrap();
        assert!(templates.is_empty());
    }
}
