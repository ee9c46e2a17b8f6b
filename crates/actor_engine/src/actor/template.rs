//! Actor and component templates
//!
//! A template is a named blueprint. Instantiating it deep-copies the component
//! set: native components through [`NativeComponent::clone_native`], prototype
//! components as fresh objects inheriting from the template's object.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::debug;

use super::{Actor, ActorRef};
use crate::component::{Component, ComponentBody, ComponentRegistry, NativeComponent};
use crate::resources::ResourceError;
use crate::script::{ScriptError, ScriptObject, Value};

enum TemplateBody {
    Native(Box<dyn NativeComponent>),
    Prototype(Rc<ScriptObject>),
}

impl Clone for TemplateBody {
    fn clone(&self) -> Self {
        match self {
            Self::Native(native) => Self::Native(native.clone_native()),
            Self::Prototype(object) => Self::Prototype(Rc::clone(object)),
        }
    }
}

/// Blueprint for one component
#[derive(Clone)]
pub struct ComponentTemplate {
    type_name: String,
    enabled: bool,
    body: TemplateBody,
}

impl ComponentTemplate {
    /// Blank template of a registered type
    pub fn from_registry(registry: &ComponentRegistry, type_name: &str) -> Result<Self, ResourceError> {
        let body = if registry.is_native(type_name) {
            TemplateBody::Native(registry.create_native(type_name)?)
        } else {
            TemplateBody::Prototype(Rc::new(ScriptObject::inheriting(registry.prototype(type_name)?)))
        };
        Ok(Self {
            type_name: type_name.to_string(),
            enabled: true,
            body,
        })
    }

    /// Template that copies (native) or inherits from (prototype) this one
    pub fn derive(&self) -> Self {
        let body = match &self.body {
            TemplateBody::Native(native) => TemplateBody::Native(native.clone_native()),
            TemplateBody::Prototype(object) => {
                TemplateBody::Prototype(Rc::new(ScriptObject::inheriting(Rc::clone(object))))
            }
        };
        Self {
            type_name: self.type_name.clone(),
            enabled: self.enabled,
            body,
        }
    }

    /// Component type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether instances start enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read a field as an instance would see it
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "type" => Some(Value::Str(self.type_name.clone())),
            "enabled" => Some(Value::Bool(self.enabled)),
            _ => match &self.body {
                TemplateBody::Native(native) => native.field(name),
                TemplateBody::Prototype(object) => object.get(name).cloned(),
            },
        }
    }

    /// Write a field unconditionally
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        match name {
            "type" | "key" => Err(ScriptError::ReadOnly(name.to_string())),
            "enabled" => {
                self.enabled = value.as_bool().ok_or_else(|| ScriptError::mismatch(name, "boolean", &value))?;
                Ok(())
            }
            _ => match &mut self.body {
                TemplateBody::Native(native) => native.set_field(name, value),
                TemplateBody::Prototype(object) => {
                    Rc::make_mut(object).set(name, value);
                    Ok(())
                }
            },
        }
    }

    /// Apply a declarative override
    ///
    /// Only fields that already resolve on the component are written; unknown
    /// names and the immutable `type`/`key` are dropped. Returns whether the
    /// override was applied.
    pub fn apply_override(&mut self, name: &str, value: Value) -> Result<bool, ScriptError> {
        if matches!(name, "type" | "key") || self.field(name).is_none() {
            debug!("Dropping override '{}' on component type '{}'", name, self.type_name);
            return Ok(false);
        }
        self.set_field(name, value)?;
        Ok(true)
    }

    /// Build an instance under `key`
    pub fn instantiate(&self, key: &str) -> Component {
        let body = match &self.body {
            TemplateBody::Native(native) => ComponentBody::Native(native.clone_native()),
            TemplateBody::Prototype(object) => ComponentBody::Prototype(ScriptObject::inheriting(Rc::clone(object))),
        };
        let mut component = Component::new(self.type_name.clone(), key, body);
        component.set_enabled(self.enabled);
        component
    }
}

/// Blueprint for an actor
#[derive(Clone, Default)]
pub struct ActorTemplate {
    name: String,
    components: BTreeMap<String, ComponentTemplate>,
}

impl ActorTemplate {
    /// Create an empty template
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: BTreeMap::new(),
        }
    }

    /// Add a component under `key` (builder pattern)
    pub fn with_component(mut self, key: impl Into<String>, component: ComponentTemplate) -> Self {
        self.insert_component(key, component);
        self
    }

    /// Add or replace a component under `key`
    pub fn insert_component(&mut self, key: impl Into<String>, component: ComponentTemplate) {
        self.components.insert(key.into(), component);
    }

    /// Name given to instances
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the template
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Component template at `key`
    pub fn component(&self, key: &str) -> Option<&ComponentTemplate> {
        self.components.get(key)
    }

    /// Mutable component template at `key`
    pub fn component_mut(&mut self, key: &str) -> Option<&mut ComponentTemplate> {
        self.components.get_mut(key)
    }

    /// Component keys, ascending
    pub fn component_keys(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Template whose components all derive from this one's
    pub fn derive(&self) -> Self {
        Self {
            name: self.name.clone(),
            components: self
                .components
                .iter()
                .map(|(key, component)| (key.clone(), component.derive()))
                .collect(),
        }
    }

    /// Build a new, not yet activated actor with every component pending
    pub fn instantiate(&self) -> ActorRef {
        let actor = Actor::new(self.name.clone());
        for (key, component) in &self.components {
            actor.insert_pending(component.instantiate(key));
        }
        actor
    }
}

/// Named actor templates
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, ActorTemplate>,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a template under `name`
    pub fn insert(&mut self, name: impl Into<String>, template: ActorTemplate) {
        self.templates.insert(name.into(), template);
    }

    /// Template lookup; a missing template is a content error
    pub fn get(&self, name: &str) -> Result<&ActorTemplate, ResourceError> {
        self.templates
            .get(name)
            .ok_or_else(|| ResourceError::MissingTemplate(name.to_string()))
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True if no templates are registered
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Rigidbody;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::with_builtins();
        registry.define_prototype("Health", ScriptObject::new().with_field("hp", 10_i64));
        registry
    }

    #[test]
    fn test_prototype_instances_inherit_from_template_object() {
        let registry = registry();
        let mut health = ComponentTemplate::from_registry(&registry, "Health").unwrap();
        health.set_field("hp", Value::Int(25)).unwrap();
        let template = ActorTemplate::new("Orc").with_component("1", health);

        let a = template.instantiate();
        let b = template.instantiate();
        a.init_new_components();
        b.init_new_components();

        let ca = a.get_component("Health").unwrap();
        let cb = b.get_component("Health").unwrap();
        assert_eq!(ca.borrow().get("hp"), Some(Value::Int(25)));

        // Writes stay on the instance
        ca.borrow_mut().set("hp", Value::Int(3)).unwrap();
        assert_eq!(cb.borrow().get("hp"), Some(Value::Int(25)));
        assert_eq!(ca.borrow().key(), "1");
    }

    #[test]
    fn test_native_instances_are_independent_copies() {
        let registry = registry();
        let mut body = ComponentTemplate::from_registry(&registry, "Rigidbody").unwrap();
        body.set_field("width", Value::Float(4.0)).unwrap();
        let template = ActorTemplate::new("Crate").with_component("body", body);

        let actor = template.instantiate();
        actor.init_new_components();
        let component = actor.get_component("Rigidbody").unwrap();
        component.borrow_mut().set("width", Value::Float(9.0)).unwrap();

        assert_eq!(template.component("body").unwrap().field("width"), Some(Value::Float(4.0)));
        assert!(component.borrow().native::<Rigidbody>().is_some());
    }

    #[test]
    fn test_overrides_only_touch_existing_fields() {
        let registry = registry();
        let mut health = ComponentTemplate::from_registry(&registry, "Health").unwrap();

        assert!(health.apply_override("hp", Value::Int(7)).unwrap());
        assert!(!health.apply_override("mana", Value::Int(7)).unwrap());
        assert!(!health.apply_override("type", Value::from("Other")).unwrap());
        assert!(health.apply_override("enabled", Value::Bool(false)).unwrap());

        assert_eq!(health.field("hp"), Some(Value::Int(7)));
        assert!(health.field("mana").is_none());
        assert_eq!(health.type_name(), "Health");
        assert!(!health.instantiate("k").is_enabled());
    }

    #[test]
    fn test_derived_template_keeps_base_untouched() {
        let registry = registry();
        let base = ActorTemplate::new("Orc")
            .with_component("1", ComponentTemplate::from_registry(&registry, "Health").unwrap());
        let mut derived = base.derive();
        derived.component_mut("1").unwrap().apply_override("hp", Value::Int(99)).unwrap();

        assert_eq!(base.component("1").unwrap().field("hp"), Some(Value::Int(10)));
        assert_eq!(derived.component("1").unwrap().field("hp"), Some(Value::Int(99)));
    }

    #[test]
    fn test_missing_template_is_resource_error() {
        let templates = TemplateRegistry::new();
        assert!(matches!(templates.get("Ghost"), Err(ResourceError::MissingTemplate(_))));
    }
}
