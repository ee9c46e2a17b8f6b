//! Registry of component types
//!
//! Resolves a type name to either a native factory or a shared prototype
//! object, and builds fresh component bodies from either.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use super::{ComponentBody, NativeComponent, Rigidbody};
use crate::resources::ResourceError;
use crate::script::ScriptObject;

/// Constructor for a native component type
pub type NativeFactory = Box<dyn Fn() -> Box<dyn NativeComponent>>;

/// Named native factories and prototype objects
#[derive(Default)]
pub struct ComponentRegistry {
    natives: HashMap<String, NativeFactory>,
    prototypes: HashMap<String, Rc<ScriptObject>>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in native types (`Rigidbody`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_native(Rigidbody::TYPE_NAME, || Box::new(Rigidbody::default()));
        registry
    }

    /// Register a native component type
    pub fn register_native<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NativeComponent> + 'static,
    {
        let type_name = type_name.into();
        debug!("Registered native component type '{type_name}'");
        self.natives.insert(type_name, Box::new(factory));
    }

    /// Register (or replace) a prototype-based component type
    pub fn define_prototype(&mut self, type_name: impl Into<String>, prototype: ScriptObject) -> Rc<ScriptObject> {
        let type_name = type_name.into();
        let prototype = Rc::new(prototype);
        debug!("Defined component prototype '{type_name}'");
        self.prototypes.insert(type_name, Rc::clone(&prototype));
        prototype
    }

    /// True if the type is implemented natively
    pub fn is_native(&self, type_name: &str) -> bool {
        self.natives.contains_key(type_name)
    }

    /// True if the type is known at all
    pub fn contains(&self, type_name: &str) -> bool {
        self.is_native(type_name) || self.prototypes.contains_key(type_name)
    }

    /// Shared prototype object for a prototype-based type
    pub fn prototype(&self, type_name: &str) -> Result<Rc<ScriptObject>, ResourceError> {
        self.prototypes
            .get(type_name)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownComponentType(type_name.to_string()))
    }

    /// New native instance of a native type
    pub fn create_native(&self, type_name: &str) -> Result<Box<dyn NativeComponent>, ResourceError> {
        self.natives
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| ResourceError::UnknownComponentType(type_name.to_string()))
    }

    /// Fresh body for `type_name`: a new native object, or a blank object inheriting from the prototype
    pub fn create_body(&self, type_name: &str) -> Result<ComponentBody, ResourceError> {
        if self.is_native(type_name) {
            return self.create_native(type_name).map(ComponentBody::Native);
        }
        let prototype = self.prototype(type_name)?;
        Ok(ComponentBody::Prototype(ScriptObject::inheriting(prototype)))
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.natives.keys().chain(self.prototypes.keys()).cloned().collect();
        names.sort();
        names
    }
}
