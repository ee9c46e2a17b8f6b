//! Contract for engine-implemented components

use std::any::Any;

use super::{Hook, HookSet};
use crate::runtime::HookContext;
use crate::script::{ScriptError, Value};

/// A component implemented in Rust
///
/// Native components expose a fixed field set to content (for overrides and
/// field access) and declare up front which hooks they implement.
pub trait NativeComponent: Any {
    /// Registered type name
    fn type_name(&self) -> &'static str;

    /// Names of every field this type exposes
    fn field_names(&self) -> &'static [&'static str];

    /// Read a field
    fn field(&self, name: &str) -> Option<Value>;

    /// Write a field
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), ScriptError>;

    /// Hooks this type implements
    fn hooks(&self) -> HookSet;

    /// Run a hook; only called for hooks listed in [`Self::hooks`]
    fn call_hook(&mut self, hook: Hook, ctx: &HookContext<'_>) -> Result<(), ScriptError>;

    /// Explicit copy used when instantiating templates
    fn clone_native(&self) -> Box<dyn NativeComponent>;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
