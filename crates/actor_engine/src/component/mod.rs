//! Components: units of behavior attached to actors
//!
//! A component is either native (a Rust type implementing [`NativeComponent`])
//! or prototype-based (a [`ScriptObject`] inheriting from a registered
//! prototype). Both share the header fields `type`, `key`, `enabled` and
//! `started`, and both are dispatched through the same [`Hook`] contract.

pub mod native;
pub mod registry;
pub mod rigidbody;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::actor::{Actor, ActorRef};
use crate::runtime::HookContext;
use crate::script::{ScriptError, ScriptObject, Value};

pub use native::NativeComponent;
pub use registry::{ComponentRegistry, NativeFactory};
pub use rigidbody::Rigidbody;

/// Shared handle to a component
pub type ComponentRef = Rc<RefCell<Component>>;

/// Lifecycle callback a component may define
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Once, before the first update
    Start,
    /// Every frame
    Update,
    /// Every frame, after all updates
    LateUpdate,
    /// When the component is removed or its actor destroyed
    Destroy,
    /// Solid contact began
    CollisionEnter,
    /// Solid contact ended
    CollisionExit,
    /// Sensor overlap began
    TriggerEnter,
    /// Sensor overlap ended
    TriggerExit,
}

impl Hook {
    /// Every hook, in probing order
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::Update,
        Self::LateUpdate,
        Self::Destroy,
        Self::CollisionEnter,
        Self::CollisionExit,
        Self::TriggerEnter,
        Self::TriggerExit,
    ];

    /// Field name the hook is looked up under
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "OnStart",
            Self::Update => "OnUpdate",
            Self::LateUpdate => "OnLateUpdate",
            Self::Destroy => "OnDestroy",
            Self::CollisionEnter => "OnCollisionEnter",
            Self::CollisionExit => "OnCollisionExit",
            Self::TriggerEnter => "OnTriggerEnter",
            Self::TriggerExit => "OnTriggerExit",
        }
    }

    /// Flag for this hook in a [`HookSet`]
    pub fn flag(self) -> HookSet {
        match self {
            Self::Start => HookSet::START,
            Self::Update => HookSet::UPDATE,
            Self::LateUpdate => HookSet::LATE_UPDATE,
            Self::Destroy => HookSet::DESTROY,
            Self::CollisionEnter => HookSet::COLLISION_ENTER,
            Self::CollisionExit => HookSet::COLLISION_EXIT,
            Self::TriggerEnter => HookSet::TRIGGER_ENTER,
            Self::TriggerExit => HookSet::TRIGGER_EXIT,
        }
    }
}

bitflags! {
    /// Set of hooks a component defines
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HookSet: u16 {
        /// `OnStart`
        const START = 1 << 0;
        /// `OnUpdate`
        const UPDATE = 1 << 1;
        /// `OnLateUpdate`
        const LATE_UPDATE = 1 << 2;
        /// `OnDestroy`
        const DESTROY = 1 << 3;
        /// `OnCollisionEnter`
        const COLLISION_ENTER = 1 << 4;
        /// `OnCollisionExit`
        const COLLISION_EXIT = 1 << 5;
        /// `OnTriggerEnter`
        const TRIGGER_ENTER = 1 << 6;
        /// `OnTriggerExit`
        const TRIGGER_EXIT = 1 << 7;
    }
}

/// Storage behind a component
pub enum ComponentBody {
    /// Engine-implemented component
    Native(Box<dyn NativeComponent>),
    /// Dynamic object inheriting from a prototype
    Prototype(ScriptObject),
}

impl ComponentBody {
    fn get(&self, name: &str) -> Option<Value> {
        match self {
            Self::Native(native) => native.field(name),
            Self::Prototype(object) => object.get(name).cloned(),
        }
    }

    fn hooks(&self) -> HookSet {
        match self {
            Self::Native(native) => native.hooks(),
            Self::Prototype(object) => Hook::ALL
                .into_iter()
                .filter(|hook| object.has_callable(hook.name()))
                .fold(HookSet::empty(), |set, hook| set | hook.flag()),
        }
    }
}

/// One component instance on an actor
pub struct Component {
    type_name: String,
    key: String,
    enabled: bool,
    started: bool,
    actor: Weak<Actor>,
    body: ComponentBody,
}

impl Component {
    /// Create a detached, enabled, not-yet-started component
    pub fn new(type_name: impl Into<String>, key: impl Into<String>, body: ComponentBody) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            enabled: true,
            started: false,
            actor: Weak::new(),
            body,
        }
    }

    /// Type name the component was created from
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Instance key, unique within the owning actor
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the component takes part in dispatch
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the component
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether `OnStart` has run
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    /// Owning actor, if still alive
    pub fn actor(&self) -> Option<ActorRef> {
        self.actor.upgrade()
    }

    pub(crate) fn attach(&mut self, actor: Weak<Actor>) {
        self.actor = actor;
    }

    /// Eligible for update, late-update and contact hooks
    pub fn is_dispatchable(&self) -> bool {
        self.enabled && self.started
    }

    /// Underlying storage
    pub fn body(&self) -> &ComponentBody {
        &self.body
    }

    /// Prototype object, for prototype-based components
    pub fn object(&self) -> Option<&ScriptObject> {
        match &self.body {
            ComponentBody::Prototype(object) => Some(object),
            ComponentBody::Native(_) => None,
        }
    }

    /// Downcast a native component
    pub fn native<T: NativeComponent>(&self) -> Option<&T> {
        match &self.body {
            ComponentBody::Native(native) => native.as_any().downcast_ref::<T>(),
            ComponentBody::Prototype(_) => None,
        }
    }

    /// Mutably downcast a native component
    pub fn native_mut<T: NativeComponent>(&mut self) -> Option<&mut T> {
        match &mut self.body {
            ComponentBody::Native(native) => native.as_any_mut().downcast_mut::<T>(),
            ComponentBody::Prototype(_) => None,
        }
    }

    /// Read a field; header fields first, then the body
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "type" => Some(Value::Str(self.type_name.clone())),
            "key" => Some(Value::Str(self.key.clone())),
            "enabled" => Some(Value::Bool(self.enabled)),
            "started" => Some(Value::Bool(self.started)),
            "actor" => Some(Value::Actor(self.actor.clone())),
            _ => self.body.get(name),
        }
    }

    /// Write a field; `type`, `key`, `started` and `actor` are read-only
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        match name {
            "type" | "key" | "started" | "actor" => Err(ScriptError::ReadOnly(name.to_string())),
            "enabled" => {
                self.enabled = value.as_bool().ok_or_else(|| ScriptError::mismatch(name, "boolean", &value))?;
                Ok(())
            }
            _ => match &mut self.body {
                ComponentBody::Native(native) => native.set_field(name, value),
                ComponentBody::Prototype(object) => {
                    object.set(name, value);
                    Ok(())
                }
            },
        }
    }

    /// True if the field resolves to a non-nil value
    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Hooks this component defines
    pub fn hooks(&self) -> HookSet {
        self.body.hooks()
    }

    /// True if this component defines `hook`
    pub fn has_hook(&self, hook: Hook) -> bool {
        self.hooks().contains(hook.flag())
    }

    /// Run `hook` on `component`
    ///
    /// Prototype callbacks run with no borrow held, so they may freely read and
    /// write their own component through the context. Native callbacks run with
    /// the component mutably borrowed and receive `&mut self` instead.
    pub fn invoke(component: &ComponentRef, hook: Hook, ctx: &HookContext<'_>) -> Result<(), ScriptError> {
        let callback = match &component.borrow().body {
            ComponentBody::Prototype(object) => Some(object.function(hook.name())),
            ComponentBody::Native(_) => None,
        };

        match callback {
            Some(Some(callback)) => callback(ctx),
            Some(None) => Ok(()),
            None => {
                let mut guard = component.borrow_mut();
                match &mut guard.body {
                    ComponentBody::Native(native) if native.hooks().contains(hook.flag()) => {
                        native.call_hook(hook, ctx)
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.type_name)
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}
