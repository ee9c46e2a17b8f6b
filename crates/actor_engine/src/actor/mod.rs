//! Actors: entities that own components and dispatch their hooks
//!
//! All structural changes to an actor are buffered. New components wait in the
//! pending buffer until [`Actor::init_new_components`] merges them into the
//! live set, and removals wait in the removal buffer until
//! [`Actor::process_removed_components`]. Dispatch therefore never observes a
//! change made during the pass that is running.

pub mod dispatch;
pub mod template;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::trace;

use crate::component::{Component, ComponentRef, Hook};
use crate::foundation::sequence::{ActorId, Sequences};
use crate::physics::Collision;
use crate::resources::ResourceError;
use crate::runtime::{HookContext, Runtime};

pub use dispatch::HookQueues;
pub use template::{ActorTemplate, ComponentTemplate, TemplateRegistry};

/// Shared handle to an actor
pub type ActorRef = Rc<Actor>;

/// A simulation entity
pub struct Actor {
    this: Weak<Actor>,
    name: RefCell<String>,
    id: Cell<Option<ActorId>>,
    enabled: Cell<bool>,
    destroyed: Cell<bool>,
    destroy_on_load: Cell<bool>,
    components: RefCell<BTreeMap<String, ComponentRef>>,
    pending: RefCell<BTreeMap<String, ComponentRef>>,
    pending_removal: RefCell<Vec<String>>,
    hooks: RefCell<HookQueues>,
}

impl Actor {
    /// Create a new, not yet activated actor
    pub fn new(name: impl Into<String>) -> ActorRef {
        let name = name.into();
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            name: RefCell::new(name),
            id: Cell::new(None),
            enabled: Cell::new(true),
            destroyed: Cell::new(false),
            destroy_on_load: Cell::new(true),
            components: RefCell::new(BTreeMap::new()),
            pending: RefCell::new(BTreeMap::new()),
            pending_removal: RefCell::new(Vec::new()),
            hooks: RefCell::new(HookQueues::default()),
        })
    }

    /// Actor name
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Rename the actor
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    /// Id assigned at activation; `None` before that
    pub fn id(&self) -> Option<ActorId> {
        self.id.get()
    }

    /// Whether the actor takes part in dispatch
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Enable or disable the actor
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Whether destruction has been requested
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// False once the actor has been marked to survive scene loads
    pub fn destroy_on_load(&self) -> bool {
        self.destroy_on_load.get()
    }

    pub(crate) fn keep_across_loads(&self) {
        self.destroy_on_load.set(false);
    }

    /// Mark destroyed and disabled; false if it already was
    pub(crate) fn mark_destroyed(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        self.enabled.set(false);
        true
    }

    /// Assign an id from `sequences` unless one is already set
    pub(crate) fn activate(&self, sequences: &Sequences) -> ActorId {
        if let Some(id) = self.id.get() {
            return id;
        }
        let id = sequences.next_actor_id();
        self.id.set(Some(id));
        trace!("Activated actor '{}' as {}", self.name.borrow(), id);
        id
    }

    /// Create a component of `type_name` under a fresh key
    ///
    /// The component is buffered and receives no hook this frame. Its `actor`
    /// field already points here.
    pub fn add_component(&self, runtime: &Runtime, type_name: &str) -> Result<ComponentRef, ResourceError> {
        let body = runtime.components.create_body(type_name)?;
        let key = runtime.sequences().next_component_key();
        Ok(self.insert_pending(Component::new(type_name, key, body)))
    }

    /// Buffer an already built component under its own key
    pub fn insert_pending(&self, mut component: Component) -> ComponentRef {
        component.attach(self.this.clone());
        let key = component.key().to_string();
        let handle = Rc::new(RefCell::new(component));
        self.pending.borrow_mut().insert(key, Rc::clone(&handle));
        handle
    }

    /// Disable `component` now and schedule it for removal
    pub fn remove_component(&self, component: &ComponentRef) {
        let key = {
            let mut component = component.borrow_mut();
            component.set_enabled(false);
            component.key().to_string()
        };
        self.pending_removal.borrow_mut().push(key);
    }

    /// Schedule every live component for removal
    pub(crate) fn remove_all_components(&self) {
        let keys: Vec<String> = self.components.borrow().keys().cloned().collect();
        self.pending_removal.borrow_mut().extend(keys);
    }

    /// Merge pending components whose key is not live yet
    ///
    /// Hook membership is decided here, once per component. Safe to call while
    /// a dispatch pass on this actor is running: merged keys are queued behind
    /// the pass.
    pub fn init_new_components(&self) {
        let pending: Vec<(String, ComponentRef)> = self
            .pending
            .borrow()
            .iter()
            .map(|(key, component)| (key.clone(), Rc::clone(component)))
            .collect();

        for (key, component) in pending {
            if self.components.borrow().contains_key(&key) {
                continue;
            }
            let hooks = component.borrow().hooks();
            self.components.borrow_mut().insert(key.clone(), component);
            self.hooks.borrow_mut().enroll(&key, hooks);
        }
    }

    /// Start every enabled pending component
    pub fn process_added_components(&self, runtime: &Runtime) {
        if !self.enabled.get() {
            return;
        }

        let pending: Vec<(String, ComponentRef)> = self
            .pending
            .borrow()
            .iter()
            .map(|(key, component)| (key.clone(), Rc::clone(component)))
            .collect();

        for (key, component) in pending {
            if !component.borrow().is_enabled() {
                continue;
            }
            self.pending.borrow_mut().remove(&key);
            component.borrow_mut().mark_started();
            self.invoke(runtime, &component, Hook::Start, None);
        }
    }

    /// Run `OnUpdate` for this frame
    pub fn update(&self, runtime: &Runtime) {
        self.run_queue(runtime, Hook::Update);
    }

    /// Run `OnLateUpdate` for this frame
    pub fn late_update(&self, runtime: &Runtime) {
        self.run_queue(runtime, Hook::LateUpdate);
    }

    /// Run `OnCollisionEnter`
    pub fn collision_enter(&self, runtime: &Runtime, collision: &Collision) {
        self.run_ordered(runtime, Hook::CollisionEnter, collision);
    }

    /// Run `OnCollisionExit`
    pub fn collision_exit(&self, runtime: &Runtime, collision: &Collision) {
        self.run_ordered(runtime, Hook::CollisionExit, collision);
    }

    /// Run `OnTriggerEnter`
    pub fn trigger_enter(&self, runtime: &Runtime, collision: &Collision) {
        self.run_ordered(runtime, Hook::TriggerEnter, collision);
    }

    /// Run `OnTriggerExit`
    pub fn trigger_exit(&self, runtime: &Runtime, collision: &Collision) {
        self.run_ordered(runtime, Hook::TriggerExit, collision);
    }

    /// Fire destroy hooks for scheduled removals and erase them
    pub fn process_removed_components(&self, runtime: &Runtime) {
        loop {
            let keys = std::mem::take(&mut *self.pending_removal.borrow_mut());
            if keys.is_empty() {
                break;
            }

            for key in keys {
                let has_destroy = self.hooks.borrow_mut().take_destroy(&key);
                if has_destroy {
                    if let Some(component) = self.live_component(&key) {
                        self.invoke(runtime, &component, Hook::Destroy, None);
                    }
                }
                self.components.borrow_mut().remove(&key);
                self.pending.borrow_mut().remove(&key);
                self.hooks.borrow_mut().forget(&key);
            }
        }
    }

    /// First enabled component of `type_name`, in key order
    ///
    /// A component that is currently borrowed, such as a native component
    /// inside its own hook, is not visible here.
    pub fn get_component(&self, type_name: &str) -> Option<ComponentRef> {
        self.components
            .borrow()
            .values()
            .find(|component| Self::is_visible(component, Some(type_name)))
            .cloned()
    }

    /// Every enabled component of `type_name`, in key order
    ///
    /// A component that is currently borrowed, such as a native component
    /// inside its own hook, is not visible here.
    pub fn get_components(&self, type_name: &str) -> Vec<ComponentRef> {
        self.components
            .borrow()
            .values()
            .filter(|component| Self::is_visible(component, Some(type_name)))
            .cloned()
            .collect()
    }

    /// The enabled component at `key`
    ///
    /// A component that is currently borrowed, such as a native component
    /// inside its own hook, is not visible here.
    pub fn get_component_by_key(&self, key: &str) -> Option<ComponentRef> {
        self.components
            .borrow()
            .get(key)
            .filter(|component| Self::is_visible(component, None))
            .cloned()
    }

    /// Number of live components, enabled or not
    pub fn component_count(&self) -> usize {
        self.components.borrow().len()
    }

    /// Keys of live components, ascending
    pub fn component_keys(&self) -> Vec<String> {
        self.components.borrow().keys().cloned().collect()
    }

    /// Component at `key` still waiting for `OnStart`, enabled or not
    pub fn pending_component(&self, key: &str) -> Option<ComponentRef> {
        self.pending.borrow().get(key).cloned()
    }

    /// Number of components still waiting for `OnStart`
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Hook membership, for inspection
    pub fn hook_queues(&self) -> std::cell::Ref<'_, HookQueues> {
        self.hooks.borrow()
    }

    // A component busy in its own native hook is skipped rather than re-borrowed
    fn is_visible(component: &ComponentRef, type_name: Option<&str>) -> bool {
        component.try_borrow().is_ok_and(|component| {
            component.is_enabled() && type_name.map_or(true, |name| component.type_name() == name)
        })
    }

    fn live_component(&self, key: &str) -> Option<ComponentRef> {
        self.components.borrow().get(key).cloned()
    }

    fn run_queue(&self, runtime: &Runtime, hook: Hook) {
        let passes = self.hooks.borrow().queue_len(hook);
        for _ in 0..passes {
            if !self.enabled.get() {
                return;
            }
            let Some(key) = self.hooks.borrow_mut().rotate(hook) else {
                return;
            };
            self.dispatch_to(runtime, &key, hook, None);
        }
    }

    fn run_ordered(&self, runtime: &Runtime, hook: Hook, collision: &Collision) {
        let keys = self.hooks.borrow().snapshot(hook);
        for key in keys {
            if !self.enabled.get() {
                return;
            }
            self.dispatch_to(runtime, &key, hook, Some(collision));
        }
    }

    fn dispatch_to(&self, runtime: &Runtime, key: &str, hook: Hook, collision: Option<&Collision>) {
        let Some(component) = self.live_component(key) else {
            return;
        };
        let ready = component.try_borrow().is_ok_and(|component| component.is_dispatchable());
        if ready {
            self.invoke(runtime, &component, hook, collision);
        }
    }

    fn invoke(&self, runtime: &Runtime, component: &ComponentRef, hook: Hook, collision: Option<&Collision>) {
        let Some(actor) = self.this.upgrade() else {
            return;
        };
        let ctx = HookContext::new(runtime, &actor, component).with_collision(collision);
        if let Err(err) = Component::invoke(component, hook, &ctx) {
            runtime.report_fault(&self.name(), err);
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &*self.name.borrow())
            .field("id", &self.id.get())
            .field("enabled", &self.enabled.get())
            .field("destroyed", &self.destroyed.get())
            .field("components", &self.components.borrow().len())
            .finish()
    }
}
