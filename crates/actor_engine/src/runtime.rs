//! Runtime: the state shared by every hook invocation
//!
//! A [`Runtime`] bundles the registries, the scene manager, the physics world,
//! the event bus and the sequence generators. Hooks receive it through a
//! [`HookContext`], together with the actor and component they run for.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use log::{error, warn};

use crate::actor::{ActorRef, TemplateRegistry};
use crate::component::{ComponentRef, ComponentRegistry};
use crate::config::GameConfig;
use crate::events::{EventBus, Subscription};
use crate::foundation::math::Vec2;
use crate::foundation::sequence::Sequences;
use crate::physics::{ActorResolver, Collision, HitResult, PhysicsWorld, RaycastHit};
use crate::resources::ResourceError;
use crate::scene::{Scene, SceneManager};
use crate::script::{ScriptError, ScriptFn, Value};

/// Shared simulation state
pub struct Runtime {
    /// Component type registry
    pub components: ComponentRegistry,
    /// Actor templates
    pub templates: TemplateRegistry,
    /// Scene catalog and current scene
    pub scenes: SceneManager,
    physics: RefCell<PhysicsWorld>,
    events: EventBus,
    sequences: Sequences,
    quit: Cell<bool>,
    fault: RefCell<Option<ResourceError>>,
}

impl Runtime {
    /// Create a runtime from its parts
    pub fn new(
        config: &GameConfig,
        components: ComponentRegistry,
        templates: TemplateRegistry,
        scenes: SceneManager,
    ) -> Self {
        Self {
            components,
            templates,
            scenes,
            physics: RefCell::new(PhysicsWorld::new(&config.physics)),
            events: EventBus::new(),
            sequences: Sequences::new(),
            quit: Cell::new(false),
            fault: RefCell::new(None),
        }
    }

    /// Actor id and component key generators
    pub fn sequences(&self) -> &Sequences {
        &self.sequences
    }

    /// Read access to the physics world
    pub fn physics(&self) -> Ref<'_, PhysicsWorld> {
        self.physics.borrow()
    }

    /// Write access to the physics world
    ///
    /// Keep the guard short; hooks must not hold it while calling into actors.
    pub fn physics_mut(&self) -> RefMut<'_, PhysicsWorld> {
        self.physics.borrow_mut()
    }

    /// Event bus
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Deliver `event` to every subscriber of `event_type` now
    pub fn publish(&self, event_type: &str, event: &Value) {
        self.events.publish(self, event_type, event);
    }

    /// The current scene
    pub fn current_scene(&self) -> Rc<Scene> {
        self.scenes.current()
    }

    /// Queue a new actor from the named template in the current scene
    pub fn instantiate(&self, template_name: &str) -> Result<ActorRef, ResourceError> {
        self.current_scene().add_new_actor(&self.templates, template_name)
    }

    /// Request destruction of `actor` in the current scene
    pub fn destroy(&self, actor: &ActorRef) {
        self.current_scene().destroy(actor);
    }

    /// Nearest raycast hit owned by a live actor
    pub fn raycast(&self, pos: Vec2, dir: Vec2, dist: f32) -> Option<HitResult> {
        self.raycast_all(pos, dir, dist).into_iter().next()
    }

    /// Every raycast hit owned by a live actor, nearest first
    pub fn raycast_all(&self, pos: Vec2, dir: Vec2, dist: f32) -> Vec<HitResult> {
        let hits = self.physics.borrow().raycast_all(pos, dir, dist);
        let scene = self.current_scene();
        hits.into_iter().filter_map(|hit| resolve_hit(&*scene, hit)).collect()
    }

    /// Record a hook fault
    ///
    /// Ordinary faults are logged against the actor and dropped. A resource
    /// fault is kept for the frame loop, which stops on it.
    pub fn report_fault(&self, actor_name: &str, err: ScriptError) {
        match err {
            ScriptError::Resource(resource) => {
                error!("{actor_name} : {resource}");
                let mut fault = self.fault.borrow_mut();
                if fault.is_none() {
                    *fault = Some(resource);
                }
            }
            other => error!("{actor_name} : {other}"),
        }
    }

    /// Take the recorded fatal fault, if any
    pub fn take_fault(&self) -> Option<ResourceError> {
        self.fault.borrow_mut().take()
    }

    /// Ask the frame loop to stop after this frame
    pub fn request_quit(&self) {
        self.quit.set(true);
    }

    /// True once a quit was requested
    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        let config = GameConfig::default();
        let scenes = SceneManager::new(config.camera.clone());
        Self::new(&config, ComponentRegistry::with_builtins(), TemplateRegistry::new(), scenes)
    }
}

fn resolve_hit(resolver: &dyn ActorResolver, hit: RaycastHit) -> Option<HitResult> {
    let actor = resolver.resolve_actor(hit.actor)?;
    Some(HitResult {
        actor,
        point: hit.point,
        normal: hit.normal,
        is_trigger: hit.is_sensor,
    })
}

/// Everything a hook can see while it runs
pub struct HookContext<'a> {
    /// Shared simulation state
    pub runtime: &'a Runtime,
    /// Actor owning the component
    pub actor: &'a ActorRef,
    /// Component whose hook is running
    pub component: &'a ComponentRef,
    /// Contact record for collision and trigger hooks
    pub collision: Option<&'a Collision>,
    /// Payload for event bus callbacks
    pub event: Option<&'a Value>,
}

impl<'a> HookContext<'a> {
    /// Context for a plain lifecycle hook
    pub fn new(runtime: &'a Runtime, actor: &'a ActorRef, component: &'a ComponentRef) -> Self {
        Self {
            runtime,
            actor,
            component,
            collision: None,
            event: None,
        }
    }

    /// Attach a contact record
    pub fn with_collision(mut self, collision: Option<&'a Collision>) -> Self {
        self.collision = collision;
        self
    }

    /// Attach an event payload
    pub fn with_event(mut self, event: Option<&'a Value>) -> Self {
        self.event = event;
        self
    }

    /// Read a field of the running component
    ///
    /// Native hooks already hold their component; inside them this returns
    /// `None` and the hook should read its own fields instead.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.component.try_borrow().ok().and_then(|component| component.get(name))
    }

    /// Read a numeric field, falling back to `default`
    pub fn get_f64(&self, name: &str, default: f64) -> f64 {
        self.get(name).and_then(|value| value.as_float()).unwrap_or(default)
    }

    /// Write a field of the running component
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), ScriptError> {
        let mut component = self
            .component
            .try_borrow_mut()
            .map_err(|_| ScriptError::runtime(format!("component busy while setting '{name}'")))?;
        component.set(name, value.into())
    }

    /// The current scene
    pub fn scene(&self) -> Rc<Scene> {
        self.runtime.current_scene()
    }

    /// Add a component of `type_name` to this hook's actor
    pub fn add_component(&self, type_name: &str) -> Result<ComponentRef, ScriptError> {
        Ok(self.actor.add_component(self.runtime, type_name)?)
    }

    /// Schedule `component` of this hook's actor for removal
    pub fn remove_component(&self, component: &ComponentRef) {
        self.actor.remove_component(component);
    }

    /// Queue a new actor from the named template
    pub fn instantiate(&self, template_name: &str) -> Result<ActorRef, ScriptError> {
        Ok(self.runtime.instantiate(template_name)?)
    }

    /// Request destruction of `actor`
    pub fn destroy(&self, actor: &ActorRef) {
        self.runtime.destroy(actor);
    }

    /// First enabled actor named `name`
    pub fn find_actor(&self, name: &str) -> Option<ActorRef> {
        self.scene().find_actor(name)
    }

    /// Request a scene change at the end of the frame
    pub fn change_scene(&self, name: &str) {
        self.runtime.scenes.change_scene(name);
    }

    /// Keep `actor` alive across scene loads
    pub fn dont_destroy(&self, actor: &ActorRef) {
        self.runtime.scenes.dont_destroy(actor);
    }

    /// Subscribe this component's `callback` to `event_type`
    pub fn subscribe(&self, event_type: &str, callback: ScriptFn) {
        self.runtime
            .events()
            .subscribe(event_type, Subscription::new(self.component, callback));
    }

    /// Unsubscribe this component's `callback` from `event_type`
    pub fn unsubscribe(&self, event_type: &str, callback: ScriptFn) {
        self.runtime
            .events()
            .unsubscribe(event_type, Subscription::new(self.component, callback));
    }

    /// Publish an event to its subscribers now
    pub fn publish(&self, event_type: &str, event: &Value) {
        self.runtime.publish(event_type, event);
    }

    /// Ask the frame loop to stop
    pub fn quit(&self) {
        warn!("Quit requested by '{}'", self.actor.name());
        self.runtime.request_quit();
    }
}
