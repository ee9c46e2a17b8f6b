//! Scenes: the live actor set of one level
//!
//! A [`Scene`] owns its actors and runs the per-frame pipeline over them. New
//! and destroyed actors are buffered and only change the live set at the
//! start (activation) and end (destruction) of [`Scene::update_actors`].
//!
//! ```text
//! activate → start → update → late update (+ merge) → remove components → destroy
//! ```

mod camera;
mod manager;

pub use camera::Camera;
pub use manager::SceneManager;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::actor::{ActorRef, ActorTemplate, TemplateRegistry};
use crate::foundation::math::Vec2;
use crate::foundation::sequence::ActorId;
use crate::physics::ActorResolver;
use crate::resources::ResourceError;
use crate::runtime::Runtime;

/// Declarative content of a scene: the actors spawned on every load
#[derive(Clone, Default)]
pub struct SceneBlueprint {
    name: String,
    actors: Vec<ActorTemplate>,
}

impl SceneBlueprint {
    /// Create an empty blueprint
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actors: Vec::new(),
        }
    }

    /// Add a default actor (builder pattern)
    pub fn with_actor(mut self, actor: ActorTemplate) -> Self {
        self.push_actor(actor);
        self
    }

    /// Add a default actor
    pub fn push_actor(&mut self, actor: ActorTemplate) {
        self.actors.push(actor);
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default actors in declaration order
    pub fn actors(&self) -> &[ActorTemplate] {
        &self.actors
    }
}

/// One loaded level
pub struct Scene {
    name: String,
    camera: Cell<Camera>,
    actors: RefCell<BTreeMap<ActorId, ActorRef>>,
    actors_to_add: RefCell<Vec<ActorRef>>,
    actors_to_destroy: RefCell<Vec<ActorRef>>,
    immortal_actors: RefCell<Vec<ActorRef>>,
    default_actors: Vec<ActorTemplate>,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>, camera: Camera) -> Self {
        Self {
            name: name.into(),
            camera: Cell::new(camera),
            actors: RefCell::new(BTreeMap::new()),
            actors_to_add: RefCell::new(Vec::new()),
            actors_to_destroy: RefCell::new(Vec::new()),
            immortal_actors: RefCell::new(Vec::new()),
            default_actors: Vec::new(),
        }
    }

    /// Create a scene that spawns the blueprint's actors on [`Self::init`]
    pub fn from_blueprint(blueprint: &SceneBlueprint, camera: Camera) -> Self {
        Self {
            default_actors: blueprint.actors.clone(),
            ..Self::new(blueprint.name.clone(), camera)
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bring the scene up: immortal actors go live directly, default actors
    /// are queued for activation
    ///
    /// An immortal actor that was never activated is queued like a new one.
    pub fn init(&self) {
        let mut to_add = self.actors_to_add.borrow_mut();
        {
            let mut actors = self.actors.borrow_mut();
            for actor in self.immortal_actors.borrow().iter() {
                match actor.id() {
                    Some(id) => {
                        actors.insert(id, ActorRef::clone(actor));
                    }
                    None => to_add.push(ActorRef::clone(actor)),
                }
            }
        }

        for template in &self.default_actors {
            to_add.push(template.instantiate());
        }
        debug!(
            "Scene '{}' initialised with {} carried and {} new actors",
            self.name,
            self.immortal_actors.borrow().len(),
            to_add.len()
        );
    }

    /// Run one frame of the actor pipeline
    pub fn update_actors(&self, runtime: &Runtime) {
        // Activate
        let to_add = std::mem::take(&mut *self.actors_to_add.borrow_mut());
        for actor in to_add {
            let id = actor.activate(runtime.sequences());
            actor.init_new_components();
            self.actors.borrow_mut().insert(id, actor);
        }

        for actor in self.actors() {
            actor.process_added_components(runtime);
        }

        for actor in self.actors() {
            actor.update(runtime);
        }

        for actor in self.actors() {
            actor.late_update(runtime);
            actor.init_new_components();
        }

        for actor in self.actors() {
            actor.process_removed_components(runtime);
        }

        self.flush_destroyed(runtime);
    }

    /// Drop every actor whose destruction was requested
    ///
    /// Removals requested after the removal phase still get their destroy hooks.
    pub fn flush_destroyed(&self, runtime: &Runtime) {
        let to_destroy = std::mem::take(&mut *self.actors_to_destroy.borrow_mut());
        for actor in to_destroy {
            actor.process_removed_components(runtime);
            self.forget(&actor);
        }
    }

    /// Queue a new actor built from the named template
    pub fn add_new_actor(&self, templates: &TemplateRegistry, template_name: &str) -> Result<ActorRef, ResourceError> {
        let template = templates.get(template_name)?;
        Ok(self.instantiate(template))
    }

    /// Queue a new actor built from `template`
    ///
    /// Its components are visible immediately; `OnStart` waits for activation.
    pub fn instantiate(&self, template: &ActorTemplate) -> ActorRef {
        let actor = template.instantiate();
        actor.init_new_components();
        trace!("Queued actor '{}' in scene '{}'", actor.name(), self.name);
        self.actors_to_add.borrow_mut().push(ActorRef::clone(&actor));
        actor
    }

    /// Request destruction of `actor`
    ///
    /// The actor is disabled and every live component is scheduled for removal
    /// at once. A second call is a no-op.
    pub fn destroy(&self, actor: &ActorRef) {
        if !actor.mark_destroyed() {
            return;
        }
        actor.remove_all_components();
        self.actors_to_destroy.borrow_mut().push(ActorRef::clone(actor));
    }

    /// Destroy every live actor that does not survive scene loads
    pub fn destroy_all(&self) {
        for actor in self.actors() {
            if actor.destroy_on_load() {
                self.destroy(&actor);
            }
        }
    }

    /// Flush component removals on every live actor
    pub fn process_removed_components(&self, runtime: &Runtime) {
        for actor in self.actors() {
            actor.process_removed_components(runtime);
        }
    }

    /// Keep `actor` alive across scene loads
    pub fn keep_across_loads(&self, actor: &ActorRef) {
        actor.keep_across_loads();
        let mut immortal = self.immortal_actors.borrow_mut();
        if !immortal.iter().any(|kept| Rc::ptr_eq(kept, actor)) {
            immortal.push(ActorRef::clone(actor));
        }
    }

    /// Hand over the actors that survive a load
    pub fn take_immortal_actors(&self) -> Vec<ActorRef> {
        std::mem::take(&mut *self.immortal_actors.borrow_mut())
            .into_iter()
            .filter(|actor| !actor.is_destroyed())
            .collect()
    }

    /// Install actors carried over from the previous scene
    pub fn set_immortal_actors(&self, actors: Vec<ActorRef>) {
        *self.immortal_actors.borrow_mut() = actors;
    }

    /// First enabled actor named `name`, live actors first
    pub fn find_actor(&self, name: &str) -> Option<ActorRef> {
        self.candidates().into_iter().find(|actor| actor.name() == name)
    }

    /// Every enabled actor named `name`, live actors first
    pub fn find_all_actors(&self, name: &str) -> Vec<ActorRef> {
        self.candidates().into_iter().filter(|actor| actor.name() == name).collect()
    }

    /// Enabled actor with `id`
    pub fn find_actor_by_id(&self, id: ActorId) -> Option<ActorRef> {
        self.candidates().into_iter().find(|actor| actor.id() == Some(id))
    }

    /// Live actors in id order
    pub fn actors(&self) -> Vec<ActorRef> {
        self.actors.borrow().values().cloned().collect()
    }

    /// Number of live actors
    pub fn actor_count(&self) -> usize {
        self.actors.borrow().len()
    }

    /// Number of actors waiting for activation
    pub fn pending_actor_count(&self) -> usize {
        self.actors_to_add.borrow().len()
    }

    /// Number of actors that survive the next load
    pub fn immortal_count(&self) -> usize {
        self.immortal_actors.borrow().len()
    }

    /// Current camera state
    pub fn camera(&self) -> Camera {
        self.camera.get()
    }

    /// Replace the camera state
    pub fn set_camera(&self, camera: Camera) {
        self.camera.set(camera);
    }

    /// Move the camera target
    pub fn set_camera_position(&self, x: f32, y: f32) {
        let mut camera = self.camera.get();
        camera.position = Vec2::new(x, y);
        self.camera.set(camera);
    }

    /// Camera target
    pub fn camera_position(&self) -> Vec2 {
        self.camera.get().position
    }

    /// Change the camera zoom
    pub fn set_zoom(&self, zoom: f32) {
        let mut camera = self.camera.get();
        camera.zoom = zoom;
        self.camera.set(camera);
    }

    /// Camera zoom
    pub fn zoom(&self) -> f32 {
        self.camera.get().zoom
    }

    fn candidates(&self) -> Vec<ActorRef> {
        self.actors
            .borrow()
            .values()
            .chain(self.actors_to_add.borrow().iter())
            .filter(|actor| actor.is_enabled())
            .cloned()
            .collect()
    }

    fn forget(&self, actor: &ActorRef) {
        let live = actor
            .id()
            .and_then(|id| self.actors.borrow_mut().remove(&id));
        if live.is_none() {
            self.actors_to_add.borrow_mut().retain(|queued| !Rc::ptr_eq(queued, actor));
        }
        if !actor.destroy_on_load() {
            self.immortal_actors.borrow_mut().retain(|kept| !Rc::ptr_eq(kept, actor));
        }
        trace!("Destroyed actor '{}' in scene '{}'", actor.name(), self.name);
    }
}

impl ActorResolver for Scene {
    fn resolve_actor(&self, id: ActorId) -> Option<ActorRef> {
        self.actors.borrow().get(&id).cloned()
    }
}
