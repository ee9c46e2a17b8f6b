//! Scene manager: blueprint catalog, current scene and scene swaps

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::info;

use super::{Camera, Scene, SceneBlueprint};
use crate::actor::ActorRef;
use crate::config::CameraConfig;
use crate::resources::ResourceError;
use crate::runtime::Runtime;

/// Owns the scene catalog and the single current scene
///
/// [`SceneManager::change_scene`] only records the request; the frame loop
/// performs the swap with [`SceneManager::load_new_scene`] after physics.
pub struct SceneManager {
    blueprints: HashMap<String, SceneBlueprint>,
    camera: CameraConfig,
    current: RefCell<Rc<Scene>>,
    next_scene: RefCell<Option<String>>,
}

impl SceneManager {
    /// Create a manager with no scenes; the current scene is empty
    pub fn new(camera: CameraConfig) -> Self {
        let current = Scene::new("", Camera::from_config(&camera));
        Self {
            blueprints: HashMap::new(),
            camera,
            current: RefCell::new(Rc::new(current)),
            next_scene: RefCell::new(None),
        }
    }

    /// Create a manager with a catalog
    pub fn with_blueprints(camera: CameraConfig, blueprints: impl IntoIterator<Item = SceneBlueprint>) -> Self {
        let mut manager = Self::new(camera);
        for blueprint in blueprints {
            manager.add_blueprint(blueprint);
        }
        manager
    }

    /// Register (or replace) a blueprint under its name
    pub fn add_blueprint(&mut self, blueprint: SceneBlueprint) {
        self.blueprints.insert(blueprint.name().to_string(), blueprint);
    }

    /// True if a blueprint named `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.blueprints.contains_key(name)
    }

    /// Blueprint lookup; a missing scene is a content error
    pub fn blueprint(&self, name: &str) -> Result<&SceneBlueprint, ResourceError> {
        self.blueprints
            .get(name)
            .ok_or_else(|| ResourceError::MissingScene(name.to_string()))
    }

    /// The current scene
    pub fn current(&self) -> Rc<Scene> {
        Rc::clone(&self.current.borrow())
    }

    /// Name of the current scene
    pub fn current_scene_name(&self) -> String {
        self.current.borrow().name().to_string()
    }

    /// Install `name` as the first scene
    pub fn load_initial(&self, name: &str) -> Result<(), ResourceError> {
        let scene = self.fresh_scene(name)?;
        info!("Loading initial scene '{name}'");
        self.install(scene);
        Ok(())
    }

    /// Request a swap to `name` at the end of the frame
    pub fn change_scene(&self, name: impl Into<String>) {
        *self.next_scene.borrow_mut() = Some(name.into());
    }

    /// True if a swap has been requested and not yet performed
    pub fn has_pending_change(&self) -> bool {
        self.next_scene.borrow().is_some()
    }

    /// Perform a requested swap
    ///
    /// Every actor of the outgoing scene that does not survive loads is
    /// destroyed and its destroy hooks run before the new scene is built.
    /// Surviving actors move into the new scene with their identity intact.
    pub fn load_new_scene(&self, runtime: &Runtime) -> Result<(), ResourceError> {
        let Some(name) = self.next_scene.borrow_mut().take() else {
            return Ok(());
        };
        let incoming = self.fresh_scene(&name)?;

        let outgoing = self.current();
        outgoing.destroy_all();
        outgoing.process_removed_components(runtime);
        outgoing.flush_destroyed(runtime);

        incoming.set_immortal_actors(outgoing.take_immortal_actors());
        info!("Changing scene '{}' -> '{}'", outgoing.name(), name);
        self.install(incoming);
        Ok(())
    }

    /// Keep `actor` alive across scene loads
    pub fn dont_destroy(&self, actor: &ActorRef) {
        self.current().keep_across_loads(actor);
    }

    fn fresh_scene(&self, name: &str) -> Result<Scene, ResourceError> {
        let blueprint = self.blueprint(name)?;
        Ok(Scene::from_blueprint(blueprint, Camera::from_config(&self.camera)))
    }

    fn install(&self, scene: Scene) {
        let scene = Rc::new(scene);
        *self.current.borrow_mut() = Rc::clone(&scene);
        scene.init();
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
