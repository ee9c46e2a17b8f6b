//! Scenario tests spanning actors, scenes, events and physics
//!
//! Each scenario drives full frames through [`Engine`] or the scene pipeline
//! and checks the hook sequence recorded by the components involved.

mod contacts;
mod lifecycle;

use std::cell::RefCell;
use std::rc::Rc;

use crate::actor::{ActorTemplate, ComponentTemplate, TemplateRegistry};
use crate::component::{ComponentRegistry, Hook};
use crate::config::GameConfig;
use crate::scene::SceneBlueprint;
use crate::script::ScriptObject;
use crate::Engine;

/// Shared record of hook calls
pub(crate) type Journal = Rc<RefCell<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn count(journal: &Journal, entry: &str) -> usize {
    journal.borrow().iter().filter(|e| e.as_str() == entry).count()
}

/// Prototype that appends `"<label>:<hook>"` for every hook it receives
pub(crate) fn recorder(journal: &Journal, label: &str) -> ScriptObject {
    Hook::ALL.iter().fold(ScriptObject::new(), |object, hook| {
        let journal = Rc::clone(journal);
        let entry = format!("{label}:{}", hook.name());
        object.with_fn(hook.name(), move |_ctx| {
            journal.borrow_mut().push(entry.clone());
            Ok(())
        })
    })
}

/// Template with one component of each listed (key, type) pair
pub(crate) fn template(components: &ComponentRegistry, name: &str, parts: &[(&str, &str)]) -> ActorTemplate {
    parts.iter().fold(ActorTemplate::new(name), |template, (key, type_name)| {
        let component = ComponentTemplate::from_registry(components, type_name)
            .unwrap_or_else(|err| panic!("bad test component {type_name}: {err}"));
        template.with_component(*key, component)
    })
}

/// Engine starting in the first of `scenes`
pub(crate) fn engine(components: ComponentRegistry, templates: TemplateRegistry, scenes: Vec<SceneBlueprint>) -> Engine {
    let initial = scenes.first().map(|scene| scene.name().to_string()).unwrap_or_default();
    Engine::new(GameConfig::new(initial), components, templates, scenes).unwrap()
}
