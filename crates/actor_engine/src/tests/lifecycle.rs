//! Component lifecycle: keys, start timing, removal and fault isolation

use super::*;
use crate::actor::Actor;
use crate::resources::ResourceError;
use crate::runtime::Runtime;
use crate::script::{ScriptError, Value};
use crate::EngineError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_keys_share_one_sequence() {
        let runtime = Runtime::default();
        let first = Actor::new("First");
        let second = Actor::new("Second");

        let keys: Vec<String> = [&first, &second, &first, &second]
            .iter()
            .map(|actor| actor.add_component(&runtime, "Rigidbody").unwrap().borrow().key().to_string())
            .collect();

        assert_eq!(keys, vec!["r0", "r1", "r2", "r3"]);
        assert_eq!(first.pending_count(), 2);
        assert_eq!(second.pending_count(), 2);
    }

    #[test]
    fn test_added_component_waits_for_next_frame() {
        let log = journal();
        let mut components = ComponentRegistry::new();
        components.define_prototype("Child", recorder(&log, "child"));
        let spawner_log = Rc::clone(&log);
        components.define_prototype(
            "Spawner",
            ScriptObject::new()
                .with_field("spawned", false)
                .with_fn("OnUpdate", move |ctx| {
                    if ctx.get("spawned").and_then(|v| v.as_bool()) == Some(false) {
                        ctx.add_component("Child")?;
                        ctx.set("spawned", true)?;
                        spawner_log.borrow_mut().push("spawner:added".to_string());
                    }
                    Ok(())
                }),
        );
        let scene = SceneBlueprint::new("level").with_actor(template(&components, "Parent", &[("1", "Spawner")]));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);

        engine.run_frame().unwrap();
        assert_eq!(*log.borrow(), vec!["spawner:added"]);

        let parent = engine.runtime().current_scene().find_actor("Parent").unwrap();
        let child = parent.get_component("Child").unwrap();
        assert!(!child.borrow().is_started());

        engine.run_frame().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["spawner:added", "child:OnStart", "child:OnUpdate", "child:OnLateUpdate"]
        );
        assert!(child.borrow().is_started());
    }

    #[test]
    fn test_removed_component_is_invisible_before_erasure() {
        let log = journal();
        let mut components = ComponentRegistry::new();
        components.define_prototype("Tag", recorder(&log, "tag"));
        let scene = SceneBlueprint::new("level").with_actor(template(&components, "Tagged", &[("a", "Tag"), ("b", "Tag")]));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);
        engine.run_frame().unwrap();

        let actor = engine.runtime().current_scene().find_actor("Tagged").unwrap();
        let doomed = actor.get_component_by_key("a").unwrap();
        actor.remove_component(&doomed);

        assert!(actor.get_component_by_key("a").is_none());
        assert_eq!(actor.get_components("Tag").len(), 1);
        assert_eq!(actor.get_component("Tag").unwrap().borrow().key(), "b");
        assert_eq!(actor.component_count(), 2);

        engine.run_frame().unwrap();
        assert_eq!(actor.component_count(), 1);
        assert_eq!(count(&log, "tag:OnDestroy"), 1);
        assert!(actor.get_component_by_key("a").is_none());
    }

    #[test]
    fn test_get_component_prefers_lowest_key() {
        let runtime = Runtime::default();
        let actor = Actor::new("Sorted");
        let first = actor.add_component(&runtime, "Rigidbody").unwrap();
        actor.add_component(&runtime, "Rigidbody").unwrap();
        actor.init_new_components();

        let found = actor.get_component("Rigidbody").unwrap();
        assert!(Rc::ptr_eq(&found, &first));
        assert_eq!(actor.get_components("Rigidbody").len(), 2);
        assert!(actor.get_component("Missing").is_none());
        assert!(Actor::new("Empty").get_components("Rigidbody").is_empty());
    }

    #[test]
    fn test_start_fault_is_isolated() {
        let log = journal();
        let mut components = ComponentRegistry::new();
        components.define_prototype(
            "Broken",
            ScriptObject::new().with_fn("OnStart", |_ctx| Err(ScriptError::runtime("attempt to index a nil value"))),
        );
        components.define_prototype("Tag", recorder(&log, "tag"));
        let scene = SceneBlueprint::new("level")
            .with_actor(template(&components, "Mixed", &[("1", "Broken"), ("2", "Tag")]))
            .with_actor(template(&components, "Other", &[("1", "Tag")]));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);

        engine.run_frame().unwrap();
        assert_eq!(count(&log, "tag:OnStart"), 2);
        assert_eq!(count(&log, "tag:OnUpdate"), 2);

        let mixed = engine.runtime().current_scene().find_actor("Mixed").unwrap();
        assert!(mixed.get_component_by_key("1").unwrap().borrow().is_started());
    }

    #[test]
    fn test_update_fault_does_not_skip_siblings() {
        let log = journal();
        let mut components = ComponentRegistry::new();
        components.define_prototype(
            "Flaky",
            ScriptObject::new().with_fn("OnUpdate", |_ctx| Err(ScriptError::runtime("boom"))),
        );
        components.define_prototype("Tag", recorder(&log, "tag"));
        let scene = SceneBlueprint::new("level").with_actor(template(&components, "A", &[("1", "Flaky"), ("2", "Tag")]));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);

        engine.run_frame().unwrap();
        engine.run_frame().unwrap();
        assert_eq!(count(&log, "tag:OnUpdate"), 2);
    }

    #[test]
    fn test_disabling_actor_halts_its_pass() {
        let log = journal();
        let mut components = ComponentRegistry::new();
        components.define_prototype(
            "Switch",
            ScriptObject::new().with_fn("OnUpdate", |ctx| {
                ctx.actor.set_enabled(false);
                Ok(())
            }),
        );
        components.define_prototype("Tag", recorder(&log, "tag"));
        let scene = SceneBlueprint::new("level").with_actor(template(&components, "A", &[("1", "Switch"), ("2", "Tag")]));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);

        engine.run_frame().unwrap();
        assert_eq!(count(&log, "tag:OnStart"), 1);
        assert_eq!(count(&log, "tag:OnUpdate"), 0);
        assert_eq!(count(&log, "tag:OnLateUpdate"), 0);
    }

    #[test]
    fn test_disabled_pending_component_starts_once_enabled() {
        let log = journal();
        let mut components = ComponentRegistry::new();
        components.define_prototype("Tag", recorder(&log, "tag"));
        let mut tag = ComponentTemplate::from_registry(&components, "Tag").unwrap();
        tag.set_field("enabled", Value::Bool(false)).unwrap();
        let scene = SceneBlueprint::new("level").with_actor(ActorTemplate::new("Sleeper").with_component("1", tag));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);

        engine.run_frame().unwrap();
        assert!(log.borrow().is_empty());

        let sleeper = engine.runtime().current_scene().find_actor("Sleeper").unwrap();
        assert_eq!(sleeper.pending_count(), 1);
        assert!(sleeper.get_component("Tag").is_none());
        assert_eq!(sleeper.component_keys(), vec!["1"]);

        engine.run_frame().unwrap();
        assert!(log.borrow().is_empty());

        sleeper.pending_component("1").unwrap().borrow_mut().set_enabled(true);
        engine.run_frame().unwrap();
        assert_eq!(*log.borrow(), vec!["tag:OnStart", "tag:OnUpdate", "tag:OnLateUpdate"]);
    }

    #[test]
    fn test_resource_fault_in_hook_stops_the_frame() {
        let mut components = ComponentRegistry::new();
        components.define_prototype(
            "Summoner",
            ScriptObject::new().with_fn("OnUpdate", |ctx| {
                ctx.instantiate("Nonexistent")?;
                Ok(())
            }),
        );
        let scene = SceneBlueprint::new("level").with_actor(template(&components, "A", &[("1", "Summoner")]));
        let mut engine = engine(components, TemplateRegistry::new(), vec![scene]);

        let err = engine.run_frame().unwrap_err();
        assert!(matches!(err, EngineError::Resource(ResourceError::MissingTemplate(ref name)) if name == "Nonexistent"));
        assert!(!engine.is_running());
    }

    #[test]
    fn test_unknown_component_type_is_resource_error() {
        let runtime = Runtime::default();
        let actor = Actor::new("A");
        let err = actor.add_component(&runtime, "Imaginary").unwrap_err();
        assert!(matches!(err, ResourceError::UnknownComponentType(_)));
        assert_eq!(actor.pending_count(), 0);
    }

    #[test]
    fn test_borrowed_component_is_skipped_by_lookups() {
        let runtime = Runtime::default();
        let actor = Actor::new("Twin");
        let first = actor.add_component(&runtime, "Rigidbody").unwrap();
        let second = actor.add_component(&runtime, "Rigidbody").unwrap();
        actor.init_new_components();
        let first_key = first.borrow().key().to_string();

        // A native hook holds its own component mutably while it runs
        let busy = first.borrow_mut();
        assert!(Rc::ptr_eq(&actor.get_component("Rigidbody").unwrap(), &second));
        assert_eq!(actor.get_components("Rigidbody").len(), 1);
        assert!(actor.get_component_by_key(&first_key).is_none());
        drop(busy);

        assert!(Rc::ptr_eq(&actor.get_component("Rigidbody").unwrap(), &first));
        assert!(actor.get_component_by_key(&first_key).is_some());
    }
}
