//! Physics contacts reaching actors through the contact bridge

use super::*;
use crate::actor::ActorRef;
use crate::component::Rigidbody;
use crate::foundation::math::{not_applicable, Vec2};
use crate::physics::{
    BodyDef, BodyType, CollisionFilter, ContactBridge, ContactEvent, ContactPhase, ContactSide, FixtureDef, Shape,
};
use crate::runtime::{HookContext, Runtime};
use crate::scene::{Camera, Scene};
use crate::script::{ScriptError, Value};

/// Prototype recording contact hooks with the other actor and contact point
fn contact_recorder(journal: &Journal, label: &str) -> ScriptObject {
    [Hook::CollisionEnter, Hook::CollisionExit, Hook::TriggerEnter, Hook::TriggerExit]
        .iter()
        .fold(ScriptObject::new(), |object, hook| {
            let journal = Rc::clone(journal);
            let prefix = format!("{label}:{}", hook.name());
            object.with_fn(hook.name(), move |ctx: &HookContext<'_>| -> Result<(), ScriptError> {
                let collision = ctx.collision.ok_or_else(|| ScriptError::runtime("missing collision"))?;
                let sentinel = collision.point == not_applicable() && collision.normal == not_applicable();
                journal.borrow_mut().push(format!(
                    "{prefix}:{}:{}",
                    collision.other.name(),
                    if sentinel { "na" } else { "point" }
                ));
                Ok(())
            })
        })
}

/// Scene with two live, started actors each carrying a contact recorder
fn live_pair(runtime: &Runtime, journal: &Journal) -> (Scene, ActorRef, ActorRef) {
    let mut components = ComponentRegistry::new();
    components.define_prototype("WatchA", contact_recorder(journal, "a"));
    components.define_prototype("WatchB", contact_recorder(journal, "b"));
    let blueprint = SceneBlueprint::new("arena")
        .with_actor(template(&components, "A", &[("1", "WatchA")]))
        .with_actor(template(&components, "B", &[("1", "WatchB")]));
    let scene = Scene::from_blueprint(&blueprint, Camera::default());
    scene.init();
    scene.update_actors(runtime);
    let a = scene.find_actor("A").unwrap();
    let b = scene.find_actor("B").unwrap();
    (scene, a, b)
}

fn side(actor: &ActorRef, is_sensor: bool, velocity: Vec2) -> ContactSide {
    ContactSide {
        actor: actor.id(),
        is_sensor,
        velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_against_solid_triggers_both_sides() {
        let log = journal();
        let runtime = Runtime::default();
        let (scene, a, b) = live_pair(&runtime, &log);

        {
            let mut world = runtime.physics_mut();
            let sensor = world.create_body(&BodyDef {
                body_type: BodyType::Dynamic,
                gravity_scale: 0.0,
                ..BodyDef::default()
            });
            world.create_fixture(sensor, &FixtureDef {
                is_sensor: true,
                filter: CollisionFilter::new(0x1, 0x1),
                user_data: a.id(),
                ..FixtureDef::new(Shape::rect(2.0, 2.0))
            });
            let wall = world.create_body(&BodyDef {
                position: Vec2::new(0.5, 0.0),
                ..BodyDef::default()
            });
            world.create_fixture(wall, &FixtureDef {
                filter: CollisionFilter::new(0x1, 0x1),
                user_data: b.id(),
                ..FixtureDef::new(Shape::rect(1.0, 1.0))
            });
        }

        let events = runtime.physics_mut().step();
        assert_eq!(events.len(), 1);
        ContactBridge::dispatch_all(&runtime, &scene, &events);

        assert_eq!(*log.borrow(), vec!["a:OnTriggerEnter:B:na", "b:OnTriggerEnter:A:na"]);
        assert!(runtime.physics_mut().step().is_empty());
    }

    #[test]
    fn test_solid_contact_carries_geometry_and_end_sentinel() {
        let log = journal();
        let runtime = Runtime::default();
        let (scene, a, b) = live_pair(&runtime, &log);

        let begin = ContactEvent {
            phase: ContactPhase::Begin,
            a: side(&a, false, Vec2::new(0.0, 3.0)),
            b: side(&b, false, Vec2::new(0.0, -1.0)),
            manifold: Some(crate::physics::Manifold {
                point: Vec2::new(0.0, 0.5),
                normal: Vec2::new(0.0, 1.0),
                depth: 0.1,
            }),
        };
        let end = ContactEvent {
            phase: ContactPhase::End,
            manifold: None,
            ..begin
        };

        assert!(ContactBridge::dispatch(&runtime, &scene, &begin));
        assert!(ContactBridge::dispatch(&runtime, &scene, &end));
        assert_eq!(
            *log.borrow(),
            vec![
                "a:OnCollisionEnter:B:point",
                "b:OnCollisionEnter:A:point",
                "a:OnCollisionExit:B:na",
                "b:OnCollisionExit:A:na",
            ]
        );
    }

    #[test]
    fn test_relative_velocity_is_a_minus_b() {
        let runtime = Runtime::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut components = ComponentRegistry::new();
        components.define_prototype(
            "Meter",
            ScriptObject::new().with_fn("OnCollisionEnter", move |ctx| {
                if let Some(collision) = ctx.collision {
                    sink.borrow_mut().push(collision.relative_velocity);
                }
                Ok(())
            }),
        );
        let blueprint = SceneBlueprint::new("arena")
            .with_actor(template(&components, "A", &[("1", "Meter")]))
            .with_actor(template(&components, "B", &[("1", "Meter")]));
        let scene = Scene::from_blueprint(&blueprint, Camera::default());
        scene.init();
        scene.update_actors(&runtime);
        let a = scene.find_actor("A").unwrap();
        let b = scene.find_actor("B").unwrap();

        let event = ContactEvent {
            phase: ContactPhase::Begin,
            a: side(&a, false, Vec2::new(2.0, 0.0)),
            b: side(&b, false, Vec2::new(-1.0, 1.0)),
            manifold: None,
        };
        ContactBridge::dispatch(&runtime, &scene, &event);

        assert_eq!(*seen.borrow(), vec![Vec2::new(3.0, -1.0), Vec2::new(3.0, -1.0)]);
    }

    #[test]
    fn test_stale_or_missing_owner_is_ignored() {
        let log = journal();
        let runtime = Runtime::default();
        let (scene, a, b) = live_pair(&runtime, &log);

        let orphan = ContactEvent {
            phase: ContactPhase::Begin,
            a: side(&a, true, Vec2::zeros()),
            b: ContactSide {
                actor: None,
                is_sensor: false,
                velocity: Vec2::zeros(),
            },
            manifold: None,
        };
        assert!(!ContactBridge::dispatch(&runtime, &scene, &orphan));

        scene.destroy(&b);
        scene.update_actors(&runtime);
        let stale = ContactEvent {
            b: side(&b, false, Vec2::zeros()),
            ..orphan
        };
        assert!(!ContactBridge::dispatch(&runtime, &scene, &stale));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_disabled_watcher_misses_contacts() {
        let log = journal();
        let runtime = Runtime::default();
        let (scene, a, b) = live_pair(&runtime, &log);
        a.get_component("WatchA").unwrap().borrow_mut().set("enabled", Value::Bool(false)).unwrap();

        let event = ContactEvent {
            phase: ContactPhase::Begin,
            a: side(&a, true, Vec2::zeros()),
            b: side(&b, false, Vec2::zeros()),
            manifold: None,
        };
        ContactBridge::dispatch(&runtime, &scene, &event);
        assert_eq!(*log.borrow(), vec!["b:OnTriggerEnter:A:na"]);
    }

    #[test]
    fn test_rigidbodies_collide_through_frames() {
        let log = journal();
        let mut components = ComponentRegistry::with_builtins();
        components.define_prototype("WatchA", contact_recorder(&log, "a"));
        components.define_prototype("WatchB", contact_recorder(&log, "b"));

        let mut falling = crate::actor::ComponentTemplate::from_registry(&components, Rigidbody::TYPE_NAME).unwrap();
        falling.apply_override("has_trigger", Value::Bool(false)).unwrap();
        let mut floor = crate::actor::ComponentTemplate::from_registry(&components, Rigidbody::TYPE_NAME).unwrap();
        floor.apply_override("body_type", Value::from("static")).unwrap();
        floor.apply_override("has_trigger", Value::Bool(false)).unwrap();
        floor.apply_override("y", Value::Float(0.9)).unwrap();
        floor.apply_override("width", Value::Int(10)).unwrap();

        let blueprint = SceneBlueprint::new("arena")
            .with_actor(
                ActorTemplate::new("A")
                    .with_component("body", falling)
                    .with_component("watch", ComponentTemplate::from_registry(&components, "WatchA").unwrap()),
            )
            .with_actor(
                ActorTemplate::new("B")
                    .with_component("body", floor)
                    .with_component("watch", ComponentTemplate::from_registry(&components, "WatchB").unwrap()),
            );
        let mut engine = engine(components, TemplateRegistry::new(), vec![blueprint]);

        engine.run_frame().unwrap();
        assert_eq!(engine.runtime().physics().body_count(), 2);
        assert_eq!(*log.borrow(), vec!["a:OnCollisionEnter:B:point", "b:OnCollisionEnter:A:point"]);

        engine.run_frame().unwrap();
        assert_eq!(log.borrow().len(), 2);

        let scene = engine.runtime().current_scene();
        let a = scene.find_actor("A").unwrap();
        scene.destroy(&a);
        engine.run_frame().unwrap();
        // The end event names an actor that is already gone
        assert_eq!(engine.runtime().physics().body_count(), 1);
        assert_eq!(log.borrow().len(), 2);
    }
}
