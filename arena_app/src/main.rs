//! Arena demo application
//!
//! Runs a headless arena: a spawner drops crates onto a floor, crates report
//! their impacts on the event bus, a persistent scoreboard counts them and a
//! director switches scenes after a while.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use actor_engine::foundation::logging;
use actor_engine::prelude::*;
use log::{error, info};

const DEFAULT_RESOURCES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/resources");

/// Counts down `frames` and destroys its actor at zero
fn lifetime() -> ScriptObject {
    ScriptObject::new()
        .with_field("frames", 120_i64)
        .with_fn("OnUpdate", |ctx| {
            let left = ctx.get("frames").and_then(|v| v.as_int()).unwrap_or(0) - 1;
            ctx.set("frames", left)?;
            if left <= 0 {
                ctx.destroy(ctx.actor);
            }
            Ok(())
        })
}

/// Instantiates `template` every `interval` frames
fn spawner() -> ScriptObject {
    ScriptObject::new()
        .with_field("template", "Crate")
        .with_field("interval", 30_i64)
        .with_field("timer", 0_i64)
        .with_fn("OnUpdate", |ctx| {
            let timer = ctx.get("timer").and_then(|v| v.as_int()).unwrap_or(0) + 1;
            let interval = ctx.get("interval").and_then(|v| v.as_int()).unwrap_or(1).max(1);
            if timer >= interval {
                let template = ctx
                    .get("template")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| ScriptError::runtime("spawner has no template"))?;
                ctx.instantiate(&template)?;
                ctx.set("timer", 0_i64)
            } else {
                ctx.set("timer", timer)
            }
        })
}

/// Publishes an `impact` event for every solid contact
fn announcer() -> ScriptObject {
    ScriptObject::new()
        .with_fn("OnCollisionEnter", |ctx| {
            if let Some(collision) = ctx.collision {
                ctx.publish("impact", &Value::actor(&collision.other));
            }
            Ok(())
        })
        .with_fn("OnTriggerEnter", |ctx| {
            if let Some(collision) = ctx.collision {
                info!("{} sensed {}", ctx.actor.name(), collision.other.name());
            }
            Ok(())
        })
}

/// Survives scene changes and counts `impact` events
fn scoreboard() -> ScriptObject {
    let on_impact: ScriptFn = Rc::new(|ctx: &HookContext<'_>| -> Result<(), ScriptError> {
        let impacts = ctx.get("impacts").and_then(|v| v.as_int()).unwrap_or(0) + 1;
        ctx.set("impacts", impacts)
    });
    let subscribe = Rc::clone(&on_impact);
    ScriptObject::new()
        .with_field("impacts", 0_i64)
        .with_field("reported", 0_i64)
        .with_fn("OnStart", move |ctx| {
            ctx.dont_destroy(ctx.actor);
            ctx.subscribe("impact", Rc::clone(&subscribe));
            Ok(())
        })
        .with_fn("OnDestroy", move |ctx| {
            ctx.unsubscribe("impact", Rc::clone(&on_impact));
            Ok(())
        })
        .with_fn("OnLateUpdate", |ctx| {
            if ctx.get("reported").and_then(|v| v.as_int()) != ctx.get("impacts").and_then(|v| v.as_int()) {
                let impacts = ctx.get("impacts").and_then(|v| v.as_int()).unwrap_or(0);
                info!("Impacts so far: {impacts}");
                ctx.set("reported", impacts)?;
            }
            Ok(())
        })
}

/// Loads `next_scene` after `frames` frames, or quits when it is empty
fn director() -> ScriptObject {
    ScriptObject::new()
        .with_field("frames", 300_i64)
        .with_field("next_scene", "")
        .with_fn("OnUpdate", |ctx| {
            let left = ctx.get("frames").and_then(|v| v.as_int()).unwrap_or(0) - 1;
            ctx.set("frames", left)?;
            if left != 0 {
                return Ok(());
            }
            match ctx.get("next_scene").and_then(|v| v.as_str().map(str::to_string)) {
                Some(scene) if !scene.is_empty() => ctx.change_scene(&scene),
                _ => ctx.quit(),
            }
            Ok(())
        })
}

fn components() -> ComponentRegistry {
    let mut components = ComponentRegistry::with_builtins();
    components.define_prototype("Lifetime", lifetime());
    components.define_prototype("Spawner", spawner());
    components.define_prototype("Announcer", announcer());
    components.define_prototype("Scoreboard", scoreboard());
    components.define_prototype("Director", director());
    components
}

fn run(resources: &Path) -> Result<(), EngineError> {
    let mut engine = Engine::from_resources(resources, components())?;
    info!(
        "Running '{}' from scene '{}'",
        engine.config().game_title,
        engine.config().initial_scene
    );
    engine.run()
}

fn main() -> ExitCode {
    let resources = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_RESOURCES), PathBuf::from);

    // Errors in the config file are reported by the engine once logging is up
    let level = GameConfig::load_from_file(ResourceDirectory::new(&resources).config_path())
        .map_or_else(|_| "info".to_string(), |config| config.log_level);
    logging::init(&level);

    match run(&resources) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
