//! # Actor Engine
//!
//! A single-threaded actor/component simulation core.
//!
//! ## Features
//!
//! - **Actors and components**: native (Rust) and prototype-based components behind one hook contract
//! - **Deferred mutation**: components and actors added or removed mid-frame take effect at fixed merge points
//! - **Scenes**: data-driven levels with actors that can persist across scene loads
//! - **Physics contacts**: begin/end contact events turned into collision and trigger hooks
//! - **Declarative content**: JSON actor templates and scenes, TOML/RON game configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actor_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut components = ComponentRegistry::with_builtins();
//!     components.define_prototype(
//!         "Spinner",
//!         ScriptObject::new()
//!             .with_field("speed", 2.0)
//!             .with_fn("OnUpdate", |ctx| {
//!                 let angle = ctx.get_f64("angle", 0.0) + ctx.get_f64("speed", 0.0);
//!                 ctx.set("angle", angle)
//!             }),
//!     );
//!
//!     let mut engine = Engine::from_resources("resources", components)?;
//!     engine.run()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod actor;
pub mod component;
pub mod config;
pub mod events;
pub mod foundation;
pub mod physics;
pub mod resources;
pub mod runtime;
pub mod scene;
pub mod script;

mod engine;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        actor::{Actor, ActorRef, ActorTemplate, ComponentTemplate, TemplateRegistry},
        component::{Component, ComponentRef, ComponentRegistry, Hook, HookSet, NativeComponent, Rigidbody},
        config::{Config, GameConfig},
        events::{EventBus, Subscription},
        foundation::{
            math::Vec2,
            sequence::ActorId,
        },
        physics::{Collision, HitResult},
        resources::{ResourceDirectory, ResourceError},
        runtime::{HookContext, Runtime},
        scene::{Scene, SceneBlueprint, SceneManager},
        script::{ScriptError, ScriptFn, ScriptObject, Value},
        Engine, EngineError,
    };
}
