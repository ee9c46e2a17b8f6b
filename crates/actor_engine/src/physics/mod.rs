//! Physics module: rigid bodies, contact tracking and raycasts
//!
//! The world owns bodies and fixtures and reports contact changes per fixed
//! step. Fixtures refer back to actors by [`ActorId`](crate::foundation::sequence::ActorId)
//! only; the [`ContactBridge`] resolves those ids against the current scene and
//! forwards each event to the owning actors.

pub mod collision_layers;
pub mod contact;
pub mod shape;
pub mod world;

pub use collision_layers::{CollisionFilter, CollisionLayers};
pub use contact::{ActorResolver, Collision, ContactBridge, ContactEvent, ContactPhase, ContactSide, HitResult};
pub use shape::{Manifold, Ray, RayHit, Shape};
pub use world::{Body, BodyDef, BodyHandle, BodyType, FixtureDef, FixtureKey, PhysicsWorld, RaycastHit};
