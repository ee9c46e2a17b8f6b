//! Contact events and their dispatch into actor callbacks
//!
//! The physics world reports begin/end events per fixture pair. The bridge
//! resolves both fixtures to their owning actors and turns each event into a
//! pair of symmetric collision or trigger calls.

use log::trace;

use super::shape::Manifold;
use crate::actor::ActorRef;
use crate::foundation::math::{not_applicable, Vec2};
use crate::foundation::sequence::ActorId;
use crate::runtime::Runtime;

/// Whether a pair started or stopped touching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    /// Fixtures started overlapping this step
    Begin,
    /// Fixtures stopped overlapping (or one of them was destroyed)
    End,
}

/// One fixture's view of a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSide {
    /// Owning actor, if the fixture has one
    pub actor: Option<ActorId>,
    /// Sensor fixtures produce trigger callbacks
    pub is_sensor: bool,
    /// Linear velocity of the fixture's body
    pub velocity: Vec2,
}

/// Begin/end notification for a fixture pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    /// Begin or end
    pub phase: ContactPhase,
    /// First fixture
    pub a: ContactSide,
    /// Second fixture
    pub b: ContactSide,
    /// Contact geometry for solid begin contacts, normal pointing from `a` to `b`
    pub manifold: Option<Manifold>,
}

impl ContactEvent {
    /// True if either fixture is a sensor
    pub fn is_trigger(&self) -> bool {
        self.a.is_sensor || self.b.is_sensor
    }
}

/// Record handed to collision and trigger callbacks
#[derive(Debug, Clone)]
pub struct Collision {
    /// The other actor in the contact
    pub other: ActorRef,
    /// Contact point, or the not-applicable marker for triggers and end events
    pub point: Vec2,
    /// Contact normal, or the not-applicable marker for triggers and end events
    pub normal: Vec2,
    /// Velocity of the first body minus velocity of the second
    pub relative_velocity: Vec2,
}

/// Raycast hit resolved to a live actor
#[derive(Debug, Clone)]
pub struct HitResult {
    /// Actor owning the hit fixture
    pub actor: ActorRef,
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// True if the fixture is a sensor
    pub is_trigger: bool,
}

/// Lookup from fixture user data to live actors
pub trait ActorResolver {
    /// Live actor with `id`, or `None` if it no longer exists
    fn resolve_actor(&self, id: ActorId) -> Option<ActorRef>;
}

/// Adapter from physics contact events to actor callbacks
pub struct ContactBridge;

impl ContactBridge {
    /// Dispatch every event in order
    pub fn dispatch_all(runtime: &Runtime, resolver: &dyn ActorResolver, events: &[ContactEvent]) {
        for event in events {
            Self::dispatch(runtime, resolver, event);
        }
    }

    /// Dispatch one event to both owning actors
    ///
    /// Returns `false` when either side has no live owning actor, in which
    /// case the event is ignored.
    pub fn dispatch(runtime: &Runtime, resolver: &dyn ActorResolver, event: &ContactEvent) -> bool {
        let (Some(id_a), Some(id_b)) = (event.a.actor, event.b.actor) else {
            return false;
        };
        let (Some(actor_a), Some(actor_b)) = (resolver.resolve_actor(id_a), resolver.resolve_actor(id_b)) else {
            trace!("Ignoring contact between {id_a} and {id_b}: actor no longer live");
            return false;
        };

        let trigger = event.is_trigger();
        let (point, normal) = match (trigger, event.phase, event.manifold) {
            (false, ContactPhase::Begin, Some(manifold)) => (manifold.point, manifold.normal),
            _ => (not_applicable(), not_applicable()),
        };

        let seen_by_a = Collision {
            other: ActorRef::clone(&actor_b),
            point,
            normal,
            relative_velocity: event.a.velocity - event.b.velocity,
        };
        let seen_by_b = Collision {
            other: ActorRef::clone(&actor_a),
            ..seen_by_a.clone()
        };

        match (trigger, event.phase) {
            (true, ContactPhase::Begin) => {
                actor_a.trigger_enter(runtime, &seen_by_a);
                actor_b.trigger_enter(runtime, &seen_by_b);
            }
            (true, ContactPhase::End) => {
                actor_a.trigger_exit(runtime, &seen_by_a);
                actor_b.trigger_exit(runtime, &seen_by_b);
            }
            (false, ContactPhase::Begin) => {
                actor_a.collision_enter(runtime, &seen_by_a);
                actor_b.collision_enter(runtime, &seen_by_b);
            }
            (false, ContactPhase::End) => {
                actor_a.collision_exit(runtime, &seen_by_a);
                actor_b.collision_exit(runtime, &seen_by_b);
            }
        }
        true
    }
}
