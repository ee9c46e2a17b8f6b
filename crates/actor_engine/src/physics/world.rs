//! Rigid body world: bodies, fixtures, fixed-step integration and contact tracking
//!
//! Contacts are tracked like the ECS collision system tracked entity pairs:
//! pairs touching this step are diffed against the previous step, new pairs
//! become begin events and vanished pairs become end events.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use slotmap::{new_key_type, SlotMap};

use super::collision_layers::CollisionFilter;
use super::contact::{ContactEvent, ContactPhase, ContactSide};
use super::shape::{collide, Manifold, Ray, Shape};
use crate::config::PhysicsConfig;
use crate::foundation::math::Vec2;
use crate::foundation::sequence::ActorId;

/// Penetration left in place so resting contacts stay touching
const LINEAR_SLOP: f32 = 0.005;

new_key_type! {
    /// Handle to a body owned by the physics world
    pub struct BodyHandle;
}

/// How a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    /// Never moves
    #[default]
    Static,
    /// Moved by gravity, forces and contacts
    Dynamic,
    /// Moved only by its velocity
    Kinematic,
}

impl BodyType {
    /// Parse `"dynamic"`, `"static"` or `"kinematic"` by first letter; anything else is static
    pub fn from_name(name: &str) -> Self {
        match name.chars().next() {
            Some('d') => Self::Dynamic,
            Some('k') => Self::Kinematic,
            _ => Self::Static,
        }
    }
}

/// Body creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDef {
    /// Motion type
    pub body_type: BodyType,
    /// Initial position
    pub position: Vec2,
    /// Initial angle in radians
    pub angle: f32,
    /// Multiplier on world gravity
    pub gravity_scale: f32,
    /// Continuous collision requested; recorded only
    pub bullet: bool,
    /// Angular velocity damping
    pub angular_damping: f32,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::zeros(),
            angle: 0.0,
            gravity_scale: 1.0,
            bullet: false,
            angular_damping: 0.0,
        }
    }
}

/// Fixture creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDef {
    /// Geometry centered on the body
    pub shape: Shape,
    /// Mass per unit area
    pub density: f32,
    /// Surface friction
    pub friction: f32,
    /// Bounciness
    pub restitution: f32,
    /// Sensors detect overlap without a physical response
    pub is_sensor: bool,
    /// Category/mask filter
    pub filter: CollisionFilter,
    /// Owning actor; fixtures without one never reach gameplay code
    pub user_data: Option<ActorId>,
}

impl FixtureDef {
    /// Fixture with default material and a filter matching nothing
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            is_sensor: false,
            filter: CollisionFilter::none(),
            user_data: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Fixture {
    shape: Shape,
    density: f32,
    restitution: f32,
    is_sensor: bool,
    filter: CollisionFilter,
    user_data: Option<ActorId>,
}

/// A simulated body
#[derive(Debug, Clone)]
pub struct Body {
    body_type: BodyType,
    position: Vec2,
    angle: f32,
    linear_velocity: Vec2,
    angular_velocity: f32,
    gravity_scale: f32,
    angular_damping: f32,
    bullet: bool,
    force: Vec2,
    mass: f32,
    fixtures: Vec<Fixture>,
}

impl Body {
    fn new(def: &BodyDef) -> Self {
        Self {
            body_type: def.body_type,
            position: def.position,
            angle: def.angle,
            linear_velocity: Vec2::zeros(),
            angular_velocity: 0.0,
            gravity_scale: def.gravity_scale,
            angular_damping: def.angular_damping,
            bullet: def.bullet,
            force: Vec2::zeros(),
            mass: 1.0,
            fixtures: Vec::new(),
        }
    }

    /// Motion type
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// World position
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Angle in radians
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Linear velocity
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Angular velocity in radians per second
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Gravity multiplier
    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Whether continuous collision was requested
    pub fn is_bullet(&self) -> bool {
        self.bullet
    }

    /// Mass derived from fixture densities
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Number of attached fixtures
    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Teleport the body
    pub fn set_transform(&mut self, position: Vec2, angle: f32) {
        self.position = position;
        self.angle = angle;
    }

    /// Set linear velocity
    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        self.linear_velocity = velocity;
    }

    /// Set angular velocity in radians per second
    pub fn set_angular_velocity(&mut self, velocity: f32) {
        self.angular_velocity = velocity;
    }

    /// Set gravity multiplier
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    /// Accumulate a force applied at the center of mass until the next step
    pub fn apply_force_to_center(&mut self, force: Vec2) {
        self.force += force;
    }

    fn inverse_mass(&self) -> f32 {
        if self.body_type == BodyType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    fn reset_mass(&mut self) {
        let mass: f32 = self
            .fixtures
            .iter()
            .filter(|f| f.density > 0.0)
            .map(|f| f.density * f.shape.area())
            .sum();
        self.mass = if mass > 0.0 { mass } else { 1.0 };
    }
}

/// Identifies one fixture: its body and its index on that body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureKey {
    /// Owning body
    pub body: BodyHandle,
    /// Index in creation order
    pub index: usize,
}

/// Unordered fixture pair, always stored with the smaller key first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactPair {
    /// Smaller fixture key
    pub a: FixtureKey,
    /// Larger fixture key
    pub b: FixtureKey,
}

impl ContactPair {
    /// Create a new contact pair (always stores the smaller key first)
    pub fn new(a: FixtureKey, b: FixtureKey) -> Self {
        if a < b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    fn involves(&self, body: BodyHandle) -> bool {
        self.a.body == body || self.b.body == body
    }
}

/// Raycast hit on a fixture that has an owning actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Owning actor
    pub actor: ActorId,
    /// Hit point
    pub point: Vec2,
    /// Surface normal
    pub normal: Vec2,
    /// True for sensor fixtures
    pub is_sensor: bool,
    /// Position along the ray in `[0, 1]`
    pub fraction: f32,
}

/// The physics world
///
/// Inactive until the first body is created; stepping or raycasting an
/// inactive world does nothing.
pub struct PhysicsWorld {
    gravity: Vec2,
    timestep: f32,
    velocity_iterations: u32,
    position_iterations: u32,
    active: bool,
    bodies: SlotMap<BodyHandle, Body>,
    touching: BTreeSet<ContactPair>,
    pending_events: Vec<ContactEvent>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    /// Create a new, inactive world
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            gravity: config.gravity(),
            timestep: config.timestep,
            velocity_iterations: config.velocity_iterations.max(1),
            position_iterations: config.position_iterations.max(1),
            active: false,
            bodies: SlotMap::with_key(),
            touching: BTreeSet::new(),
            pending_events: Vec::new(),
        }
    }

    /// True once any body has been created
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// World gravity
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Seconds advanced per step
    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    /// Velocity and position solver iteration counts
    pub fn iterations(&self) -> (u32, u32) {
        (self.velocity_iterations, self.position_iterations)
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of fixture pairs currently touching
    pub fn contact_count(&self) -> usize {
        self.touching.len()
    }

    /// Create a body, activating the world if needed
    pub fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        if !self.active {
            debug!("Physics world activated (gravity {:?})", self.gravity);
            self.active = true;
        }
        self.bodies.insert(Body::new(def))
    }

    /// Attach a fixture to a body; returns `None` for a stale handle
    pub fn create_fixture(&mut self, handle: BodyHandle, def: &FixtureDef) -> Option<FixtureKey> {
        let body = self.bodies.get_mut(handle)?;
        body.fixtures.push(Fixture {
            shape: def.shape,
            density: def.density,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            filter: def.filter,
            user_data: def.user_data,
        });
        body.reset_mass();
        Some(FixtureKey {
            body: handle,
            index: body.fixtures.len() - 1,
        })
    }

    /// Destroy a body; touching pairs receive end events on the next step
    pub fn destroy_body(&mut self, handle: BodyHandle) {
        if !self.bodies.contains_key(handle) {
            return;
        }

        let broken: Vec<ContactPair> = self.touching.iter().filter(|p| p.involves(handle)).copied().collect();
        for pair in broken {
            self.touching.remove(&pair);
            if let (Some(a), Some(b)) = (self.side(pair.a), self.side(pair.b)) {
                self.pending_events.push(ContactEvent {
                    phase: ContactPhase::End,
                    a,
                    b,
                    manifold: None,
                });
            }
        }

        self.bodies.remove(handle);
    }

    /// Body lookup
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Mutable body lookup
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Advance one fixed step and report contact changes
    pub fn step(&mut self) -> Vec<ContactEvent> {
        if !self.active {
            return Vec::new();
        }

        self.integrate(self.timestep);

        // Contact changes are decided before the solver separates anything
        let contacts = self.find_contacts();
        self.resolve(&contacts);
        for _ in 1..self.position_iterations {
            let refreshed = self.find_contacts();
            self.resolve(&refreshed);
        }

        let mut events = std::mem::take(&mut self.pending_events);

        for pair in &self.touching {
            if !contacts.contains_key(pair) {
                if let Some(event) = self.event(ContactPhase::End, *pair, None) {
                    events.push(event);
                }
            }
        }

        for (pair, manifold) in &contacts {
            if !self.touching.contains(pair) {
                if let Some(event) = self.event(ContactPhase::Begin, *pair, Some(*manifold)) {
                    events.push(event);
                }
            }
        }

        self.touching = contacts.into_keys().collect();
        events
    }

    /// Every fixture with an owning actor along the segment `pos -> pos + dir * dist`, nearest first
    pub fn raycast_all(&self, pos: Vec2, dir: Vec2, dist: f32) -> Vec<RaycastHit> {
        if dist <= 0.0 || !self.active {
            return Vec::new();
        }

        let ray = Ray::new(pos, pos + dir * dist);
        let mut hits = Vec::new();
        for body in self.bodies.values() {
            for fixture in &body.fixtures {
                let Some(actor) = fixture.user_data else {
                    continue;
                };
                if let Some(hit) = ray.cast(&fixture.shape, body.position) {
                    hits.push(RaycastHit {
                        actor,
                        point: hit.point,
                        normal: hit.normal,
                        is_sensor: fixture.is_sensor,
                        fraction: hit.fraction,
                    });
                }
            }
        }

        hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        hits
    }

    /// Nearest fixture hit along the segment
    pub fn raycast(&self, pos: Vec2, dir: Vec2, dist: f32) -> Option<RaycastHit> {
        self.raycast_all(pos, dir, dist).into_iter().next()
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            match body.body_type {
                BodyType::Static => continue,
                BodyType::Dynamic => {
                    let acceleration = gravity * body.gravity_scale + body.force * body.inverse_mass();
                    body.linear_velocity += acceleration * dt;
                    body.angular_velocity *= 1.0 / (1.0 + dt * body.angular_damping);
                }
                BodyType::Kinematic => {}
            }
            body.position += body.linear_velocity * dt;
            body.angle += body.angular_velocity * dt;
            body.force = Vec2::zeros();
        }
    }

    fn find_contacts(&self) -> BTreeMap<ContactPair, Manifold> {
        let mut fixtures: Vec<(FixtureKey, &Body, &Fixture)> = self
            .bodies
            .iter()
            .flat_map(|(handle, body)| {
                body.fixtures
                    .iter()
                    .enumerate()
                    .map(move |(index, fixture)| (FixtureKey { body: handle, index }, body, fixture))
            })
            .collect();
        fixtures.sort_by_key(|(key, _, _)| *key);

        let mut contacts = BTreeMap::new();
        for (i, (key_a, body_a, fixture_a)) in fixtures.iter().enumerate() {
            for (key_b, body_b, fixture_b) in &fixtures[i + 1..] {
                if key_a.body == key_b.body {
                    continue;
                }
                // At least one side has to be dynamic
                if body_a.body_type != BodyType::Dynamic && body_b.body_type != BodyType::Dynamic {
                    continue;
                }
                if !fixture_a.filter.accepts(&fixture_b.filter) {
                    continue;
                }
                if let Some(manifold) = collide(&fixture_a.shape, body_a.position, &fixture_b.shape, body_b.position) {
                    contacts.insert(ContactPair::new(*key_a, *key_b), manifold);
                }
            }
        }
        contacts
    }

    fn resolve(&mut self, contacts: &BTreeMap<ContactPair, Manifold>) {
        for (pair, manifold) in contacts {
            let (Some(body_a), Some(body_b)) = (self.bodies.get(pair.a.body), self.bodies.get(pair.b.body)) else {
                continue;
            };
            let (Some(fixture_a), Some(fixture_b)) = (body_a.fixtures.get(pair.a.index), body_b.fixtures.get(pair.b.index)) else {
                continue;
            };
            if fixture_a.is_sensor || fixture_b.is_sensor {
                continue;
            }

            let inv_a = body_a.inverse_mass();
            let inv_b = body_b.inverse_mass();
            let total = inv_a + inv_b;
            if total <= 0.0 {
                continue;
            }

            let normal = manifold.normal;
            let correction = normal * ((manifold.depth - LINEAR_SLOP).max(0.0) / total);

            let mut velocity_a = body_a.linear_velocity;
            let mut velocity_b = body_b.linear_velocity;
            let approach = (velocity_b - velocity_a).dot(&normal);
            if approach < 0.0 {
                let restitution = fixture_a.restitution.max(fixture_b.restitution);
                let impulse = -(1.0 + restitution) * approach / total;
                velocity_a -= normal * (impulse * inv_a);
                velocity_b += normal * (impulse * inv_b);
            }

            if let Some(body) = self.bodies.get_mut(pair.a.body) {
                body.position -= correction * inv_a;
                body.linear_velocity = velocity_a;
            }
            if let Some(body) = self.bodies.get_mut(pair.b.body) {
                body.position += correction * inv_b;
                body.linear_velocity = velocity_b;
            }
        }
    }

    fn side(&self, key: FixtureKey) -> Option<ContactSide> {
        let body = self.bodies.get(key.body)?;
        let fixture = body.fixtures.get(key.index)?;
        Some(ContactSide {
            actor: fixture.user_data,
            is_sensor: fixture.is_sensor,
            velocity: body.linear_velocity,
        })
    }

    fn event(&self, phase: ContactPhase, pair: ContactPair, manifold: Option<Manifold>) -> Option<ContactEvent> {
        let a = self.side(pair.a)?;
        let b = self.side(pair.b)?;
        let manifold = if a.is_sensor || b.is_sensor { None } else { manifold };
        Some(ContactEvent { phase, a, b, manifold })
    }
}
