//! Rigidbody: the built-in native component that owns a physics body
//!
//! Until `OnStart` runs there is no body, and position, rotation and gravity
//! scale read and write the component's own fields. After `OnStart` they go
//! through the physics world. `OnDestroy` removes the body again.

use std::any::Any;
use std::f32::consts::FRAC_PI_2;

use log::trace;

use super::{Hook, HookSet, NativeComponent};
use crate::foundation::math::{angle_from_up, normalize_or_zero, right_direction, up_direction, Vec2};
use crate::physics::{BodyDef, BodyHandle, BodyType, CollisionFilter, FixtureDef, PhysicsWorld, Shape};
use crate::runtime::HookContext;
use crate::script::{ScriptError, Value};

const FIELDS: &[&str] = &[
    "x",
    "y",
    "body_type",
    "precise",
    "gravity_scale",
    "density",
    "angular_friction",
    "rotation",
    "has_collider",
    "collider_type",
    "width",
    "height",
    "radius",
    "friction",
    "bounciness",
    "has_trigger",
    "trigger_type",
    "trigger_width",
    "trigger_height",
    "trigger_radius",
];

/// Physics body proxy attached to an actor
#[derive(Debug, Clone)]
pub struct Rigidbody {
    x: f32,
    y: f32,
    body_type: String,
    precise: bool,
    gravity_scale: f32,
    density: f32,
    angular_friction: f32,
    rotation: f32,
    has_collider: bool,
    collider_type: String,
    width: f32,
    height: f32,
    radius: f32,
    friction: f32,
    bounciness: f32,
    has_trigger: bool,
    trigger_type: String,
    trigger_width: f32,
    trigger_height: f32,
    trigger_radius: f32,
    body: Option<BodyHandle>,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            body_type: "dynamic".to_string(),
            precise: true,
            gravity_scale: 1.0,
            density: 1.0,
            angular_friction: 0.3,
            rotation: 0.0,
            has_collider: true,
            collider_type: "box".to_string(),
            width: 1.0,
            height: 1.0,
            radius: 0.5,
            friction: 0.3,
            bounciness: 0.3,
            has_trigger: true,
            trigger_type: "box".to_string(),
            trigger_width: 1.0,
            trigger_height: 1.0,
            trigger_radius: 0.5,
            body: None,
        }
    }
}

impl Rigidbody {
    /// Registered type name
    pub const TYPE_NAME: &'static str = "Rigidbody";

    /// Set the starting position (builder pattern)
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the body type by name (builder pattern)
    pub fn with_body_type(mut self, body_type: impl Into<String>) -> Self {
        self.body_type = body_type.into();
        self
    }

    /// Enable or disable the solid collider (builder pattern)
    pub fn with_collider(mut self, enabled: bool) -> Self {
        self.has_collider = enabled;
        self
    }

    /// Enable or disable the trigger sensor (builder pattern)
    pub fn with_trigger(mut self, enabled: bool) -> Self {
        self.has_trigger = enabled;
        self
    }

    /// Handle of the body created by `OnStart`
    pub fn body_handle(&self) -> Option<BodyHandle> {
        self.body
    }

    /// Body type parsed from the `body_type` field
    pub fn body_type(&self) -> BodyType {
        BodyType::from_name(&self.body_type)
    }

    /// Current position
    pub fn position(&self, world: &PhysicsWorld) -> Vec2 {
        self.body_in(world)
            .map_or_else(|| Vec2::new(self.x, self.y), |body| body.position())
    }

    /// Current rotation in clockwise degrees
    pub fn rotation(&self, world: &PhysicsWorld) -> f32 {
        self.body_in(world)
            .map_or(self.rotation, |body| body.angle().to_degrees())
    }

    /// Linear velocity; zero before the body exists
    pub fn velocity(&self, world: &PhysicsWorld) -> Vec2 {
        self.body_in(world)
            .map_or_else(Vec2::zeros, |body| body.linear_velocity())
    }

    /// Angular velocity in clockwise degrees per second
    pub fn angular_velocity(&self, world: &PhysicsWorld) -> f32 {
        self.body_in(world)
            .map_or(0.0, |body| body.angular_velocity().to_degrees())
    }

    /// Gravity multiplier
    pub fn gravity_scale(&self, world: &PhysicsWorld) -> f32 {
        self.body_in(world)
            .map_or(self.gravity_scale, |body| body.gravity_scale())
    }

    /// Direction the body faces
    pub fn up_direction(&self, world: &PhysicsWorld) -> Vec2 {
        up_direction(self.rotation(world).to_radians())
    }

    /// Direction to the body's right
    pub fn right_direction(&self, world: &PhysicsWorld) -> Vec2 {
        right_direction(self.rotation(world).to_radians())
    }

    /// Apply a force at the center of mass for the next step
    pub fn add_force(&self, world: &mut PhysicsWorld, force: Vec2) {
        if let Some(body) = self.body.and_then(|handle| world.body_mut(handle)) {
            body.apply_force_to_center(force);
        }
    }

    /// Set linear velocity
    pub fn set_velocity(&self, world: &mut PhysicsWorld, velocity: Vec2) {
        if let Some(body) = self.body.and_then(|handle| world.body_mut(handle)) {
            body.set_linear_velocity(velocity);
        }
    }

    /// Move the body, or the starting position before it exists
    pub fn set_position(&mut self, world: &mut PhysicsWorld, position: Vec2) {
        match self.body.and_then(|handle| world.body_mut(handle)) {
            Some(body) => {
                let angle = body.angle();
                body.set_transform(position, angle);
            }
            None => {
                self.x = position.x;
                self.y = position.y;
            }
        }
    }

    /// Set rotation in clockwise degrees
    pub fn set_rotation(&mut self, world: &mut PhysicsWorld, degrees: f32) {
        match self.body.and_then(|handle| world.body_mut(handle)) {
            Some(body) => {
                let position = body.position();
                body.set_transform(position, degrees.to_radians());
            }
            None => self.rotation = degrees,
        }
    }

    /// Set angular velocity in clockwise degrees per second
    pub fn set_angular_velocity(&self, world: &mut PhysicsWorld, degrees: f32) {
        if let Some(body) = self.body.and_then(|handle| world.body_mut(handle)) {
            body.set_angular_velocity(degrees.to_radians());
        }
    }

    /// Set the gravity multiplier
    pub fn set_gravity_scale(&mut self, world: &mut PhysicsWorld, scale: f32) {
        match self.body.and_then(|handle| world.body_mut(handle)) {
            Some(body) => body.set_gravity_scale(scale),
            None => self.gravity_scale = scale,
        }
    }

    /// Rotate so the up direction points along `direction`
    pub fn set_up_direction(&mut self, world: &mut PhysicsWorld, direction: Vec2) {
        let angle = angle_from_up(normalize_or_zero(direction));
        self.set_rotation(world, angle.to_degrees());
    }

    /// Rotate so the right direction points along `direction`
    pub fn set_right_direction(&mut self, world: &mut PhysicsWorld, direction: Vec2) {
        let angle = angle_from_up(normalize_or_zero(direction)) - FRAC_PI_2;
        self.set_rotation(world, angle.to_degrees());
    }

    fn body_in<'w>(&self, world: &'w PhysicsWorld) -> Option<&'w crate::physics::Body> {
        self.body.and_then(|handle| world.body(handle))
    }

    fn shape(kind: &str, width: f32, height: f32, radius: f32) -> Result<Shape, ScriptError> {
        match kind {
            "box" => Ok(Shape::rect(width, height)),
            "circle" => Ok(Shape::circle(radius)),
            other => Err(ScriptError::runtime(format!("unknown shape type '{other}'"))),
        }
    }

    fn start(&mut self, ctx: &HookContext<'_>) -> Result<(), ScriptError> {
        let owner = ctx.actor.id();
        let collider = Self::shape(&self.collider_type, self.width, self.height, self.radius)?;
        let trigger = Self::shape(&self.trigger_type, self.trigger_width, self.trigger_height, self.trigger_radius)?;

        let mut world = ctx.runtime.physics_mut();
        let handle = world.create_body(&BodyDef {
            body_type: self.body_type(),
            position: Vec2::new(self.x, self.y),
            angle: self.rotation.to_radians(),
            gravity_scale: self.gravity_scale,
            bullet: self.precise,
            angular_damping: self.angular_friction,
        });

        // Bodies without collider or trigger still need mass to move
        if !self.has_collider && !self.has_trigger {
            world.create_fixture(handle, &FixtureDef {
                is_sensor: true,
                density: self.density,
                ..FixtureDef::new(Shape::rect(self.width, self.height))
            });
        }

        if self.has_collider {
            world.create_fixture(handle, &FixtureDef {
                shape: collider,
                density: self.density,
                friction: self.friction,
                restitution: self.bounciness,
                is_sensor: false,
                filter: CollisionFilter::collider(),
                user_data: owner,
            });
        }

        if self.has_trigger {
            world.create_fixture(handle, &FixtureDef {
                shape: trigger,
                density: self.density,
                friction: 0.0,
                restitution: 0.0,
                is_sensor: true,
                filter: CollisionFilter::trigger(),
                user_data: owner,
            });
        }

        trace!("Rigidbody for '{}' created body {:?}", ctx.actor.name(), handle);
        self.body = Some(handle);
        Ok(())
    }

    fn destroy(&mut self, ctx: &HookContext<'_>) {
        if let Some(handle) = self.body.take() {
            ctx.runtime.physics_mut().destroy_body(handle);
        }
    }
}

fn number(name: &str, value: &Value) -> Result<f32, ScriptError> {
    value.as_f32().ok_or_else(|| ScriptError::mismatch(name, "number", value))
}

fn boolean(name: &str, value: &Value) -> Result<bool, ScriptError> {
    value.as_bool().ok_or_else(|| ScriptError::mismatch(name, "boolean", value))
}

fn string(name: &str, value: &Value) -> Result<String, ScriptError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ScriptError::mismatch(name, "string", value))
}

impl NativeComponent for Rigidbody {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn field_names(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "x" => Value::from(self.x),
            "y" => Value::from(self.y),
            "body_type" => Value::from(self.body_type.as_str()),
            "precise" => Value::Bool(self.precise),
            "gravity_scale" => Value::from(self.gravity_scale),
            "density" => Value::from(self.density),
            "angular_friction" => Value::from(self.angular_friction),
            "rotation" => Value::from(self.rotation),
            "has_collider" => Value::Bool(self.has_collider),
            "collider_type" => Value::from(self.collider_type.as_str()),
            "width" => Value::from(self.width),
            "height" => Value::from(self.height),
            "radius" => Value::from(self.radius),
            "friction" => Value::from(self.friction),
            "bounciness" => Value::from(self.bounciness),
            "has_trigger" => Value::Bool(self.has_trigger),
            "trigger_type" => Value::from(self.trigger_type.as_str()),
            "trigger_width" => Value::from(self.trigger_width),
            "trigger_height" => Value::from(self.trigger_height),
            "trigger_radius" => Value::from(self.trigger_radius),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        match name {
            "x" => self.x = number(name, &value)?,
            "y" => self.y = number(name, &value)?,
            "body_type" => self.body_type = string(name, &value)?,
            "precise" => self.precise = boolean(name, &value)?,
            "gravity_scale" => self.gravity_scale = number(name, &value)?,
            "density" => self.density = number(name, &value)?,
            "angular_friction" => self.angular_friction = number(name, &value)?,
            "rotation" => self.rotation = number(name, &value)?,
            "has_collider" => self.has_collider = boolean(name, &value)?,
            "collider_type" => self.collider_type = string(name, &value)?,
            "width" => self.width = number(name, &value)?,
            "height" => self.height = number(name, &value)?,
            "radius" => self.radius = number(name, &value)?,
            "friction" => self.friction = number(name, &value)?,
            "bounciness" => self.bounciness = number(name, &value)?,
            "has_trigger" => self.has_trigger = boolean(name, &value)?,
            "trigger_type" => self.trigger_type = string(name, &value)?,
            "trigger_width" => self.trigger_width = number(name, &value)?,
            "trigger_height" => self.trigger_height = number(name, &value)?,
            "trigger_radius" => self.trigger_radius = number(name, &value)?,
            _ => return Err(ScriptError::runtime(format!("Rigidbody has no field '{name}'"))),
        }
        Ok(())
    }

    fn hooks(&self) -> HookSet {
        HookSet::START | HookSet::DESTROY
    }

    fn call_hook(&mut self, hook: Hook, ctx: &HookContext<'_>) -> Result<(), ScriptError> {
        match hook {
            Hook::Start => self.start(ctx),
            Hook::Destroy => {
                self.destroy(ctx);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn clone_native(&self) -> Box<dyn NativeComponent> {
        Box::new(Self {
            body: None,
            ..self.clone()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_match_documented_values() {
        let rb = Rigidbody::default();
        assert_eq!(rb.field("body_type"), Some(Value::Str("dynamic".into())));
        assert_eq!(rb.field("has_trigger"), Some(Value::Bool(true)));
        assert_relative_eq!(rb.field("angular_friction").and_then(|v| v.as_f32()).unwrap(), 0.3);
        assert_relative_eq!(rb.field("radius").and_then(|v| v.as_f32()).unwrap(), 0.5);
        assert!(rb.field("mass").is_none());
    }

    #[test]
    fn test_set_field_coerces_integers_and_checks_types() {
        let mut rb = Rigidbody::default();
        rb.set_field("x", Value::Int(3)).unwrap();
        rb.set_field("body_type", Value::from("static")).unwrap();
        assert_relative_eq!(rb.position(&PhysicsWorld::default()).x, 3.0);
        assert_eq!(rb.body_type(), BodyType::Static);

        assert!(rb.set_field("precise", Value::Int(1)).is_err());
        assert!(rb.set_field("unknown", Value::Int(1)).is_err());
    }

    #[test]
    fn test_setters_write_fields_before_body_exists() {
        let mut world = PhysicsWorld::default();
        let mut rb = Rigidbody::default();
        rb.set_position(&mut world, Vec2::new(4.0, 5.0));
        rb.set_rotation(&mut world, 90.0);
        rb.set_gravity_scale(&mut world, 0.0);

        assert_eq!(rb.position(&world), Vec2::new(4.0, 5.0));
        assert_relative_eq!(rb.rotation(&world), 90.0);
        assert_relative_eq!(rb.gravity_scale(&world), 0.0);
        assert_eq!(rb.velocity(&world), Vec2::zeros());
        assert!(!world.is_active());
    }

    #[test]
    fn test_up_and_right_follow_rotation() {
        let world = PhysicsWorld::default();
        let mut rb = Rigidbody::default();
        let mut scratch = PhysicsWorld::default();
        rb.set_rotation(&mut scratch, 90.0);

        let up = rb.up_direction(&world);
        let right = rb.right_direction(&world);
        assert_relative_eq!(up.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(right.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_clone_native_drops_body_handle() {
        let mut world = PhysicsWorld::default();
        let mut rb = Rigidbody::default();
        rb.body = Some(world.create_body(&BodyDef::default()));

        let copy = rb.clone_native();
        let copy = copy.as_any().downcast_ref::<Rigidbody>().unwrap();
        assert!(copy.body_handle().is_none());
        assert_eq!(copy.field("width"), rb.field("width"));
    }
}
