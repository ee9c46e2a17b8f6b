//! Dynamic object model for prototype-based components
//!
//! Components defined by content rather than by Rust code are stored as
//! [`ScriptObject`]s: a map of own fields plus an optional link to a shared,
//! read-only prototype. Reads fall through the prototype chain, writes always
//! land on the object itself. Callable fields are [`ScriptFn`] closures that
//! receive the [`HookContext`] of the component being invoked.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::actor::{Actor, ActorRef};
use crate::foundation::math::Vec2;
use crate::resources::ResourceError;
use crate::runtime::HookContext;

/// Callable stored in a component field
pub type ScriptFn = Rc<dyn Fn(&HookContext<'_>) -> Result<(), ScriptError>>;

/// A dynamically typed field value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / cleared
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Integral number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Str(String),
    /// One-dimensional float list
    List(Vec<f32>),
    /// Two-dimensional float list
    Grid(Vec<Vec<f32>>),
    /// 2D vector
    Vec2(Vec2),
    /// Callable field
    Function(ScriptFn),
    /// Non-owning reference to an actor
    Actor(Weak<Actor>),
}

impl Value {
    /// Wrap a closure as a callable value
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), ScriptError> + 'static,
    {
        Self::Function(Rc::new(f))
    }

    /// Non-owning actor reference
    pub fn actor(actor: &ActorRef) -> Self {
        Self::Actor(Rc::downgrade(actor))
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Grid(_) => "grid",
            Self::Vec2(_) => "vec2",
            Self::Function(_) => "function",
            Self::Actor(_) => "actor",
        }
    }

    /// True for [`Value::Nil`]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// True for [`Value::Function`]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Boolean content
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content; floats are accepted only when integral
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric content as `f64`
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric content as `f32`
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_f32(&self) -> Option<f32> {
        self.as_float().map(|f| f as f32)
    }

    /// String content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Vector content
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vec2(v) => Some(*v),
            Self::List(l) if l.len() == 2 => Some(Vec2::new(l[0], l[1])),
            _ => None,
        }
    }

    /// Referenced actor, if it is still alive
    pub fn as_actor(&self) -> Option<ActorRef> {
        match self {
            Self::Actor(weak) => weak.upgrade(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(l) => write!(f, "{l:?}"),
            Self::Grid(g) => write!(f, "{g:?}"),
            Self::Vec2(v) => write!(f, "({}, {})", v.x, v.y),
            Self::Function(_) => write!(f, "<function>"),
            Self::Actor(weak) => match weak.upgrade() {
                Some(actor) => write!(f, "<actor {}>", actor.name()),
                None => write!(f, "<actor destroyed>"),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Grid(a), Self::Grid(b)) => a == b,
            (Self::Vec2(a), Self::Vec2(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Actor(a), Self::Actor(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

/// Dynamic object with read-through prototype inheritance
#[derive(Clone, Default)]
pub struct ScriptObject {
    fields: HashMap<String, Value>,
    prototype: Option<Rc<ScriptObject>>,
}

impl ScriptObject {
    /// Create an empty object with no prototype
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object whose lookups fall back to `prototype`
    pub fn inheriting(prototype: Rc<Self>) -> Self {
        Self {
            fields: HashMap::new(),
            prototype: Some(prototype),
        }
    }

    /// Set a field (builder pattern)
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Set a callable field (builder pattern)
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), ScriptError> + 'static,
    {
        self.with_field(name, Value::function(f))
    }

    /// Look a field up on this object, then along the prototype chain
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .get(name)
            .or_else(|| self.prototype.as_deref().and_then(|proto| proto.get(name)))
    }

    /// Write a field on this object; `Nil` removes the own field
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_nil() {
            self.fields.remove(&name);
        } else {
            self.fields.insert(name, value);
        }
    }

    /// True if the field resolves to a non-nil value
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if the field is defined on this object itself
    pub fn has_own(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// True if the field resolves to a callable
    pub fn has_callable(&self, name: &str) -> bool {
        self.get(name).is_some_and(Value::is_callable)
    }

    /// The callable at `name`, if any
    pub fn function(&self, name: &str) -> Option<ScriptFn> {
        match self.get(name) {
            Some(Value::Function(f)) => Some(Rc::clone(f)),
            _ => None,
        }
    }

    /// Prototype this object inherits from
    pub fn prototype(&self) -> Option<&Rc<Self>> {
        self.prototype.as_ref()
    }

    /// Every field name visible through the chain, sorted
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut names = self
            .prototype
            .as_deref()
            .map(Self::field_names)
            .unwrap_or_default();
        names.extend(self.fields.keys().cloned());
        names
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject")
            .field("fields", &self.fields)
            .field("has_prototype", &self.prototype.is_some())
            .finish()
    }
}

/// Faults raised by component callbacks
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Recoverable runtime fault; logged and skipped
    #[error("{0}")]
    Runtime(String),

    /// A field held a value of the wrong type
    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Expected type
        expected: &'static str,
        /// Type actually supplied
        found: &'static str,
    },

    /// Attempt to write an immutable field
    #[error("field '{0}' is read-only")]
    ReadOnly(String),

    /// Content fault raised from inside a callback; ends the run
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl ScriptError {
    /// Build a runtime fault from a message
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Build a type mismatch for `field`
    pub fn mismatch(field: &str, expected: &'static str, found: &Value) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    /// True if the fault must terminate the run instead of being logged
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}
