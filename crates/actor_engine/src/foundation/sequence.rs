//! Process-scoped sequence generators
//!
//! Actor ids and component keys are drawn from monotonically increasing
//! counters. They are owned by the runtime instead of living in globals, so
//! every test can start from a fresh sequence.

use std::cell::Cell;
use std::fmt;

/// Monotonic counter handing out each value exactly once
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: Cell<u64>,
}

impl SequenceGenerator {
    /// Create a generator starting at zero
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator whose first value is `start`
    pub fn starting_at(start: u64) -> Self {
        Self { next: Cell::new(start) }
    }

    /// Take the next value
    pub fn next_value(&self) -> u64 {
        let value = self.next.get();
        self.next.set(value + 1);
        value
    }

    /// Value the next call to [`Self::next_value`] will return
    pub fn peek(&self) -> u64 {
        self.next.get()
    }
}

/// Unique actor identifier, assigned at activation and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two shared counters of a running simulation
#[derive(Debug, Default)]
pub struct Sequences {
    /// Source of actor ids
    pub actor_ids: SequenceGenerator,
    /// Source of component keys (`"r" + n`), shared by every actor
    pub component_keys: SequenceGenerator,
}

impl Sequences {
    /// Create fresh sequences starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next actor id
    pub fn next_actor_id(&self) -> ActorId {
        ActorId(self.actor_ids.next_value())
    }

    /// Allocate the next component key
    pub fn next_component_key(&self) -> String {
        format!("r{}", self.component_keys.next_value())
    }
}
