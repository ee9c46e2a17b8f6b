//! Collision layer system for filtering contacts between fixtures
//!
//! Every fixture carries a category (the layer it is on) and a mask (the
//! layers it accepts). Two fixtures interact only when each one's category is
//! accepted by the other's mask.

/// Category/mask pair attached to a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionFilter {
    /// Layer bits this fixture occupies
    pub category: u16,
    /// Layer bits this fixture collides with
    pub mask: u16,
}

impl CollisionFilter {
    /// Create a filter from raw bits
    pub fn new(category: u16, mask: u16) -> Self {
        Self { category, mask }
    }

    /// Filter used by solid colliders
    pub fn collider() -> Self {
        Self::new(CollisionLayers::COLLIDER, CollisionLayers::COLLIDER | CollisionLayers::EXTERNAL)
    }

    /// Filter used by trigger sensors; triggers only see other triggers
    pub fn trigger() -> Self {
        Self::new(CollisionLayers::TRIGGER, CollisionLayers::TRIGGER)
    }

    /// Filter that never matches anything
    pub fn none() -> Self {
        Self::new(CollisionLayers::NONE, CollisionLayers::NONE)
    }

    /// Check this filter against another
    pub fn accepts(&self, other: &Self) -> bool {
        CollisionLayers::should_collide(self.category, self.mask, other.category, other.mask)
    }
}

/// Collision layer definitions
pub struct CollisionLayers;

impl CollisionLayers {
    /// No collision layer
    pub const NONE: u16 = 0;
    
    /// All collision layers
    pub const ALL: u16 = 0xFFFF;
    
    /// Solid rigidbody colliders
    pub const COLLIDER: u16 = 1 << 0;
    
    /// Trigger volumes (no physical response)
    pub const TRIGGER: u16 = 1 << 1;
    
    /// Fixtures created outside of rigidbodies that colliders still hit
    pub const EXTERNAL: u16 = 1 << 2;
    
    /// Check if two fixtures should collide based on their layers and masks
    /// 
    /// # Arguments
    /// * `layer_a` - Fixture A's collision layer
    /// * `mask_a` - Fixture A's collision mask (what it collides with)
    /// * `layer_b` - Fixture B's collision layer
    /// * `mask_b` - Fixture B's collision mask (what it collides with)
    pub fn should_collide(layer_a: u16, mask_a: u16, layer_b: u16, mask_b: u16) -> bool {
        // A's layer must be in B's mask AND B's layer must be in A's mask
        (layer_a & mask_b) != 0 && (layer_b & mask_a) != 0
    }
    
    /// Helper to create a mask from multiple layers
    pub fn mask(layers: &[u16]) -> u16 {
        layers.iter().fold(0, |acc, &layer| acc | layer)
    }
}
