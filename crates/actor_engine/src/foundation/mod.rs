//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Sequence generators for actor ids and component keys
//! - Frame clock for the fixed-step loop
//! - Logging utilities

pub mod math;
pub mod sequence;
pub mod time;
pub mod logging;
