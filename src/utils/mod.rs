//! Shared numerical utilities for the encoder core
pub mod types;
pub mod math;

// Re-export commonly used utilities
pub use types::*;
pub use math::*;
