//! Math utilities and types
//!
//! Provides the positional types consumed by the spatial audio model.
//! Geometry beyond this (bounding boxes, segments) belongs to the host
//! framework, which hands us plain vectors.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;
