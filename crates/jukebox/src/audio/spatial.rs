//! Spatial audio model
//!
//! Distance-based attenuation and stereo placement for positioned sounds.
//! The listener sits at the origin of the plane; hosts hand us positions
//! already expressed in listener-relative coordinates.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;

/// Configuration for spatial audio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Maximum audible distance from the listener
    pub max_distance: f32,
    /// Reference distance for attenuation (no falloff inside it)
    pub reference_distance: f32,
    /// Falloff exponent (1.0 = linear, 2.0 = inverse square)
    pub rolloff: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            max_distance: 1000.0,
            reference_distance: 1.0,
            rolloff: 1.0,
        }
    }
}

impl SpatialConfig {
    /// Snapshot the falloff parameters for a panner node
    pub fn panner_params(&self) -> PannerParams {
        PannerParams {
            reference_distance: self.reference_distance,
            max_distance: self.max_distance,
            rolloff: self.rolloff,
        }
    }
}

/// Falloff parameters fixed into a panner at creation time
///
/// Changing the jukebox-wide [`SpatialConfig`] afterwards affects newly
/// created panners only, never ones already wired into a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PannerParams {
    /// Distance with no attenuation
    pub reference_distance: f32,
    /// Distance past which the sound is inaudible
    pub max_distance: f32,
    /// Falloff exponent
    pub rolloff: f32,
}

impl PannerParams {
    /// Calculate the attenuation factor for a source at the given distance
    pub fn attenuation(&self, distance: f32) -> f32 {
        if distance > self.max_distance {
            return 0.0;
        }
        if distance <= self.reference_distance {
            return 1.0;
        }

        let normalized = (distance - self.reference_distance)
            / (self.max_distance - self.reference_distance);

        (1.0 - normalized.powf(self.rolloff)).max(0.0)
    }

    /// Per-channel amplitudes for a source at `position`
    ///
    /// Equal-power panning on the x axis combined with distance attenuation.
    /// A source at the origin is centered and unattenuated.
    pub fn stereo_gains(&self, position: Vec2) -> (f32, f32) {
        let distance = position.norm();
        let attenuation = self.attenuation(distance);

        let pan = if distance > f32::EPSILON {
            (position.x / distance).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
        (attenuation * angle.cos(), attenuation * angle.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> PannerParams {
        SpatialConfig {
            max_distance: 1000.0,
            reference_distance: 100.0,
            rolloff: 1.0,
        }
        .panner_params()
    }

    #[test]
    fn test_attenuation_at_reference_distance() {
        assert_eq!(params().attenuation(100.0), 1.0);
    }

    #[test]
    fn test_attenuation_beyond_max_distance() {
        assert_eq!(params().attenuation(2000.0), 0.0);
    }

    #[test]
    fn test_attenuation_halfway() {
        assert_relative_eq!(params().attenuation(550.0), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_centered_source_is_equal_power() {
        let (l, r) = params().stereo_gains(Vec2::new(0.0, 0.0));
        assert_relative_eq!(l, r, epsilon = 1e-6);
        assert_relative_eq!(l * l + r * r, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_hard_left_source() {
        let (l, r) = params().stereo_gains(Vec2::new(-50.0, 0.0));
        assert_relative_eq!(l, 1.0, epsilon = 1e-5);
        assert_relative_eq!(r, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_distant_source_is_quieter() {
        let near = params().stereo_gains(Vec2::new(0.0, 150.0));
        let far = params().stereo_gains(Vec2::new(0.0, 800.0));
        assert!(far.0 < near.0);
        assert!(far.1 < near.1);
    }
}
