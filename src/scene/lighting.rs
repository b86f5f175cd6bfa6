//! Scene lights.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::rig::Color;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Cone light aimed at `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Half-angle of the cone (radians)
    pub angle: f32,
    /// Fraction of the cone that fades out toward the edge, in [0, 1]
    pub penumbra: f32,
}

impl SpotLight {
    /// Cosines of the inner (full intensity) and outer (zero) cone edges.
    pub fn cone_cosines(&self) -> (f32, f32) {
        let outer = self.angle.clamp(0.0, std::f32::consts::FRAC_PI_2);
        let inner = outer * (1.0 - self.penumbra.clamp(0.0, 1.0));
        (inner.cos(), outer.cos())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
}

/// Light rig: one ambient, one spot and one point light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: AmbientLight,
    pub spot: SpotLight,
    pub point: PointLight,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: Color::WHITE,
                intensity: 0.5,
            },
            spot: SpotLight {
                position: Vec3::new(10.0, 10.0, 10.0),
                target: Vec3::ZERO,
                color: Color::WHITE,
                intensity: 1.0,
                angle: 0.15,
                penumbra: 1.0,
            },
            point: PointLight {
                position: Vec3::new(-10.0, -10.0, -10.0),
                color: Color::WHITE,
                intensity: 1.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lights() {
        let lights = LightingConfig::default();
        assert_eq!(lights.ambient.intensity, 0.5);
        assert_eq!(lights.spot.position, Vec3::splat(10.0));
        assert_eq!(lights.point.position, Vec3::splat(-10.0));
    }

    #[test]
    fn test_full_penumbra_fades_from_center() {
        let lights = LightingConfig::default();
        let (inner, outer) = lights.spot.cone_cosines();
        assert_eq!(inner, 1.0);
        assert!((outer - 0.15f32.cos()).abs() < 1e-6);
    }
}
