//! Primitive solids and surface materials for rig segments.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Primitive solid with explicit dimensions.
///
/// Axis conventions: capsules, cylinders and cones stand along +Y; tori and
/// rings lie in the XY plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
        /// Horizontal sweep start and length (radians)
        phi_start: f32,
        phi_length: f32,
        /// Vertical sweep start and length (radians), 0 = north pole
        theta_start: f32,
        theta_length: f32,
    },
    Capsule {
        radius: f32,
        /// Length of the straight middle section
        length: f32,
        cap_segments: u32,
        radial_segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cone {
        radius: f32,
        height: f32,
        radial_segments: u32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        theta_segments: u32,
    },
}

impl Shape {
    /// Full sphere.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Shape::Sphere {
            radius,
            width_segments,
            height_segments,
            phi_start: 0.0,
            phi_length: PI * 2.0,
            theta_start: 0.0,
            theta_length: PI,
        }
    }

    /// Partial spherical shell.
    pub fn sphere_section(
        radius: f32,
        width_segments: u32,
        height_segments: u32,
        phi_start: f32,
        phi_length: f32,
        theta_start: f32,
        theta_length: f32,
    ) -> Self {
        Shape::Sphere {
            radius,
            width_segments,
            height_segments,
            phi_start,
            phi_length,
            theta_start,
            theta_length,
        }
    }

    pub fn capsule(radius: f32, length: f32, cap_segments: u32, radial_segments: u32) -> Self {
        Shape::Capsule {
            radius,
            length,
            cap_segments,
            radial_segments,
        }
    }

    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Self {
        Shape::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
        }
    }

    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Shape::Box {
            width,
            height,
            depth,
        }
    }

    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Self {
        Shape::Cone {
            radius,
            height,
            radial_segments,
        }
    }

    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        Shape::Torus {
            radius,
            tube,
            radial_segments,
            tubular_segments,
        }
    }

    pub fn ring(inner_radius: f32, outer_radius: f32, theta_segments: u32) -> Self {
        Shape::Ring {
            inner_radius,
            outer_radius,
            theta_segments,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Sphere { .. } => "sphere",
            Shape::Capsule { .. } => "capsule",
            Shape::Cylinder { .. } => "cylinder",
            Shape::Box { .. } => "box",
            Shape::Cone { .. } => "cone",
            Shape::Torus { .. } => "torus",
            Shape::Ring { .. } => "ring",
        }
    }

    /// Check that dimensions can be tessellated.
    pub fn validate(&self) -> Result<(), &'static str> {
        fn positive(v: f32) -> bool {
            v.is_finite() && v > 0.0
        }
        fn non_negative(v: f32) -> bool {
            v.is_finite() && v >= 0.0
        }

        match *self {
            Shape::Sphere {
                radius,
                width_segments,
                height_segments,
                phi_length,
                theta_length,
                ..
            } => {
                if !positive(radius) {
                    return Err("sphere radius must be positive");
                }
                if width_segments < 3 || height_segments < 2 {
                    return Err("sphere needs at least 3x2 segments");
                }
                if !positive(phi_length) || !positive(theta_length) {
                    return Err("sphere sweep must be positive");
                }
            }
            Shape::Capsule {
                radius,
                length,
                cap_segments,
                radial_segments,
            } => {
                if !positive(radius) || !non_negative(length) {
                    return Err("capsule needs positive radius and non-negative length");
                }
                if cap_segments < 1 || radial_segments < 3 {
                    return Err("capsule needs at least 1 cap and 3 radial segments");
                }
            }
            Shape::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => {
                if !non_negative(radius_top) || !non_negative(radius_bottom) {
                    return Err("cylinder radii must be non-negative");
                }
                if radius_top == 0.0 && radius_bottom == 0.0 {
                    return Err("cylinder needs one non-zero radius");
                }
                if !positive(height) || radial_segments < 3 {
                    return Err("cylinder needs positive height and 3 radial segments");
                }
            }
            Shape::Box {
                width,
                height,
                depth,
            } => {
                if !positive(width) || !positive(height) || !positive(depth) {
                    return Err("box dimensions must be positive");
                }
            }
            Shape::Cone {
                radius,
                height,
                radial_segments,
            } => {
                if !positive(radius) || !positive(height) || radial_segments < 3 {
                    return Err("cone needs positive radius, height and 3 radial segments");
                }
            }
            Shape::Torus {
                radius,
                tube,
                radial_segments,
                tubular_segments,
            } => {
                if !positive(radius) || !positive(tube) {
                    return Err("torus radii must be positive");
                }
                if radial_segments < 3 || tubular_segments < 3 {
                    return Err("torus needs at least 3 segments each way");
                }
            }
            Shape::Ring {
                inner_radius,
                outer_radius,
                theta_segments,
            } => {
                if !non_negative(inner_radius) || outer_radius <= inner_radius {
                    return Err("ring outer radius must exceed inner radius");
                }
                if theta_segments < 3 {
                    return Err("ring needs at least 3 segments");
                }
            }
        }
        Ok(())
    }
}

/// sRGB color with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From a `0xRRGGBB` literal.
    pub fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as f32 / 255.0,
            g: ((value >> 8) & 0xff) as f32 / 255.0,
            b: (value & 0xff) as f32 / 255.0,
        }
    }

    /// Convert to linear light for shading.
    pub fn to_linear(self) -> [f32; 3] {
        fn channel(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

/// Self-illumination added on top of lit color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emissive {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Color,
    /// `Some(alpha)` for translucent surfaces
    pub opacity: Option<f32>,
    pub emissive: Option<Emissive>,
}

impl Default for Material {
    fn default() -> Self {
        Self::solid(Color::WHITE)
    }
}

impl Material {
    pub const fn solid(color: Color) -> Self {
        Self {
            color,
            opacity: None,
            emissive: None,
        }
    }

    pub fn hex(value: u32) -> Self {
        Self::solid(Color::hex(value))
    }

    pub fn translucent(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity.clamp(0.0, 1.0));
        self
    }

    pub fn glowing(mut self, color: Color, intensity: f32) -> Self {
        self.emissive = Some(Emissive { color, intensity });
        self
    }

    pub fn alpha(&self) -> f32 {
        self.opacity.unwrap_or(1.0)
    }

    pub fn is_translucent(&self) -> bool {
        self.alpha() < 1.0
    }
}
