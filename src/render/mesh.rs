//! CPU-side tessellation of rig primitives.
//!
//! Every shape becomes an indexed triangle list with counter-clockwise front
//! faces and unit normals. Tessellation happens once at mount; only instance
//! data changes per frame.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::ops::Range;

use glam::Vec3;

use crate::rig::{Material, NodeId, RigTree, Shape};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.normalize_or_zero().to_array(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(lo, hi), v| {
                let p = Vec3::from_array(v.position);
                (lo.min(p), hi.max(p))
            },
        )
    }

    fn push(&mut self, position: Vec3, normal: Vec3) -> u32 {
        self.vertices.push(MeshVertex::new(position, normal));
        (self.vertices.len() - 1) as u32
    }

    fn quad_grid(&mut self, first: u32, rows: u32, columns: u32) {
        // Rows of `columns + 1` vertices, a = (row, col + 1) winding
        let stride = columns + 1;
        for row in 0..rows {
            for col in 0..columns {
                let a = first + row * stride + col;
                let b = first + (row + 1) * stride + col;
                let c = first + (row + 1) * stride + col + 1;
                let d = first + row * stride + col + 1;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }
}

/// Triangulate one primitive in its local frame.
pub fn tessellate(shape: &Shape) -> MeshData {
    match *shape {
        Shape::Sphere {
            radius,
            width_segments,
            height_segments,
            phi_start,
            phi_length,
            theta_start,
            theta_length,
        } => sphere(
            radius,
            width_segments,
            height_segments,
            phi_start..phi_start + phi_length,
            theta_start..theta_start + theta_length,
        ),
        Shape::Capsule {
            radius,
            length,
            cap_segments,
            radial_segments,
        } => capsule(radius, length, cap_segments, radial_segments),
        Shape::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
        } => cylinder(radius_top, radius_bottom, height, radial_segments),
        Shape::Cone {
            radius,
            height,
            radial_segments,
        } => cylinder(0.0, radius, height, radial_segments),
        Shape::Box {
            width,
            height,
            depth,
        } => cuboid(Vec3::new(width, height, depth) * 0.5),
        Shape::Torus {
            radius,
            tube,
            radial_segments,
            tubular_segments,
        } => torus(radius, tube, radial_segments, tubular_segments),
        Shape::Ring {
            inner_radius,
            outer_radius,
            theta_segments,
        } => ring(inner_radius, outer_radius, theta_segments),
    }
}

fn sphere(radius: f32, ws: u32, hs: u32, phi: Range<f32>, theta: Range<f32>) -> MeshData {
    let mut mesh = MeshData::default();
    for iy in 0..=hs {
        let t = theta.start + (theta.end - theta.start) * iy as f32 / hs as f32;
        for ix in 0..=ws {
            let p = phi.start + (phi.end - phi.start) * ix as f32 / ws as f32;
            let dir = Vec3::new(-p.cos() * t.sin(), t.cos(), p.sin() * t.sin());
            mesh.push(dir * radius, dir);
        }
    }

    let stride = ws + 1;
    let closed_top = theta.start <= 0.0;
    let closed_bottom = theta.end >= PI;
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * stride + ix + 1;
            let b = iy * stride + ix;
            let c = (iy + 1) * stride + ix;
            let d = (iy + 1) * stride + ix + 1;
            // Skip the degenerate triangle at each closed pole
            if iy != 0 || !closed_top {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 || !closed_bottom {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

/// Revolve a profile around +Y. Rows are `(radius, y, normal_radial, normal_y)`
/// ordered top to bottom.
fn lathe(profile: &[(f32, f32, f32, f32)], segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for &(r, y, nr, ny) in profile {
        for i in 0..=segments {
            let (sin, cos) = (TAU * i as f32 / segments as f32).sin_cos();
            mesh.push(
                Vec3::new(r * sin, y, r * cos),
                Vec3::new(nr * sin, ny, nr * cos),
            );
        }
    }
    mesh.quad_grid(0, profile.len() as u32 - 1, segments);
    mesh
}

fn capsule(radius: f32, length: f32, cap_segments: u32, radial_segments: u32) -> MeshData {
    let half = length * 0.5;
    let mut profile = Vec::with_capacity(2 * (cap_segments as usize + 1));
    for i in 0..=cap_segments {
        let a = FRAC_PI_2 * (1.0 - i as f32 / cap_segments as f32);
        profile.push((radius * a.cos(), half + radius * a.sin(), a.cos(), a.sin()));
    }
    for i in 0..=cap_segments {
        let a = -FRAC_PI_2 * i as f32 / cap_segments as f32;
        profile.push((radius * a.cos(), -half + radius * a.sin(), a.cos(), a.sin()));
    }
    lathe(&profile, radial_segments)
}

fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> MeshData {
    let half = height * 0.5;
    let slope = (radius_bottom - radius_top) / height;
    let mut mesh = lathe(
        &[(radius_top, half, 1.0, slope), (radius_bottom, -half, 1.0, slope)],
        segments,
    );

    for (radius, y, normal) in [(radius_top, half, Vec3::Y), (radius_bottom, -half, Vec3::NEG_Y)] {
        if radius <= 0.0 {
            continue;
        }
        let center = mesh.push(Vec3::new(0.0, y, 0.0), normal);
        let first = mesh.vertices.len() as u32;
        for i in 0..=segments {
            let (sin, cos) = (TAU * i as f32 / segments as f32).sin_cos();
            mesh.push(Vec3::new(radius * sin, y, radius * cos), normal);
        }
        for i in 0..segments {
            let (p, q) = (first + i, first + i + 1);
            if normal.y > 0.0 {
                mesh.indices.extend_from_slice(&[center, p, q]);
            } else {
                mesh.indices.extend_from_slice(&[center, q, p]);
            }
        }
    }
    mesh
}

fn cuboid(half: Vec3) -> MeshData {
    // (normal, u, v) with u × v = normal
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = MeshData::default();
    for (n, u, v) in FACES {
        let first = mesh.vertices.len() as u32;
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.push((n + u * su + v * sv) * half, n);
        }
        mesh.indices
            .extend_from_slice(&[first, first + 1, first + 2, first, first + 2, first + 3]);
    }
    mesh
}

fn torus(radius: f32, tube: f32, radial: u32, tubular: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for j in 0..=radial {
        let v = TAU * j as f32 / radial as f32;
        for i in 0..=tubular {
            let u = TAU * i as f32 / tubular as f32;
            let ring = radius + tube * v.cos();
            let position = Vec3::new(ring * u.cos(), ring * u.sin(), tube * v.sin());
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            mesh.push(position, position - center);
        }
    }

    let stride = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

fn ring(inner: f32, outer: f32, segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for radius in [inner, outer] {
        for i in 0..=segments {
            let (sin, cos) = (TAU * i as f32 / segments as f32).sin_cos();
            mesh.push(Vec3::new(radius * cos, radius * sin, 0.0), Vec3::Z);
        }
    }
    let stride = segments + 1;
    for i in 0..segments {
        let (a, b, c, d) = (i, i + stride, i + stride + 1, i + 1);
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }
    mesh
}

/// One node's slice of the shared buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRange {
    pub node: NodeId,
    pub indices: Range<u32>,
    pub base_vertex: i32,
    pub material: Material,
}

impl DrawRange {
    pub fn is_translucent(&self) -> bool {
        self.material.is_translucent()
    }
}

/// All rig geometry packed into one vertex and one index buffer.
#[derive(Debug, Clone, Default)]
pub struct RigMeshes {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub draws: Vec<DrawRange>,
}

impl RigMeshes {
    pub fn build(rig: &RigTree) -> Self {
        let mut out = Self::default();
        for (id, node) in rig.nodes() {
            let Some(shape) = &node.shape else {
                continue;
            };
            let mesh = tessellate(shape);
            let start = out.indices.len() as u32;
            out.draws.push(DrawRange {
                node: id,
                indices: start..start + mesh.indices.len() as u32,
                base_vertex: out.vertices.len() as i32,
                material: node.material,
            });
            out.vertices.extend(mesh.vertices);
            out.indices.extend(mesh.indices);
        }
        log::debug!(
            "tessellated {} meshes: {} vertices, {} triangles",
            out.draws.len(),
            out.vertices.len(),
            out.indices.len() / 3
        );
        out
    }

    pub fn opaque(&self) -> impl Iterator<Item = &DrawRange> {
        self.draws.iter().filter(|d| !d.is_translucent())
    }

    pub fn translucent(&self) -> impl Iterator<Item = &DrawRange> {
        self.draws.iter().filter(|d| d.is_translucent())
    }
}
