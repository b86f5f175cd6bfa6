//! Rendering - tessellation and the wgpu draw loop

pub mod mesh;
mod renderer;

pub use mesh::{tessellate, MeshData, MeshVertex, RigMeshes};
pub use renderer::{FrameStatus, Renderer};
