//! The character rig: a static tree of rigid primitives.
//!
//! Construction is declarative and happens once per scene. Afterwards only the
//! six joint transforms change, and only through [`JointHandle`]s.

mod presets;
mod shape;
mod tree;

pub use presets::{
    RigPreset, EYELID_OPEN_SCALE, EYE_SOCKET_X, EYE_SOCKET_Y, EYE_SOCKET_Z, PUPIL_DEPTH,
};
pub use shape::{Color, Emissive, Material, Shape};
pub use tree::{
    JointHandle, JointName, Node, NodeId, Part, RigBuilder, RigError, RigTree, Transform,
};
