//! Static segment hierarchy with six externally driven joints.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::shape::{Material, Shape};

/// Parent-relative transform. Rotation is XYZ Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Local matrix: scale, then rotate (X·Y·Z), then translate.
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// Index of a node inside its [`RigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The segments whose transforms are written every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointName {
    Head,
    Torso,
    LeftEye,
    RightEye,
    LeftEyelid,
    RightEyelid,
}

impl JointName {
    pub const COUNT: usize = 6;

    pub const ALL: [JointName; JointName::COUNT] = [
        JointName::Head,
        JointName::Torso,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEyelid,
        JointName::RightEyelid,
    ];

    pub fn index(self) -> usize {
        match self {
            JointName::Head => 0,
            JointName::Torso => 1,
            JointName::LeftEye => 2,
            JointName::RightEye => 3,
            JointName::LeftEyelid => 4,
            JointName::RightEyelid => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JointName::Head => "head",
            JointName::Torso => "torso",
            JointName::LeftEye => "left-eye",
            JointName::RightEye => "right-eye",
            JointName::LeftEyelid => "left-eyelid",
            JointName::RightEyelid => "right-eyelid",
        }
    }
}

impl std::fmt::Display for JointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Non-owning reference to a joint's transform.
///
/// Only a [`RigTree`] hands these out, and only for registered joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle {
    joint: JointName,
    node: NodeId,
}

impl JointHandle {
    pub fn joint(&self) -> JointName {
        self.joint
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// One rigid segment. Nodes without a shape are pure grouping transforms.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub shape: Option<Shape>,
    pub material: Material,
    pub transform: Transform,
    pub parent: Option<NodeId>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RigError {
    #[error("node '{node}' refers to unknown parent #{parent}")]
    UnknownParent { node: String, parent: usize },

    #[error("joint {0} registered twice")]
    DuplicateJoint(JointName),

    #[error("joint {joint} refers to unknown node #{node}")]
    UnknownJointNode { joint: JointName, node: usize },

    #[error("invalid {kind} on node '{node}': {reason}")]
    InvalidShape {
        node: String,
        kind: &'static str,
        reason: &'static str,
    },

    #[error("rig has no nodes")]
    Empty,
}

/// Declarative description of a node to add.
#[derive(Debug, Clone)]
pub struct Part {
    shape: Option<Shape>,
    material: Material,
    transform: Transform,
}

impl Part {
    pub fn mesh(shape: Shape, material: Material) -> Self {
        Self {
            shape: Some(shape),
            material,
            transform: Transform::IDENTITY,
        }
    }

    pub fn group() -> Self {
        Self {
            shape: None,
            material: Material::default(),
            transform: Transform::IDENTITY,
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = Vec3::new(x, y, z);
        self
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.rotation = Vec3::new(x, y, z);
        self
    }

    pub fn scaled(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.scale = Vec3::new(x, y, z);
        self
    }

    pub fn uniform_scale(self, s: f32) -> Self {
        self.scaled(s, s, s)
    }
}

/// Collects nodes and joints; errors surface from [`RigBuilder::build`].
#[derive(Debug, Default)]
pub struct RigBuilder {
    nodes: Vec<Node>,
    joints: [Option<NodeId>; JointName::COUNT],
    error: Option<RigError>,
}

impl RigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node.
    pub fn root(&mut self, name: &str, part: Part) -> NodeId {
        self.push(name, part, None)
    }

    /// Add a node under `parent`.
    pub fn child(&mut self, parent: NodeId, name: &str, part: Part) -> NodeId {
        if parent.0 >= self.nodes.len() {
            self.fail(RigError::UnknownParent {
                node: name.to_string(),
                parent: parent.0,
            });
        }
        self.push(name, part, Some(parent))
    }

    /// Register `node` as the segment driven for `joint`.
    pub fn joint(&mut self, joint: JointName, node: NodeId) -> &mut Self {
        if node.0 >= self.nodes.len() {
            self.fail(RigError::UnknownJointNode {
                joint,
                node: node.0,
            });
        } else if self.joints[joint.index()].is_some() {
            self.fail(RigError::DuplicateJoint(joint));
        } else {
            self.joints[joint.index()] = Some(node);
        }
        self
    }

    pub fn build(self) -> Result<RigTree, RigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.nodes.is_empty() {
            return Err(RigError::Empty);
        }
        Ok(RigTree {
            nodes: self.nodes,
            joints: self.joints,
        })
    }

    fn push(&mut self, name: &str, part: Part, parent: Option<NodeId>) -> NodeId {
        if let Some(shape) = &part.shape {
            if let Err(reason) = shape.validate() {
                self.fail(RigError::InvalidShape {
                    node: name.to_string(),
                    kind: shape.kind(),
                    reason,
                });
            }
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            shape: part.shape,
            material: part.material,
            transform: part.transform,
            parent,
        });
        id
    }

    // First error wins; later ones are usually knock-on effects.
    fn fail(&mut self, error: RigError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// The built hierarchy.
///
/// Nodes are stored parent-before-child. Only joint transforms are writable.
#[derive(Debug, Clone)]
pub struct RigTree {
    nodes: Vec<Node>,
    joints: [Option<NodeId>; JointName::COUNT],
}

impl RigTree {
    pub fn builder() -> RigBuilder {
        RigBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// First node with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Handle for a joint, or `None` if this rig does not have it.
    pub fn joint(&self, joint: JointName) -> Option<JointHandle> {
        self.joints[joint.index()].map(|node| JointHandle { joint, node })
    }

    pub fn joint_count(&self) -> usize {
        self.joints.iter().filter(|j| j.is_some()).count()
    }

    /// Current transform of a joint. `None` if `handle` belongs to another rig.
    pub fn transform(&self, handle: JointHandle) -> Option<&Transform> {
        if !self.owns(handle) {
            return None;
        }
        self.nodes.get(handle.node.0).map(|n| &n.transform)
    }

    pub fn transform_mut(&mut self, handle: JointHandle) -> Option<&mut Transform> {
        if !self.owns(handle) {
            return None;
        }
        self.nodes.get_mut(handle.node.0).map(|n| &mut n.transform)
    }

    fn owns(&self, handle: JointHandle) -> bool {
        self.joints[handle.joint.index()] == Some(handle.node)
    }

    /// Model-to-world matrix for every node, indexed by [`NodeId::index`].
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world = Vec::with_capacity(self.nodes.len());
        self.write_world_matrices(&mut world);
        world
    }

    /// Same as [`RigTree::world_matrices`], reusing `out`'s allocation.
    pub fn write_world_matrices(&self, out: &mut Vec<Mat4>) {
        out.clear();
        for node in &self.nodes {
            let local = node.transform.matrix();
            let matrix = match node.parent {
                Some(parent) => out[parent.0] * local,
                None => local,
            };
            out.push(matrix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::shape::Material;

    fn small_rig() -> RigTree {
        let mut b = RigTree::builder();
        let root = b.root("root", Part::group().at(0.0, -1.0, 0.0));
        let body = b.child(
            root,
            "body",
            Part::mesh(Shape::cuboid(1.0, 1.0, 1.0), Material::default()).at(0.0, 0.5, 0.0),
        );
        let head = b.child(
            body,
            "head",
            Part::mesh(Shape::sphere(0.4, 16, 16), Material::default()).at(0.0, 1.0, 0.0),
        );
        b.joint(JointName::Torso, body).joint(JointName::Head, head);
        b.build().unwrap()
    }

    #[test]
    fn test_world_matrices_compose_parents() {
        let rig = small_rig();
        let world = rig.world_matrices();
        let head = rig.find("head").unwrap();
        let origin = world[head.index()].transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_joint_rotation_moves_children() {
        let mut rig = small_rig();
        let torso = rig.joint(JointName::Torso).unwrap();
        rig.transform_mut(torso).unwrap().rotation.z = std::f32::consts::FRAC_PI_2;

        let world = rig.world_matrices();
        let head = rig.find("head").unwrap();
        let origin = world[head.index()].transform_point3(Vec3::ZERO);
        // Head swings from above the body to its -X side
        assert!((origin - Vec3::new(-1.0, -0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_missing_joint_is_none() {
        let rig = small_rig();
        assert!(rig.joint(JointName::LeftEye).is_none());
        assert_eq!(rig.joint_count(), 2);
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut rig = small_rig();
        let full = crate::rig::RigPreset::Human.build().unwrap();

        // The small rig has no eyes; its head sits at a different index
        let eye = full.joint(JointName::LeftEye).unwrap();
        let head = full.joint(JointName::Head).unwrap();
        assert!(rig.transform(eye).is_none());
        assert!(rig.transform_mut(eye).is_none());
        assert!(rig.transform(head).is_none());

        let own = rig.joint(JointName::Head).unwrap();
        assert!(rig.transform(own).is_some());
    }

    #[test]
    fn test_duplicate_joint_rejected() {
        let mut b = RigTree::builder();
        let a = b.root("a", Part::group());
        let c = b.root("c", Part::group());
        b.joint(JointName::Head, a).joint(JointName::Head, c);
        assert_eq!(b.build().unwrap_err(), RigError::DuplicateJoint(JointName::Head));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut b = RigTree::builder();
        b.root("a", Part::group());
        b.child(NodeId(7), "orphan", Part::group());
        assert!(matches!(
            b.build(),
            Err(RigError::UnknownParent { parent: 7, .. })
        ));
    }

    #[test]
    fn test_invalid_shape_rejected() {
        let mut b = RigTree::builder();
        b.root("bad", Part::mesh(Shape::sphere(-1.0, 8, 8), Material::default()));
        let err = b.build().unwrap_err();
        assert!(matches!(err, RigError::InvalidShape { kind: "sphere", .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_empty_rig_rejected() {
        assert_eq!(RigTree::builder().build().unwrap_err(), RigError::Empty);
    }

    #[test]
    fn test_transform_matrix_applies_scale_before_translation() {
        let t = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::ZERO,
            scale: Vec3::new(2.0, 0.5, 1.0),
        };
        let p = t.matrix().transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!((p - Vec3::new(3.0, 0.5, 0.0)).length() < 1e-6);
    }
}
