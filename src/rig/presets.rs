//! Built-in character rigs.
//!
//! Both presets share one head. Pupils hang directly off the head (not off the
//! eye sockets) so the driver's eye targets are plain head-local positions.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::shape::{Color, Material, Shape};
use super::tree::{JointName, NodeId, Part, RigBuilder, RigError, RigTree};

const SKIN: u32 = 0xe2b69d;
const SKIN_LIGHT: u32 = 0xe8d0c0;
const SKIN_SHADOW: u32 = 0xd6a889;
const HAIR: u32 = 0x4a2513;
const SHIRT: u32 = 0x2563eb;
const SHIRT_TRIM: u32 = 0x1e40af;
const JEANS: u32 = 0x1e3a8a;
const POCKET: u32 = 0x172554;
const BELT: u32 = 0x854d0e;
const SHOE: u32 = 0x1e293b;
const NOSTRIL: u32 = 0x7f1d1d;
const LIPS: u32 = 0xbe185d;
const IRIS: u32 = 0x4b5563;
const BLUSH: u32 = 0xf8c4c4;

/// Eye socket centers on the head (x mirrored for the right eye).
pub const EYE_SOCKET_X: f32 = 0.12;
pub const EYE_SOCKET_Y: f32 = 0.05;
pub const EYE_SOCKET_Z: f32 = 0.32;
/// How far the pupil sits in front of the socket center.
pub const PUPIL_DEPTH: f32 = 0.05;
/// Eyelid scale on Y when the eye is open.
pub const EYELID_OPEN_SCALE: f32 = 0.1;

/// Which figure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RigPreset {
    /// Full standing figure; all six joints
    #[default]
    Human,
    /// Head only, enlarged; no torso joint
    Head,
}

impl RigPreset {
    pub fn all() -> &'static [RigPreset] {
        &[RigPreset::Human, RigPreset::Head]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RigPreset::Human => "Human",
            RigPreset::Head => "Head",
        }
    }

    pub fn build(&self) -> Result<RigTree, RigError> {
        match self {
            RigPreset::Human => build_human(),
            RigPreset::Head => build_head_only(),
        }
    }
}

impl std::fmt::Display for RigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RigPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "body" | "full" => Ok(RigPreset::Human),
            "head" => Ok(RigPreset::Head),
            _ => Err(format!("Unknown rig preset: {}. Valid: human, head", s)),
        }
    }
}

fn skin() -> Material {
    Material::hex(SKIN)
}

fn build_human() -> Result<RigTree, RigError> {
    let mut b = RigTree::builder();

    let figure = b.root("figure", Part::group().at(0.0, -1.5, 0.0));
    let torso = b.child(figure, "torso", Part::group());
    b.joint(JointName::Torso, torso);

    // Upper body: t-shirt
    let shirt = b.child(
        torso,
        "shirt",
        Part::mesh(Shape::capsule(0.5, 1.0, 16, 16), Material::hex(SHIRT)).at(0.0, 0.7, 0.0),
    );
    b.child(
        shirt,
        "shirt-collar",
        Part::mesh(Shape::ring(0.2, 0.25, 16), Material::hex(SHIRT_TRIM)).at(0.0, 0.6, 0.2),
    );
    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        b.child(
            shirt,
            &format!("{}-sleeve", side),
            Part::mesh(Shape::cylinder(0.15, 0.18, 0.3, 16), Material::hex(SHIRT))
                .at(0.55 * x, 0.3, 0.0)
                .rotated(0.0, 0.0, x * PI / 4.0),
        );
    }

    // Lower body: jeans
    let jeans = b.child(
        torso,
        "jeans",
        Part::mesh(Shape::capsule(0.45, 0.8, 16, 16), Material::hex(JEANS)).at(0.0, -0.6, 0.0),
    );
    // Tilted flat so the ring circles the waist
    b.child(
        jeans,
        "belt",
        Part::mesh(Shape::torus(0.47, 0.05, 16, 32), Material::hex(BELT))
            .at(0.0, 0.5, 0.0)
            .rotated(PI / 2.0, 0.0, 0.0),
    );
    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        b.child(
            jeans,
            &format!("{}-pocket", side),
            Part::mesh(Shape::cuboid(0.15, 0.2, 0.01), Material::hex(POCKET))
                .at(0.3 * x, 0.2, 0.4)
                .rotated(0.2, 0.0, 0.0),
        );
    }

    // Arms with hands
    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        let arm = b.child(
            torso,
            &format!("{}-arm", side),
            Part::mesh(Shape::capsule(0.15, 0.7, 16, 16), skin())
                .at(0.7 * x, 0.7, 0.0)
                .rotated(0.0, 0.0, x * PI / 16.0),
        );
        b.child(
            arm,
            &format!("{}-hand", side),
            Part::mesh(Shape::sphere(0.15, 16, 16), skin()).at(0.0, -0.5, 0.0),
        );
    }

    // Legs with shoes
    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        let leg = b.child(
            torso,
            &format!("{}-leg", side),
            Part::mesh(Shape::capsule(0.18, 0.9, 16, 16), Material::hex(JEANS))
                .at(0.25 * x, -1.5, 0.0),
        );
        b.child(
            leg,
            &format!("{}-shoe", side),
            Part::mesh(Shape::cuboid(0.2, 0.1, 0.3), Material::hex(SHOE)).at(0.0, -0.6, 0.1),
        );
    }

    b.child(
        torso,
        "neck",
        Part::mesh(Shape::cylinder(0.15, 0.2, 0.3, 16), skin()).at(0.0, 1.3, 0.0),
    );

    add_head(&mut b, torso, Part::mesh(Shape::sphere(0.4, 32, 32), skin()).at(0.0, 1.8, 0.0));

    b.build()
}

fn build_head_only() -> Result<RigTree, RigError> {
    let mut b = RigTree::builder();
    let stage = b.root("stage", Part::group().uniform_scale(2.5));
    add_head(&mut b, stage, Part::mesh(Shape::sphere(0.4, 32, 32), skin()));
    b.build()
}

/// Head with face features; registers the head, eye and eyelid joints.
fn add_head(b: &mut RigBuilder, parent: NodeId, head_part: Part) -> NodeId {
    let head = b.child(parent, "head", head_part);
    b.joint(JointName::Head, head);

    b.child(
        head,
        "hair",
        Part::mesh(
            Shape::sphere_section(0.42, 32, 32, 0.0, PI * 2.0, 0.0, PI * 0.5),
            Material::hex(HAIR),
        )
        .at(0.0, 0.15, 0.0)
        .rotated(0.2, 0.0, 0.0),
    );

    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        let ear = b.child(
            head,
            &format!("{}-ear", side),
            Part::mesh(Shape::sphere(0.08, 16, 8), skin()).at(0.4 * x, 0.0, 0.0),
        );
        b.child(
            ear,
            &format!("{}-inner-ear", side),
            Part::mesh(Shape::sphere(0.05, 16, 8), Material::hex(SKIN_SHADOW))
                .at(0.02 * x, 0.0, 0.0)
                .uniform_scale(0.7),
        );
    }

    b.child(
        head,
        "face",
        Part::mesh(
            Shape::sphere_section(0.35, 32, 32, 0.0, PI, 0.0, PI * 0.7),
            Material::hex(SKIN_LIGHT),
        )
        .at(0.0, 0.0, 0.15),
    );

    add_eye(b, head, "left", -1.0, JointName::LeftEye, JointName::LeftEyelid);
    add_eye(b, head, "right", 1.0, JointName::RightEye, JointName::RightEyelid);

    let nose = b.child(
        head,
        "nose",
        Part::mesh(Shape::cone(0.07, 0.15, 16), Material::hex(SKIN_LIGHT)).at(0.0, -0.05, 0.4),
    );
    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        b.child(
            nose,
            &format!("{}-nostril", side),
            Part::mesh(Shape::sphere(0.02, 8, 8), Material::hex(NOSTRIL))
                .at(0.03 * x, -0.05, 0.0)
                .rotated(0.0, 0.0, -x * PI / 4.0),
        );
    }

    let mouth = b.child(
        head,
        "mouth",
        Part::mesh(Shape::cuboid(0.15, 0.03, 0.06), Material::hex(LIPS)).at(0.0, -0.15, 0.35),
    );
    b.child(
        mouth,
        "lower-lip",
        Part::mesh(Shape::cuboid(0.15, 0.02, 0.05), Material::hex(LIPS)).at(0.0, -0.025, 0.0),
    );

    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        b.child(
            head,
            &format!("{}-eyebrow", side),
            Part::mesh(Shape::cuboid(0.08, 0.02, 0.01), Material::hex(HAIR))
                .at(0.12 * x, 0.15, 0.35)
                .rotated(0.0, 0.0, -x * PI / 8.0),
        );
    }

    for (side, x) in [("left", -1.0f32), ("right", 1.0)] {
        b.child(
            head,
            &format!("{}-cheek", side),
            Part::mesh(Shape::sphere(0.08, 16, 16), Material::hex(BLUSH).translucent(0.3))
                .at(0.2 * x, -0.1, 0.28)
                .rotated(0.0, -x * PI / 4.0, 0.0),
        );
    }

    head
}

fn add_eye(
    b: &mut RigBuilder,
    head: NodeId,
    side: &str,
    x: f32,
    eye: JointName,
    eyelid: JointName,
) {
    let socket = b.child(
        head,
        &format!("{}-eye-socket", side),
        Part::mesh(Shape::sphere(0.07, 16, 16), Material::hex(0xffffff))
            .at(EYE_SOCKET_X * x, EYE_SOCKET_Y, EYE_SOCKET_Z),
    );

    let lid = b.child(
        socket,
        &format!("{}-eyelid", side),
        Part::mesh(Shape::sphere(0.07, 16, 16), skin())
            .at(0.0, 0.03, 0.07)
            .scaled(1.0, EYELID_OPEN_SCALE, 1.0),
    );
    b.joint(eyelid, lid);

    let pupil = b.child(
        head,
        &format!("{}-pupil", side),
        Part::mesh(
            Shape::sphere(0.03, 16, 16),
            Material::solid(Color::BLACK).glowing(Color::BLACK, 0.5),
        )
        .at(EYE_SOCKET_X * x, EYE_SOCKET_Y, EYE_SOCKET_Z + PUPIL_DEPTH),
    );
    b.joint(eye, pupil);

    b.child(
        pupil,
        &format!("{}-iris", side),
        Part::mesh(
            Shape::ring(0.01, 0.02, 16),
            Material::hex(IRIS).glowing(Color::hex(IRIS), 0.3),
        )
        .at(0.0, 0.0, 0.005)
        .uniform_scale(1.3),
    );
}
