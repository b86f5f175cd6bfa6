//! Per-frame joint animation.
//!
//! Each frame the driver computes a target pose from the pointer and blink
//! snapshot, then moves every joint a fixed fraction of the way there.

use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::smoothing::{approach, frame_rate_factor};
use crate::input::PointerState;
use crate::rig::{JointName, RigTree, EYELID_OPEN_SCALE, EYE_SOCKET_X, EYE_SOCKET_Y};

/// Yaw/pitch response of a rotating joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTuning {
    /// Rotation about Y at `pointer.x = ±1` (radians)
    pub yaw_amplitude: f32,
    /// Rotation about X at `pointer.y = ±1` (radians)
    pub pitch_amplitude: f32,
    /// Per-frame smoothing factor
    pub factor: f32,
}

impl RotationTuning {
    /// `(pitch, yaw)` target for a pointer position.
    pub fn target(&self, pointer: Vec2) -> Vec2 {
        Vec2::new(pointer.y * self.pitch_amplitude, pointer.x * self.yaw_amplitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadTuning {
    pub yaw_amplitude: f32,
    pub pitch_amplitude: f32,
    pub factor: f32,
}

impl Default for HeadTuning {
    fn default() -> Self {
        Self {
            yaw_amplitude: PI / 8.0,
            pitch_amplitude: PI / 10.0,
            factor: 0.05,
        }
    }
}

impl From<HeadTuning> for RotationTuning {
    fn from(t: HeadTuning) -> Self {
        Self {
            yaw_amplitude: t.yaw_amplitude,
            pitch_amplitude: t.pitch_amplitude,
            factor: t.factor,
        }
    }
}

/// Same fields as [`HeadTuning`], with the torso's slower, smaller response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorsoTuning {
    pub yaw_amplitude: f32,
    pub pitch_amplitude: f32,
    pub factor: f32,
}

impl Default for TorsoTuning {
    fn default() -> Self {
        Self {
            yaw_amplitude: PI / 16.0,
            pitch_amplitude: PI / 20.0,
            factor: 0.02,
        }
    }
}

impl From<TorsoTuning> for RotationTuning {
    fn from(t: TorsoTuning) -> Self {
        Self {
            yaw_amplitude: t.yaw_amplitude,
            pitch_amplitude: t.pitch_amplitude,
            factor: t.factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeTuning {
    /// Horizontal distance of each pupil from the head's center line
    pub offset_x: f32,
    /// Pupil height at rest
    pub base_y: f32,
    /// Pupil travel at `pointer = ±1`
    pub travel: f32,
    pub factor: f32,
}

impl Default for EyeTuning {
    fn default() -> Self {
        Self {
            offset_x: EYE_SOCKET_X,
            base_y: EYE_SOCKET_Y,
            travel: 0.02,
            factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyelidTuning {
    /// Y scale while blinking
    pub closed_scale: f32,
    /// Y scale at rest
    pub open_scale: f32,
    pub closing_factor: f32,
    pub opening_factor: f32,
}

impl Default for EyelidTuning {
    fn default() -> Self {
        Self {
            closed_scale: 1.0,
            open_scale: EYELID_OPEN_SCALE,
            closing_factor: 0.4,
            opening_factor: 0.2,
        }
    }
}

/// Amplitudes and smoothing factors for every driven joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub head: HeadTuning,
    pub torso: TorsoTuning,
    pub eyes: EyeTuning,
    pub eyelids: EyelidTuning,
    /// Rescale factors by frame time instead of applying them once per frame
    pub frame_rate_independent: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            head: HeadTuning::default(),
            torso: TorsoTuning::default(),
            eyes: EyeTuning::default(),
            eyelids: EyelidTuning::default(),
            frame_rate_independent: false,
        }
    }
}

/// Snapshot of the inputs for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    pub pointer: PointerState,
    pub blinking: bool,
}

/// Instantaneous target pose. Rotations are `(x, y)` = (pitch, yaw).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTargets {
    pub head_rotation: Vec2,
    pub torso_rotation: Vec2,
    pub left_eye: Vec2,
    pub right_eye: Vec2,
    pub eyelid_scale_y: f32,
    pub eyelid_factor: f32,
}

/// Target pose for `input`. Pure; depends on nothing else.
pub fn targets(config: &AnimationConfig, input: FrameInput) -> JointTargets {
    let p = Vec2::new(input.pointer.x, input.pointer.y);

    let eyes = &config.eyes;
    let gaze = Vec2::new(p.x * eyes.travel, eyes.base_y + p.y * eyes.travel);

    let lids = &config.eyelids;
    let (eyelid_scale_y, eyelid_factor) = if input.blinking {
        (lids.closed_scale, lids.closing_factor)
    } else {
        (lids.open_scale, lids.opening_factor)
    };

    JointTargets {
        head_rotation: RotationTuning::from(config.head).target(p),
        torso_rotation: RotationTuning::from(config.torso).target(p),
        left_eye: Vec2::new(-eyes.offset_x, 0.0) + gaze,
        right_eye: Vec2::new(eyes.offset_x, 0.0) + gaze,
        eyelid_scale_y,
        eyelid_factor,
    }
}

pub struct AnimationDriver {
    config: AnimationConfig,
    /// Joints found missing on the last frame, to log only on change
    missing: [bool; JointName::COUNT],
    frames: u64,
}

impl AnimationDriver {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            missing: [false; JointName::COUNT],
            frames: 0,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Move every joint one smoothing step toward its target.
    ///
    /// `dt` is only used in frame-rate-independent mode. Joints the rig does
    /// not have are skipped.
    pub fn update(&mut self, input: FrameInput, dt: f32, rig: &mut RigTree) {
        let t = targets(&self.config, input);
        let scale = |f: f32| {
            if self.config.frame_rate_independent {
                frame_rate_factor(f, dt)
            } else {
                f
            }
        };
        let head_f = scale(self.config.head.factor);
        let torso_f = scale(self.config.torso.factor);
        let eye_f = scale(self.config.eyes.factor);
        let lid_f = scale(t.eyelid_factor);

        for joint in JointName::ALL {
            let Some(handle) = rig.joint(joint) else {
                self.note_missing(joint, true);
                continue;
            };
            self.note_missing(joint, false);

            let Some(transform) = rig.transform_mut(handle) else {
                continue;
            };
            match joint {
                JointName::Head | JointName::Torso => {
                    let (target, f) = if joint == JointName::Head {
                        (t.head_rotation, head_f)
                    } else {
                        (t.torso_rotation, torso_f)
                    };
                    transform.rotation.x = approach(transform.rotation.x, target.x, f);
                    transform.rotation.y = approach(transform.rotation.y, target.y, f);
                }
                JointName::LeftEye | JointName::RightEye => {
                    let target = if joint == JointName::LeftEye {
                        t.left_eye
                    } else {
                        t.right_eye
                    };
                    transform.position.x = approach(transform.position.x, target.x, eye_f);
                    transform.position.y = approach(transform.position.y, target.y, eye_f);
                }
                JointName::LeftEyelid | JointName::RightEyelid => {
                    transform.scale.y = approach(transform.scale.y, t.eyelid_scale_y, lid_f);
                }
            }
        }
        self.frames += 1;
    }

    fn note_missing(&mut self, joint: JointName, missing: bool) {
        let slot = &mut self.missing[joint.index()];
        if *slot != missing {
            if missing {
                log::debug!("joint {} not in rig, skipping", joint);
            } else if self.frames > 0 {
                log::debug!("joint {} available again", joint);
            }
            *slot = missing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::RigPreset;

    fn input(x: f32, y: f32, blinking: bool) -> FrameInput {
        FrameInput {
            pointer: PointerState::new(x, y),
            blinking,
        }
    }

    fn run(driver: &mut AnimationDriver, rig: &mut RigTree, input: FrameInput, frames: usize) {
        for _ in 0..frames {
            driver.update(input, 1.0 / 60.0, rig);
        }
    }

    #[test]
    fn test_targets_are_pure() {
        let config = AnimationConfig::default();
        let a = targets(&config, input(0.4, -0.7, false));
        let b = targets(&config, input(0.4, -0.7, false));
        assert_eq!(a, b);
    }

    #[test]
    fn test_targets_at_right_edge() {
        let t = targets(&AnimationConfig::default(), input(1.0, 0.0, false));
        assert!((t.head_rotation.y - PI / 8.0).abs() < 1e-6);
        assert_eq!(t.head_rotation.x, 0.0);
        assert!((t.torso_rotation.y - PI / 16.0).abs() < 1e-6);
        assert!((t.left_eye.x - (-0.12 + 0.02)).abs() < 1e-6);
        assert!((t.right_eye.x - (0.12 + 0.02)).abs() < 1e-6);
        assert!((t.left_eye.y - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_eyelid_targets_follow_blink() {
        let config = AnimationConfig::default();
        let open = targets(&config, input(0.0, 0.0, false));
        let shut = targets(&config, input(0.0, 0.0, true));
        assert_eq!((open.eyelid_scale_y, open.eyelid_factor), (0.1, 0.2));
        assert_eq!((shut.eyelid_scale_y, shut.eyelid_factor), (1.0, 0.4));
    }

    #[test]
    fn test_head_yaw_converges_to_target() {
        let mut rig = RigPreset::Human.build().unwrap();
        let mut driver = AnimationDriver::new(AnimationConfig::default());
        run(&mut driver, &mut rig, input(1.0, 0.0, false), 150);

        let head = rig.joint(JointName::Head).unwrap();
        let yaw = rig.transform(head).unwrap().rotation.y;
        assert!((yaw - PI / 8.0).abs() < 1e-3, "yaw was {}", yaw);
        assert!(yaw <= PI / 8.0);
    }

    #[test]
    fn test_head_yaw_rises_monotonically() {
        let mut rig = RigPreset::Human.build().unwrap();
        let mut driver = AnimationDriver::new(AnimationConfig::default());
        let head = rig.joint(JointName::Head).unwrap();
        let mut last = rig.transform(head).unwrap().rotation.y;
        for _ in 0..200 {
            driver.update(input(1.0, 0.0, false), 1.0 / 60.0, &mut rig);
            let yaw = rig.transform(head).unwrap().rotation.y;
            assert!(yaw >= last && yaw <= PI / 8.0);
            last = yaw;
        }
    }

    #[test]
    fn test_rest_pose_is_fixed_point() {
        let mut rig = RigPreset::Human.build().unwrap();
        let before = rig.world_matrices();
        let mut driver = AnimationDriver::new(AnimationConfig::default());
        run(&mut driver, &mut rig, input(0.0, 0.0, false), 10);
        let after = rig.world_matrices();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(a.abs_diff_eq(*b, 1e-6));
        }
    }

    #[test]
    fn test_eyelids_reopen_after_blink() {
        let mut rig = RigPreset::Human.build().unwrap();
        let mut driver = AnimationDriver::new(AnimationConfig::default());
        let lid = rig.joint(JointName::LeftEyelid).unwrap();

        run(&mut driver, &mut rig, input(0.0, 0.0, true), 12);
        assert!(rig.transform(lid).unwrap().scale.y > 0.9);

        run(&mut driver, &mut rig, input(0.0, 0.0, false), 100);
        assert!((rig.transform(lid).unwrap().scale.y - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_eye_keeps_depth() {
        let mut rig = RigPreset::Human.build().unwrap();
        let mut driver = AnimationDriver::new(AnimationConfig::default());
        let eye = rig.joint(JointName::RightEye).unwrap();
        let z = rig.transform(eye).unwrap().position.z;
        run(&mut driver, &mut rig, input(-1.0, 1.0, false), 50);
        assert_eq!(rig.transform(eye).unwrap().position.z, z);
        assert!(rig.transform(eye).unwrap().position.y > 0.05);
    }

    #[test]
    fn test_missing_torso_is_skipped() {
        let mut rig = RigPreset::Head.build().unwrap();
        let mut driver = AnimationDriver::new(AnimationConfig::default());
        run(&mut driver, &mut rig, input(1.0, 0.0, false), 150);

        let head = rig.joint(JointName::Head).unwrap();
        assert!((rig.transform(head).unwrap().rotation.y - PI / 8.0).abs() < 1e-3);
        assert_eq!(driver.frames(), 150);
    }

    #[test]
    fn test_frame_rate_independent_mode() {
        let config = AnimationConfig {
            frame_rate_independent: true,
            ..Default::default()
        };
        let mut fast = RigPreset::Human.build().unwrap();
        let mut slow = RigPreset::Human.build().unwrap();
        let mut a = AnimationDriver::new(config.clone());
        let mut b = AnimationDriver::new(config);

        for _ in 0..60 {
            a.update(input(1.0, 0.0, false), 1.0 / 60.0, &mut fast);
        }
        for _ in 0..30 {
            b.update(input(1.0, 0.0, false), 1.0 / 30.0, &mut slow);
        }

        let head = fast.joint(JointName::Head).unwrap();
        let ya = fast.transform(head).unwrap().rotation.y;
        let yb = slow.transform(head).unwrap().rotation.y;
        assert!((ya - yb).abs() < 1e-4);
    }

    #[test]
    fn test_config_from_ron_keeps_defaults() {
        let config: AnimationConfig =
            ron::from_str("(eyes: (travel: 0.05), frame_rate_independent: true)").unwrap();
        assert_eq!(config.eyes.travel, 0.05);
        assert_eq!(config.eyes.offset_x, 0.12);
        assert_eq!(config.head, HeadTuning::default());
        assert!(config.frame_rate_independent);

        // Partial joint overrides keep the remaining fields
        let config: AnimationConfig =
            ron::from_str("(head: (factor: 0.1), torso: (yaw_amplitude: 0.5))").unwrap();
        assert_eq!(config.head.factor, 0.1);
        assert_eq!(config.head.yaw_amplitude, PI / 8.0);
        assert_eq!(config.head.pitch_amplitude, PI / 10.0);
        assert_eq!(config.torso.yaw_amplitude, 0.5);
        assert_eq!(config.torso.factor, 0.02);
    }

    #[test]
    fn test_eye_defaults_match_rig_sockets() {
        let config = AnimationConfig::default();
        assert_eq!(config.eyes.offset_x, EYE_SOCKET_X);
        assert_eq!(config.eyes.base_y, EYE_SOCKET_Y);
        assert_eq!(config.eyelids.open_scale, EYELID_OPEN_SCALE);

        // At rest the pupils sit exactly in their sockets
        let t = targets(&config, input(0.0, 0.0, false));
        assert_eq!(t.right_eye, Vec2::new(EYE_SOCKET_X, EYE_SOCKET_Y));
    }
}
