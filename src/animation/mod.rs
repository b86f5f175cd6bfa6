//! Pointer- and blink-driven joint animation.

mod driver;
mod smoothing;

pub use driver::{
    targets, AnimationConfig, AnimationDriver, EyeTuning, EyelidTuning, FrameInput, HeadTuning,
    JointTargets, RotationTuning, TorsoTuning,
};
pub use smoothing::{approach, frame_rate_factor, Smoothable, REFERENCE_FPS};
