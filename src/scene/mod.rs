//! The mounted scene: rig, animation, inputs, camera and lights.
//!
//! A [`Scene`] is created by [`Scene::mount`] and driven by calling
//! [`Scene::frame`] once per rendered frame. Tearing it down (explicitly or on
//! drop) detaches every input listener and cancels the blink timer before the
//! rig is released.

mod camera;
mod lighting;

pub use camera::{Camera, OrbitControl};
pub use lighting::{AmbientLight, LightingConfig, PointLight, SpotLight};

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationConfig, AnimationDriver, FrameInput};
use crate::blink::{BlinkConfig, BlinkScheduler};
use crate::input::{InputBus, PointerState, PointerTracker, Viewport};
use crate::rig::{Color, RigError, RigPreset, RigTree};

/// Mount-time view settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera_position: Vec3,
    /// Vertical field of view (degrees)
    pub field_of_view: f32,
    /// Clear to fully transparent so the host page shows through
    pub background_transparent: bool,
    /// Drag to orbit, wheel to zoom
    pub allow_orbit_control: bool,
    pub rig: RigPreset,
    /// Clear color when the background is opaque
    pub clear_color: Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera_position: Vec3::new(0.0, 0.0, 5.0),
            field_of_view: 50.0,
            background_transparent: true,
            allow_orbit_control: false,
            rig: RigPreset::Human,
            clear_color: Color::hex(0x0f172a),
        }
    }
}

/// Everything [`Scene::mount`] needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub scene: SceneConfig,
    pub animation: AnimationConfig,
    pub blink: BlinkConfig,
    pub lighting: LightingConfig,
    /// Blink RNG seed; random when unset
    pub seed: Option<u64>,
}

/// Frame time assumed for the first frame after mount.
const FIRST_FRAME: Duration = Duration::from_micros(16_667);

pub struct Scene {
    config: SceneConfig,
    lighting: LightingConfig,
    camera: Camera,
    orbit: Option<OrbitControl>,
    tracker: PointerTracker,
    blink: BlinkScheduler,
    driver: AnimationDriver,
    rig: RigTree,
    last_frame: Option<Duration>,
    mounted: bool,
}

impl Scene {
    /// Build the rig and attach to `bus`. `now` is the time since the host
    /// clock started; [`Scene::frame`] must be called with the same clock.
    pub fn mount(
        bus: &InputBus,
        viewport: Viewport,
        settings: &SceneSettings,
        now: Duration,
    ) -> Result<Self, RigError> {
        let config = settings.scene.clone();
        let rig = config.rig.build()?;

        let camera = Camera::new(config.camera_position, config.field_of_view);
        let orbit = config
            .allow_orbit_control
            .then(|| OrbitControl::attach(bus, &camera, viewport.height));

        let tracker = PointerTracker::attach(bus, viewport);

        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut blink = BlinkScheduler::seeded(settings.blink.clone(), seed);
        blink.start(now);

        log::info!(
            "scene mounted: rig={} nodes={} joints={} viewport={}x{} orbit={} seed={}",
            config.rig,
            rig.len(),
            rig.joint_count(),
            viewport.width,
            viewport.height,
            orbit.is_some(),
            seed
        );

        Ok(Self {
            config,
            lighting: settings.lighting.clone(),
            camera,
            orbit,
            tracker,
            blink,
            driver: AnimationDriver::new(settings.animation.clone()),
            rig,
            last_frame: None,
            mounted: true,
        })
    }

    /// Run one frame: fire due blink timers, sample the inputs once and step
    /// every joint toward its target.
    ///
    /// Returns `false` without touching anything once the scene is torn down.
    pub fn frame(&mut self, now: Duration) -> bool {
        if !self.mounted {
            return false;
        }

        let dt = match self.last_frame {
            Some(last) => now.saturating_sub(last),
            None => FIRST_FRAME,
        };
        self.last_frame = Some(now);

        self.blink.advance(now);
        let input = FrameInput {
            pointer: self.tracker.state(),
            blinking: self.blink.is_blinking(),
        };
        self.driver.update(input, dt.as_secs_f32(), &mut self.rig);

        if let Some(orbit) = &self.orbit {
            orbit.apply(&mut self.camera);
        }
        true
    }

    /// Detach from input and stop the blink timer. Idempotent.
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        self.tracker.detach();
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.detach();
        }
        self.blink.cancel();
        self.mounted = false;
        log::info!(
            "scene torn down after {} frames, {} blinks",
            self.driver.frames(),
            self.blink.blink_count()
        );
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn rig(&self) -> &RigTree {
        &self.rig
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn lighting(&self) -> &LightingConfig {
        &self.lighting
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.tracker.viewport()
    }

    pub fn pointer(&self) -> PointerState {
        self.tracker.state()
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_blinking()
    }

    pub fn blink_count(&self) -> u64 {
        self.blink.blink_count()
    }

    pub fn frames(&self) -> u64 {
        self.driver.frames()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.teardown();
    }
}
