//! Perspective camera and optional orbit control.

use std::cell::Cell;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::input::{InputBus, InputEvent, Subscription};

/// Perspective camera looking at a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view (degrees)
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 1000.0;

    pub fn new(position: Vec3, fov_degrees: f32) -> Self {
        Self {
            position,
            target: Vec3::ZERO,
            fov_degrees,
            near: Self::NEAR,
            far: Self::FAR,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection for a viewport of the given aspect (width / height).
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let fov = self.fov_degrees.clamp(1.0, 179.0).to_radians();
        Mat4::perspective_rh(fov, aspect.max(1e-4), self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }
}

/// Spherical camera placement around the target.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrbitState {
    yaw: f32,
    pitch: f32,
    distance: f32,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
    viewport_height: u32,
}

impl OrbitState {
    fn rotate(&mut self, dx: f64, dy: f64) {
        // A drag across the full viewport height is one full turn
        let height = self.viewport_height.max(1) as f32;
        self.yaw -= TAU * dx as f32 / height;
        self.pitch = (self.pitch + TAU * dy as f32 / height)
            .clamp(-OrbitControl::MAX_PITCH, OrbitControl::MAX_PITCH);
    }

    fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * OrbitControl::ZOOM_STEP.powf(delta))
            .clamp(OrbitControl::MIN_DISTANCE, OrbitControl::MAX_DISTANCE);
    }

    fn offset(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }
}

/// Drag to orbit the camera around its target, wheel to zoom.
pub struct OrbitControl {
    target: Vec3,
    state: Rc<Cell<OrbitState>>,
    subscription: Subscription,
}

impl OrbitControl {
    /// Stay just short of the poles so `look_at` keeps a valid up vector.
    pub const MAX_PITCH: f32 = FRAC_PI_2 - 0.01;
    pub const MIN_DISTANCE: f32 = 1.0;
    pub const MAX_DISTANCE: f32 = 50.0;
    /// Distance multiplier per wheel notch away from the user
    pub const ZOOM_STEP: f32 = 0.95;

    /// Start orbiting from the camera's current placement.
    pub fn attach(bus: &InputBus, camera: &Camera, viewport_height: u32) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset
            .length()
            .clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
        let dir = offset.try_normalize().unwrap_or(Vec3::Z);
        let state = Rc::new(Cell::new(OrbitState {
            yaw: dir.x.atan2(dir.z),
            pitch: dir.y.clamp(-1.0, 1.0).asin().clamp(-Self::MAX_PITCH, Self::MAX_PITCH),
            distance,
            dragging: false,
            last_pointer: None,
            viewport_height,
        }));

        let shared = state.clone();
        let subscription = bus.subscribe(move |event| {
            let mut s = shared.get();
            match *event {
                InputEvent::PointerButton { pressed } => {
                    s.dragging = pressed;
                }
                InputEvent::PointerMoved { x, y } => {
                    if let (true, Some((lx, ly))) = (s.dragging, s.last_pointer) {
                        s.rotate(x - lx, y - ly);
                    }
                    s.last_pointer = Some((x, y));
                }
                InputEvent::Wheel { delta } => s.zoom(delta),
                InputEvent::Resized { height, .. } => s.viewport_height = height,
            }
            shared.set(s);
        });
        log::debug!("orbit control attached at distance {:.2}", distance);

        Self {
            target: camera.target,
            state,
            subscription,
        }
    }

    /// Move the camera to the current orbit placement.
    pub fn apply(&self, camera: &mut Camera) {
        camera.target = self.target;
        camera.position = self.target + self.state.get().offset();
    }

    pub fn distance(&self) -> f32 {
        self.state.get().distance
    }

    pub fn pitch(&self) -> f32 {
        self.state.get().pitch
    }

    pub fn yaw(&self) -> f32 {
        self.state.get().yaw
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn detach(&mut self) {
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(bus: &InputBus, from: (f64, f64), to: (f64, f64)) {
        bus.publish(InputEvent::PointerMoved { x: from.0, y: from.1 });
        bus.publish(InputEvent::PointerButton { pressed: true });
        bus.publish(InputEvent::PointerMoved { x: to.0, y: to.1 });
        bus.publish(InputEvent::PointerButton { pressed: false });
    }

    #[test]
    fn test_camera_looks_down_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let clip = camera.view_projection(1.0).project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-6 && clip.y.abs() < 1e-6);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn test_orbit_starts_at_camera_position() {
        let bus = InputBus::new();
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let orbit = OrbitControl::attach(&bus, &camera, 600);
        orbit.apply(&mut camera);
        assert!((camera.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_hover_without_button_does_not_rotate() {
        let bus = InputBus::new();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let orbit = OrbitControl::attach(&bus, &camera, 600);
        bus.publish(InputEvent::PointerMoved { x: 0.0, y: 0.0 });
        bus.publish(InputEvent::PointerMoved { x: 300.0, y: 300.0 });
        assert_eq!(orbit.yaw(), 0.0);
        assert_eq!(orbit.pitch(), 0.0);
    }

    #[test]
    fn test_drag_rotates_and_keeps_distance() {
        let bus = InputBus::new();
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let orbit = OrbitControl::attach(&bus, &camera, 600);
        drag(&bus, (100.0, 100.0), (250.0, 100.0));
        assert!(orbit.yaw() < 0.0);

        orbit.apply(&mut camera);
        assert!((camera.position.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let bus = InputBus::new();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let orbit = OrbitControl::attach(&bus, &camera, 100);
        drag(&bus, (0.0, 0.0), (0.0, 10_000.0));
        assert_eq!(orbit.pitch(), OrbitControl::MAX_PITCH);
        drag(&bus, (0.0, 10_000.0), (0.0, -20_000.0));
        assert_eq!(orbit.pitch(), -OrbitControl::MAX_PITCH);
    }

    #[test]
    fn test_wheel_zoom_is_clamped() {
        let bus = InputBus::new();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let orbit = OrbitControl::attach(&bus, &camera, 600);

        bus.publish(InputEvent::Wheel { delta: 1.0 });
        assert!(orbit.distance() < 5.0);

        bus.publish(InputEvent::Wheel { delta: 500.0 });
        assert_eq!(orbit.distance(), OrbitControl::MIN_DISTANCE);
        bus.publish(InputEvent::Wheel { delta: -500.0 });
        assert_eq!(orbit.distance(), OrbitControl::MAX_DISTANCE);
    }

    #[test]
    fn test_detached_orbit_ignores_input() {
        let bus = InputBus::new();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), 50.0);
        let mut orbit = OrbitControl::attach(&bus, &camera, 600);
        orbit.detach();
        bus.publish(InputEvent::Wheel { delta: 3.0 });
        assert_eq!(orbit.distance(), 5.0);
        assert_eq!(bus.listener_count(), 0);
    }
}
