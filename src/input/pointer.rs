//! Pointer tracking in normalized device coordinates.

use std::cell::Cell;
use std::rc::Rc;

use super::bus::{InputBus, InputEvent, Subscription};

/// Pointer position in normalized device coordinates.
///
/// Both axes span [-1, 1] across the viewport, +Y pointing up. Values may
/// stray slightly outside that range at the viewport edges; they are not
/// clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    pub const CENTER: PointerState = PointerState { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Viewport size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Convert a screen position to normalized device coordinates.
    ///
    /// Returns `None` for an empty viewport.
    pub fn normalize(&self, screen_x: f64, screen_y: f64) -> Option<PointerState> {
        if self.is_empty() {
            return None;
        }
        let ndc_x = (screen_x / self.width as f64) * 2.0 - 1.0;
        let ndc_y = -((screen_y / self.height as f64) * 2.0 - 1.0); // Flip Y
        Some(PointerState::new(ndc_x as f32, ndc_y as f32))
    }
}

/// Read handle to the published pointer state.
///
/// The whole pair is stored in one cell, so readers never observe an `x` from
/// one event combined with a `y` from another.
#[derive(Debug, Clone, Default)]
pub struct PointerCell(Rc<Cell<PointerState>>);

impl PointerCell {
    pub fn get(&self) -> PointerState {
        self.0.get()
    }

    fn publish(&self, state: PointerState) {
        self.0.set(state);
    }
}

/// Follows pointer movement on an [`InputBus`] for as long as it is attached.
pub struct PointerTracker {
    state: PointerCell,
    viewport: Rc<Cell<Viewport>>,
    subscription: Subscription,
}

impl PointerTracker {
    /// Start tracking. The state starts at the center of the viewport.
    pub fn attach(bus: &InputBus, viewport: Viewport) -> Self {
        let state = PointerCell::default();
        let viewport = Rc::new(Cell::new(viewport));

        let published = state.clone();
        let current_viewport = viewport.clone();
        let subscription = bus.subscribe(move |event| match *event {
            InputEvent::PointerMoved { x, y } => {
                let vp = current_viewport.get();
                let next = vp.normalize(x, y).unwrap_or(PointerState::CENTER);
                log::trace!(
                    "pointer: screen({:.0},{:.0}) → ndc({:.3},{:.3}) [viewport={}x{}]",
                    x,
                    y,
                    next.x,
                    next.y,
                    vp.width,
                    vp.height
                );
                published.publish(next);
            }
            InputEvent::Resized { width, height } => {
                current_viewport.set(Viewport::new(width, height));
            }
            _ => {}
        });

        Self {
            state,
            viewport,
            subscription,
        }
    }

    /// Latest published pointer state.
    pub fn state(&self) -> PointerState {
        self.state.get()
    }

    /// A handle that keeps reading the published state after the tracker is gone.
    pub fn cell(&self) -> PointerCell {
        self.state.clone()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop listening. The last published state stays readable.
    pub fn detach(&mut self) {
        self.subscription.cancel();
    }
}
