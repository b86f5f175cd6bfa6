//! # Gazer - a character rig that watches the pointer
//!
//! A stylized figure built from rigid primitives turns its head and torso
//! toward the pointer, follows it with its eyes and blinks on its own.
//!
//! The library is split leaves-first: [`input`] turns window events into a
//! normalized pointer, [`blink`] runs the blink timer, [`rig`] holds the
//! segment tree, [`animation`] moves its joints each frame and [`scene`] ties
//! them together behind a mount/frame/teardown contract. [`render`] and
//! [`app`] put it on screen.

pub mod animation;
pub mod app;
pub mod blink;
pub mod config;
pub mod input;
pub mod render;
pub mod rig;
pub mod scene;
pub mod timer;

pub use app::App;
pub use config::AppConfig;
pub use scene::{Scene, SceneConfig, SceneSettings};

/// Common imports for internal use
pub mod prelude {
    pub use crate::animation::{AnimationConfig, AnimationDriver, FrameInput};
    pub use crate::blink::{BlinkConfig, BlinkScheduler};
    pub use crate::input::{InputBus, InputEvent, PointerState, Viewport};
    pub use crate::rig::{JointName, RigPreset, RigTree};
    pub use crate::scene::{Scene, SceneConfig, SceneSettings};
    pub use glam::Vec3;
}

// WASM entry point
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages in the browser console
    console_error_panic_hook::set_once();

    // Initialize logging for WASM
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }

    log::info!("Gazer WASM module initialized");
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn run() -> Result<(), JsValue> {
    log::info!("Starting Gazer (WASM)");

    let (app, event_loop) = App::new(AppConfig::default())
        .await
        .map_err(|e| JsValue::from_str(&format!("Failed to create app: {:#}", e)))?;

    App::run(event_loop, app).map_err(|e| JsValue::from_str(&format!("Failed to run app: {}", e)))
}
