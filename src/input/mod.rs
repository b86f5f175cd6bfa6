//! Input plumbing: the window-level event stream and pointer tracking.

mod bus;
mod pointer;

pub use bus::{InputBus, InputEvent, Subscription};
pub use pointer::{PointerCell, PointerState, PointerTracker, Viewport};
