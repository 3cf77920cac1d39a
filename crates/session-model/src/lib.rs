//! FaceIt Session Model
//!
//! Defines the core data contracts for a recording session:
//! - **Frame:** A timestamped RGB pixel buffer from the camera
//! - **Reading:** Named numeric channels emitted by an analyzer for one frame
//! - **Event:** Discrete game events tagged with an approximate frame index
//! - **Session:** The aggregate record and its sanitized JSON export
//!
//! All timestamps stored in a session are seconds relative to the session
//! start, so the three independent time bases share one axis.

pub mod event;
pub mod frame;
pub mod reading;
pub mod session;

pub use event::*;
pub use frame::*;
pub use reading::*;
pub use session::*;
