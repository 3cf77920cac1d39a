//! Game event source contract.
//!
//! Games run on their own threads or timers and report events through a
//! single callback, which is the recorder's game-event entry point.

use std::sync::Arc;

use faceit_common::error::FaceitResult;
use faceit_session_model::EventPayload;

/// Callback invoked by a game for every event it emits.
pub type GameEventCallback = Arc<dyn Fn(&str, EventPayload) + Send + Sync>;

/// A producer of discrete game events.
pub trait GameEventSource: Send {
    fn name(&self) -> &str;

    /// Begin emitting events through `callback`.
    fn start(&mut self, callback: GameEventCallback) -> FaceitResult<()>;

    /// Stop emitting. No callback may run after this returns.
    fn stop(&mut self);
}
