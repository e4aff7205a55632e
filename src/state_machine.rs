//! Session mode state machine
//!
//! Pure transitions in the Elm style: the current mode plus an event yields
//! the next mode and the effects the session must carry out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::ModeEffect;
pub use event::ModeEvent;
pub use state::{ModeState, SessionMode};
pub use transition::{transition, TransitionError, TransitionResult};
