//! Hardware-independent control kernel of the simmer cooker.
//!
//! The firmware binds these pieces to pins, timers and the ADC; everything
//! in here runs unchanged on the host, which is where the tests live.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

pub mod controller;
pub mod filter;
pub mod phase;
pub mod program;
pub mod sequencer;
pub mod state;
pub mod thermistor;

pub use controller::Tunings;
pub use program::Program;
pub use sequencer::{Effect, Sequencer, TuningField};
pub use state::ControlState;
