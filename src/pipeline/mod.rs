//! Client-side submission workflow.
//!
//! - `Submission`: in-memory intake state (binaries, step, per-stage status)
//! - `Sequencer`: runs the five stages with resume-from-failed-stage
//! - `run_intake`: drives a submission from files on disk

pub mod intake;
pub mod sequencer;
pub mod submission;

pub use intake::{IntakeFiles, run_intake};
pub use sequencer::{Sequencer, StatusListener};
pub use submission::{CAPTURE_STEPS, INTRO_STEP, SUBMIT_STEP, Submission};
