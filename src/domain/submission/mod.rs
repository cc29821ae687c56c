//! Submission attempt aggregate - states and transitions.
//!
//! This module contains the core logic of a listing submit:
//! - Attempt types and states (typestate pattern)
//! - State transition methods
//! - Failure classification of server responses

pub mod state;
pub mod transitions;

pub use state::*;
pub use transitions::classify_response;
