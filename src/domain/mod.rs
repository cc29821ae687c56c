//! Pure domain logic for the listing form.
//!
//! Nothing in here touches the view or the network directly:
//! - Form fields and their raw values
//! - Price estimation
//! - Validation
//! - Payload assembly
//! - Submission attempt typestate machine

pub mod estimate;
pub mod form;
pub mod payload;
pub mod submission;
pub mod validation;
