//! Library surface for the livemon observer (used by integration tests).

pub mod types;
pub mod ws;
