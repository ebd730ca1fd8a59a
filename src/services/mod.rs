//! Domain logic. Handlers load and save records; these modules decide what changes.

pub mod analytics;
pub mod community;
pub mod exam;
pub mod workflow;
