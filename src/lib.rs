//! Email Emotion Organizer: sorts a batch of emails into emotion buckets.

pub mod channels;
pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
