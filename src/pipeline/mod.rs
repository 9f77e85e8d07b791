//! Classification-and-organization pipeline.
//!
//! Every batch flows through:
//! 1. `MessageSource::fetch_messages()`: source-specific I/O
//! 2. `EmotionClassifier::classify()`: per message, in parallel, retried
//! 3. `OrganizationPolicy::select_buckets()`: pure bucket selection
//! 4. `Reporter::report()`: hand the finished run outward
//!
//! **The store is only published once every message has settled.**

pub mod organizer;
pub mod policy;
pub mod runner;
pub mod types;

pub use organizer::Organizer;
pub use policy::OrganizationPolicy;
pub use runner::PipelineRunner;
pub use types::{
    BucketName, Emotion, EmotionResult, FailureKind, FailureRecord, Message, MessageId,
    MessageSource, OrganizeOutcome, OrganizedStore, Reporter, RunReport,
};
