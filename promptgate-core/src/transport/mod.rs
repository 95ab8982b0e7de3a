//! Outbound HTTP transport.
//!
//! [`ServiceClient`] handles pooling, timeouts and error classification;
//! [`remote`] adapts it to the [`PolicyDecider`](crate::enforcement::PolicyDecider),
//! [`AnswerPipeline`](crate::answer::AnswerPipeline) and
//! [`EvidenceSink`](crate::evidence::EvidenceSink) seams.

pub mod client;
pub mod remote;

pub use client::{ServiceClient, duration_ms};
pub use remote::{RemoteAnswerPipeline, RemoteDecider, RemoteEvidenceSink};
