//! HTTP surface of PromptGate.
//!
//! The `promptgate` binary runs one of four services:
//!
//! - **aims**: Policy Decision Point plus the evidence store
//! - **pep**: enforcement point that forwards queries to aims
//! - **gateway**: consults the PEP, redacts, calls the answer pipeline and
//!   records evidence
//! - **answer**: reference retrieval + generation pipeline
//!
//! Every service exposes `/healthz` and `/metrics`, logs requests through
//! [`logging_layer`], and maps failures through [`error::ApiError`].

pub mod error;
pub mod extract;
pub mod health;
pub mod logging_layer;
pub mod server;
pub mod services;

pub use services::{App, ServiceKind, build_app};
