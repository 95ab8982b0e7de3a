//! PromptGate core: policy-gated routing for AI prompt traffic.
//!
//! # Components
//!
//! - [`policy`]: the Policy Decision Point, a pure keyword evaluator over an
//!   ordered [`RuleSet`](policy::RuleSet).
//! - [`enforcement`]: the Policy Enforcement Point, a delegating proxy in
//!   front of the PDP.
//! - [`evidence`]: a bounded, append-only evidence log.
//! - [`answer`]: the answer pipeline contract and a reference pipeline.
//! - [`gateway`]: the orchestrator tying them together.
//!
//! - [`validate`]: decoding of untrusted request bodies.
//!
//! The HTTP services live in the `promptgate-proxy` crate; [`transport`]
//! provides the clients they use to reach each other.
//!
//! # Flow
//!
//! ```text
//! client → Gateway → PEP → PDP → decision
//!                 → (redact) → Answer pipeline
//!                 → (detached) Evidence store
//!                 → client
//! ```

pub mod answer;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod evidence;
pub mod gateway;
pub mod policy;
pub mod redact;
pub mod telemetry;
pub mod transport;
pub mod validate;

pub use error::{Origin, PromptGateError};
