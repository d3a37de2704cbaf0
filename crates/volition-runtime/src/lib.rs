//! `volition-runtime` – the decision pipeline.
//!
//! Where perceptions become actions: one synchronous pipeline with an
//! asynchronous boundary at its single genuine I/O point, the completion
//! call (plus whatever I/O individual action handlers perform).
//!
//! # Modules
//!
//! - [`session`] – [`AgentSession`][session::AgentSession]: owns the action
//!   catalog, intent registry, workflow manager, and memory store for one
//!   agent session, injects them into every consumer, and exposes the
//!   perceive → synthesize → execute pipeline as
//!   [`handle`][session::AgentSession::handle].
//! - [`synthesizer`] – [`DecisionSynthesizer`][synthesizer::DecisionSynthesizer]:
//!   builds one structured completion request per perception and normalizes
//!   the reply through the strict validation pipeline (parse, action
//!   resolution, priority normalization, confidence coercion).  Synthesis
//!   never raises; transport and parse failures degrade to `"error"`
//!   decisions.
//! - [`executor`] – [`DecisionExecutor`][executor::DecisionExecutor]: the
//!   execution-mode state machine (`Auto` / `UserApproval` / `Deferred`)
//!   plus the explicit resolution operations for parked decisions.
//! - [`completion`] – [`CompletionBackend`][completion::CompletionBackend]
//!   and the bundled [`OpenAiCompatClient`][completion::OpenAiCompatClient],
//!   which forces structured output by injecting the
//!   [`DecisionReply`][completion::DecisionReply] JSON Schema via
//!   `response_format`.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber setup with optional OTLP span export
//!   (`OTEL_EXPORTER_OTLP_ENDPOINT`).

pub mod completion;
pub mod executor;
pub mod session;
pub mod synthesizer;
pub mod telemetry;

pub use completion::{
    ChatMessage, CompletionBackend, CompletionError, DECISION_CONTRACT, DecisionReply,
    OpenAiCompatClient, Role,
};
pub use executor::DecisionExecutor;
pub use session::{AgentSession, SessionConfig};
pub use synthesizer::DecisionSynthesizer;
pub use telemetry::{TracerProviderGuard, init_tracing};
