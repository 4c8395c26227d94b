//! Analysis Agents
//!
//! - **Direct Completion Agent**: one chat completion over embedded text or an inlined document
//! - **Submission Agent**: starts an assistant run and hands back its ids
//! - **Status Agent**: observes a run once and reads its answer when done
//! - **Document Agent**: submission plus a bounded wait and cleanup, in one call
//!
//! ```text
//! submit-document ──► Submission ──► {threadId, runId}
//!                                         │  (client keeps polling)
//! check-status ─────► Status ◄────────────┘
//!
//! analyze-document ─► Submission ─► poll ─► Status ─► cleanup
//! ```

pub mod direct;
pub mod document;
pub mod status;
pub mod submission;

pub use direct::{AnalysisInput, DirectCompletionAgent};
pub use document::DocumentAgent;
pub use status::StatusAgent;
pub use submission::{RemoteResources, SubmissionAgent};
