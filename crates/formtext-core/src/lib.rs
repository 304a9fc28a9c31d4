//! # Formtext Core
//!
//! Pure text-normalization and ranking logic for workflow/form documents:
//! parsing, line emission, count synthesis, slice assembly, token budgeting,
//! line de-duplication, result fusion, and nearest-neighbor ranking.
//!
//! This crate performs no filesystem, network, or process I/O and never
//! installs a logging subscriber. Collaborators it needs (embedding
//! providers, rankers) are traits implemented by the calling application.
//!
//! ```text
//! WorkflowDocument + PageContext
//!        │ emit
//!        ▼
//! primary / supplementary lines + CountBlock
//!        │ assemble
//!        ▼
//! Slices { primary, supplementary, complete }  ──► record::TextRecord
//!
//! QueryExtract ──► query::compose_combined / query::signal_queries
//!                         │ retrieval::retrieve_and_fuse (Ranker)
//!                         ▼
//!                  fusion::fuse ──► ranked hits
//! ```

pub mod assemble;
pub mod budget;
pub mod counts;
pub mod dedupe;
pub mod embedding;
pub mod emit;
pub mod error;
pub mod fusion;
pub mod lines;
pub mod markup;
pub mod models;
pub mod neighbors;
pub mod query;
pub mod record;
pub mod retrieval;

pub use error::InputError;
