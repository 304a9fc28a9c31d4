//! # Formtext
//!
//! Turns workflow/form definitions into compact, LLM-friendly text records
//! and builds the query side used to retrieve them.
//!
//! The normalization and ranking logic lives in the I/O-free
//! [`formtext_core`] crate. This crate adds everything that touches the
//! outside world: configuration, logging, PDF text extraction, file
//! discovery, record output, and the `ftx` command line.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ workflow.json│──▶│   textify    │──▶│ text-record.txt    │
//! │ + PDF        │   │ emit+assemble│   │ text-record.json   │
//! └──────────────┘   └──────────────┘   └────────────────────┘
//!
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ incoming PDF │──▶│   extract    │──▶│ compose / signals  │
//! └──────────────┘   └──────────────┘   └─────────┬──────────┘
//!                                                 │ external search
//!                                                 ▼
//!                                           ┌───────────┐
//!                                           │   fuse    │
//!                                           └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | Tracing subscriber setup |
//! | [`extract`] | PDF page text, page context, query signals |
//! | [`textify`] | Single-workflow text records and counts |
//! | [`batch`] | Folder-tree discovery and batch textify |
//! | [`query_cmd`] | Query extract, combined composition, signal queries |
//! | [`runlog`] | Sequenced JSON run log |
//! | [`fuse_cmd`] | Fusion of recorded hit lists |
//! | [`neighbors_cmd`] | Ground-truth neighbors and embedding windows |

pub mod batch;
pub mod config;
pub mod extract;
pub mod fuse_cmd;
pub mod logging;
pub mod neighbors_cmd;
pub mod query_cmd;
pub mod runlog;
pub mod textify;
