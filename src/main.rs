//! # Formtext CLI (`ftx`)
//!
//! The `ftx` binary turns workflow definitions into text records and
//! prepares the query-side inputs used to search them.
//!
//! ## Usage
//!
//! ```bash
//! ftx --config ./config/ftx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ftx textify --input <workflow>` | Write `text-record.txt` and `text-record.json` |
//! | `ftx batch --root <dir> --out-dir <dir>` | Textify every workflow folder under a tree |
//! | `ftx counts --input <workflow>` | Print the count block |
//! | `ftx context --pdf <pdf>` | Print the page context of a PDF |
//! | `ftx extract --pdf <pdf>` | Build the query extract of a PDF |
//! | `ftx compose --input <extract>` | Print the combined, budgeted query |
//! | `ftx signals --input <extract>` | Print the per-signal queries |
//! | `ftx fuse --signal name=hits.json` | Fuse recorded hit lists |
//! | `ftx neighbors --vectors <json>` | Ground-truth neighbor labels |
//! | `ftx windows --input <record>` | Print the embedding windows of a document |
//!
//! ## Examples
//!
//! ```bash
//! # Textify one workflow, picking up form.pdf and manifest.json beside it
//! ftx textify --input ./wf-12/form.sgws
//!
//! # Compose a query for an incoming PDF and log the run
//! ftx extract --pdf ./incoming.pdf --out ./incoming.extract.json
//! ftx compose --input ./incoming.extract.json --log ./logs/runs.json
//!
//! # Fuse two recorded searches, fields at half weight
//! ftx fuse --signal semantics=./sem.json --signal fields=./fields.json@0.5
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use formtext::fuse_cmd::SignalArg;
use formtext::textify::TextifyArgs;
use formtext::{batch, config, fuse_cmd, logging, neighbors_cmd, query_cmd, textify};

/// Formtext CLI: text records for workflow forms and the queries that find them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "ftx",
    about = "Formtext: compact text records for workflow forms, and query-side tooling",
    version,
    long_about = "Formtext converts workflow/form definitions into primary, supplementary, and \
    complete text views with synthesized counts, and builds budgeted queries, fused rankings, \
    and ground-truth neighbor labels for retrieval experiments."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ftx.toml`. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "./config/ftx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Build the text record for one workflow file.
    ///
    /// Page context comes from `--context` (JSON), else from `--pdf`, else
    /// from a PDF found beside the input. `manifest.json` beside the input is
    /// used when `--manifest` is not given.
    Textify {
        /// Workflow JSON file (`.sgws` / `.sgw` / `.json`).
        #[arg(long)]
        input: PathBuf,

        /// Rendered PDF to read page context from.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Precomputed page context JSON.
        #[arg(long, conflicts_with = "pdf")]
        context: Option<PathBuf>,

        /// Manifest JSON with identity metadata.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Output directory (defaults to the input's folder).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Textify every workflow folder under `<root>/<tenant>/<folder>/`.
    Batch {
        #[arg(long)]
        root: PathBuf,

        #[arg(long)]
        out_dir: PathBuf,

        /// Maximum number of folders, taken in name order.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the count block for a workflow.
    Counts {
        #[arg(long)]
        input: PathBuf,
    },

    /// Print the page context extracted from a PDF.
    Context {
        #[arg(long)]
        pdf: PathBuf,
    },

    /// Extract query signals (semantics, fields, headings, layout) from a PDF.
    Extract {
        #[arg(long)]
        pdf: PathBuf,

        /// Write JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Compose the combined query text within the token budget.
    Compose {
        /// Query extract JSON, or a PDF to extract on the fly.
        #[arg(long)]
        input: PathBuf,

        /// Override `query.token_budget`.
        #[arg(long)]
        token_budget: Option<usize>,

        /// Append a run entry to this JSON log.
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Print one weighted query per non-empty signal.
    Signals {
        /// Query extract JSON, or a PDF to extract on the fly.
        #[arg(long)]
        input: PathBuf,
    },

    /// Fuse recorded per-signal hit lists into one ranking.
    Fuse {
        /// `name=path[@weight]`; repeat once per signal.
        #[arg(long = "signal", required = true)]
        signals: Vec<SignalArg>,

        /// Override `fusion.top_k`.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Compute top-k cosine neighbors for every document vector.
    Neighbors {
        /// JSON object of id -> vector (or id -> list of window vectors).
        #[arg(long)]
        vectors: PathBuf,

        /// Override `neighbors.top`.
        #[arg(long)]
        top: Option<usize>,

        /// Write JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the overlapping character windows used for document embedding.
    Windows {
        /// Text file, or a `text-record.json` (its `text_full` is used).
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging.level);

    match cli.command {
        Commands::Textify {
            input,
            pdf,
            context,
            manifest,
            out_dir,
        } => {
            let args = TextifyArgs {
                input: &input,
                pdf: pdf.as_deref(),
                context: context.as_deref(),
                manifest: manifest.as_deref(),
                out_dir: out_dir.as_deref(),
            };
            textify::run_textify(&cfg, &args)?;
        }
        Commands::Batch {
            root,
            out_dir,
            limit,
        } => {
            batch::run_batch(&cfg, &root, &out_dir, limit)?;
        }
        Commands::Counts { input } => {
            textify::run_counts(&input)?;
        }
        Commands::Context { pdf } => {
            textify::run_context(&cfg, &pdf)?;
        }
        Commands::Extract { pdf, out } => {
            query_cmd::run_extract(&pdf, out.as_deref())?;
        }
        Commands::Compose {
            input,
            token_budget,
            log,
        } => {
            query_cmd::run_compose(&cfg, &input, token_budget, log.as_deref())?;
        }
        Commands::Signals { input } => {
            query_cmd::run_signals(&cfg, &input)?;
        }
        Commands::Fuse { signals, top_k } => {
            fuse_cmd::run_fuse(&cfg, &signals, top_k)?;
        }
        Commands::Neighbors { vectors, top, out } => {
            neighbors_cmd::run_neighbors(&cfg, &vectors, top, out.as_deref())?;
        }
        Commands::Windows { input } => {
            neighbors_cmd::run_windows(&cfg, &input)?;
        }
    }

    Ok(())
}
