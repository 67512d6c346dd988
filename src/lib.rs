//! Conference identity reconciliation and citation metrics.
//!
//! `confcite` reconciles a canonical conference registry against committee
//! correction files and computes H-index / H5 figures over publication lists
//! exported from heterogeneous bibliographic providers.
//!
//! # Key Features
//!
//! - **Identity resolution**:
//!   - Case-insensitive alias lookup over primary and alternate acronyms
//!   - Curated rename rules (ignore, force, unify)
//!   - Idempotent merging: replaying the same corrections changes nothing
//!
//! - **Bibliometrics**:
//!   - Provider adapters for OpenAlex, Google Scholar, Crossref, Springer and
//!     hand-maintained spreadsheets
//!   - Title deduplication keeping the highest citation count
//!   - H-index and H-median over a five year window
//!
//! - **Exports**:
//!   - Conferences, alternate names and editions tables
//!   - Referential validation and a text quality report
//!
//! # Basic Usage
//!
//! ```rust
//! use confcite::hindex::{h_index, YearWindow};
//!
//! let h = h_index(&[10, 8, 5, 4, 3]);
//! assert_eq!(h.h, 4);
//! assert_eq!(h.median, 6.5);
//!
//! let window = YearWindow::h5(2025);
//! assert!(window.contains(2020) && !window.contains(2025));
//! ```
//!
//! # Registry Merging
//!
//! ```rust
//! use confcite::correction::CorrectionReader;
//! use confcite::merge::RecordMerger;
//! use confcite::registry::Registry;
//! use confcite::rules::RuleSet;
//!
//! let registry = Registry::from_csv(
//!     "comp_id,acronym,name,alt_acronyms\nCompID900001,FOO,Foo Symposium,\n",
//!     &RuleSet::default(),
//! ).unwrap();
//!
//! let rows = CorrectionReader::new()
//!     .read("SBC-CE-XX.ce.csv", "SIGLA,NOME,Nova Sigla\nFOO,Foo Symposium,BAR\n")
//!     .unwrap();
//!
//! let mut merger = RecordMerger::new(registry, RuleSet::default());
//! let stats = merger.apply_rows(&rows);
//! assert_eq!(stats.renamed, 1);
//!
//! let record = merger.registry().resolve_record("FOO").unwrap();
//! assert_eq!(record.primary_acronym(), "BAR");
//!
//! // Replaying the same corrections is a no-op.
//! assert_eq!(merger.apply_rows(&rows).structural_changes(), 0);
//! ```
//!
//! # Error Handling
//!
//! The library uses a custom [`Result`] type that wraps [`ConfError`]:
//!
//! ```rust
//! use confcite::registry::Registry;
//! use confcite::rules::RuleSet;
//! use confcite::ConfError;
//!
//! match Registry::from_csv("comp_id,name\nCompID1,Foo\n", &RuleSet::default()) {
//!     Err(ConfError::MissingColumn { column, .. }) => assert_eq!(column, "acronym"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! # Logging
//!
//! Progress, conflicts and discarded data are reported through the [`log`]
//! facade. Install any logger to see them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod adapter;
pub mod alias;
pub mod config;
pub mod correction;
pub mod dedupe;
pub mod export;
pub mod hindex;
pub mod merge;
mod regex;
pub mod registry;
pub mod report;
pub mod rules;
mod utils;

// Reexports
pub use adapter::{ProviderKind, SourceAdapter};
pub use merge::RecordMerger;
pub use registry::Registry;
pub use rules::RuleSet;

/// A specialized Result type for confcite operations.
pub type Result<T> = std::result::Result<T, ConfError>;

/// Errors raised while loading, merging or exporting data.
#[derive(Error, Debug)]
pub enum ConfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { source_name: String, column: String },

    #[error("Invalid field value: {field} - {message}")]
    InvalidFieldValue { field: String, message: String },

    #[error("Invalid rule set: {0}")]
    Rules(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Corrections still change the registry after {rounds} rounds")]
    NoFixedPoint { rounds: usize },
}

impl From<csv::Error> for ConfError {
    fn from(err: csv::Error) -> Self {
        ConfError::InvalidFormat(err.to_string())
    }
}

impl From<serde_json::Error> for ConfError {
    fn from(err: serde_json::Error) -> Self {
        ConfError::InvalidFormat(err.to_string())
    }
}

/// A publication in the canonical schema every provider is adapted into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Title of the work, also the deduplication key
    pub title: String,
    /// Citation count, 0 when the provider has none
    pub cites: u32,
    /// Author display names in provider order
    pub authors: Vec<String>,
    /// Publication year, 0 when missing or unparsable. 0 precedes every
    /// citation window, so such rows count as papers but never toward H5.
    pub year: i32,
    /// Venue the work appeared in
    pub source: String,
    pub publisher: String,
    /// Normalized Digital Object Identifier
    pub doi: Option<String>,
}

impl Publication {
    /// Key used to collapse duplicate rows.
    pub fn dedup_key(&self) -> &str {
        self.title.trim()
    }
}
