//! Provider adapters.
//!
//! Every bibliographic provider exports publications in its own shape. An
//! adapter maps one shape onto [`Publication`] so the aggregation code never
//! has to know where a row came from. The adapter for a file is chosen from
//! markers in its file name, never from its content.
//!
//! # Example
//!
//! ```
//! use confcite::adapter::{adapter_for, ProviderKind};
//!
//! let kind = ProviderKind::detect("SBPO_2020_GS_2025_09.csv");
//! assert_eq!(kind, ProviderKind::Scholar);
//!
//! let input = "Cites,Authors,Title,Year,Source\n12,\"A Silva, B Souza\",Graph Routing,2021,SBPO\n";
//! let publications = adapter_for(kind).adapt(input).unwrap();
//! assert_eq!(publications[0].cites, 12);
//! assert_eq!(publications[0].authors, vec!["A Silva", "B Souza"]);
//! ```

use csv::ReaderBuilder;
use std::fmt;

use crate::{ConfError, Publication, Result};

mod headers;
mod springer;
mod structure;

use headers::{ColumnMap, Field};
pub use springer::SpringerAdapter;
use structure::RawPublicationRow;

/// The provider shapes an input file can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    /// OpenAlex "lite" CSV produced by the works harvester
    OpenAlex,
    /// Google Scholar / Publish or Perish CSV export
    Scholar,
    /// Crossref works harvested to CSV
    Crossref,
    /// Springer Meta API JSON responses
    Springer,
    /// Hand-maintained spreadsheet already in the canonical columns
    Normalized,
}

/// Filename markers, checked in order against the lowercased file name.
const FILE_MARKERS: &[(ProviderKind, &[&str])] = &[
    (ProviderKind::OpenAlex, &[".oa-lite.", "_oa_", "openalex"]),
    (ProviderKind::Crossref, &["crossref"]),
    (ProviderKind::Scholar, &["_gs_", ".gs.", "scholar", "_pop_", ".pop."]),
];

impl ProviderKind {
    /// Picks the provider from structural markers in a file name.
    ///
    /// Springer is recognized only for `.json` files carrying a `springer`
    /// marker; anything without a marker is treated as [`ProviderKind::Normalized`].
    pub fn detect(file_name: &str) -> Self {
        let name = crate::utils::file_name(file_name).to_lowercase();
        if name.contains("springer") && name.ends_with(".json") {
            return ProviderKind::Springer;
        }
        FILE_MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|marker| name.contains(marker)))
            .map(|(kind, _)| *kind)
            .unwrap_or(ProviderKind::Normalized)
    }

    /// Source-type label reported next to aggregated metrics.
    pub fn tag(&self) -> &'static str {
        match self {
            ProviderKind::OpenAlex => "index-service",
            ProviderKind::Scholar => "search-engine",
            ProviderKind::Crossref => "crossref-harvest",
            ProviderKind::Springer => "publisher-metadata",
            ProviderKind::Normalized => "manual",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAlex => "OpenAlex",
            ProviderKind::Scholar => "Google Scholar",
            ProviderKind::Crossref => "Crossref",
            ProviderKind::Springer => "Springer",
            ProviderKind::Normalized => "normalized",
        };
        f.write_str(name)
    }
}

/// Trait for implementing provider adapters.
pub trait SourceAdapter {
    /// The provider shape this adapter reads.
    fn kind(&self) -> ProviderKind;

    /// Adapt the full content of one provider file.
    ///
    /// # Errors
    ///
    /// Returns `ConfError` if the input is malformed or lacks a title column.
    fn adapt(&self, input: &str) -> Result<Vec<Publication>>;
}

/// Returns the adapter for a provider shape.
pub fn adapter_for(kind: ProviderKind) -> Box<dyn SourceAdapter> {
    match kind {
        ProviderKind::Springer => Box::new(SpringerAdapter),
        kind => Box::new(CsvAdapter::for_provider(kind)),
    }
}

/// Adapter for the CSV-shaped providers.
///
/// Each provider is described by a header table mapping canonical fields to
/// the column names that provider uses, plus the separator of its author list.
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    kind: ProviderKind,
    headers: &'static [(Field, &'static [&'static str])],
    author_delimiters: &'static [char],
}

impl CsvAdapter {
    /// Creates the adapter for a CSV provider.
    ///
    /// [`ProviderKind::Springer`] has no CSV shape and falls back to the
    /// normalized columns.
    #[must_use]
    pub fn for_provider(kind: ProviderKind) -> Self {
        let (headers, author_delimiters) = headers::table_for(kind);
        Self {
            kind,
            headers,
            author_delimiters,
        }
    }
}

impl SourceAdapter for CsvAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn adapt(&self, input: &str) -> Result<Vec<Publication>> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(input.trim_start_matches('\u{feff}').as_bytes());

        let header_record = reader.headers()?.clone();
        let columns = ColumnMap::from_headers(&header_record, self.headers);
        if !columns.has(Field::Title) {
            return Err(ConfError::MissingColumn {
                source_name: format!("{} export", self.kind),
                column: "title".to_string(),
            });
        }

        let mut publications = Vec::new();
        let mut missing_years = 0usize;
        for (index, result) in reader.records().enumerate() {
            let record = result?;
            // Header occupies line 1
            let raw = RawPublicationRow::from_record(&columns, &record, index + 2);
            if !raw.has_year() {
                missing_years += 1;
            }
            match raw.into_publication(self.author_delimiters) {
                Some(publication) => publications.push(publication),
                None => log::debug!("{}: row {} has no title, skipped", self.kind, index + 2),
            }
        }

        if missing_years > 0 {
            log::info!(
                "{}: {missing_years} row(s) without a usable year, kept outside every window",
                self.kind
            );
        }
        Ok(publications)
    }
}
