//! Windowed H-index calculator.
//!
//! The H5 convention counts citations of papers published in the five years
//! before a reference year: for a reference year `R` the window is
//! `[R-5, R-1]`, both ends included.
//!
//! # Example
//!
//! ```
//! use confcite::hindex::{H5Aggregator, SourceFile, YearWindow};
//!
//! let files = vec![
//!     SourceFile::new("SBPO_2022_GS_2025_09.csv", "Title,Cites,Year\nA,10,2022\nB,3,2021\n"),
//!     SourceFile::new("SBPO_2022_FIX.csv", "Title,Cites,Year\nA,12,2022\nC,2,2019\n"),
//! ];
//!
//! let metrics = H5Aggregator::new(YearWindow::h5(2025)).aggregate(&files).unwrap();
//! assert_eq!(metrics.duplicates_removed, 1);
//! assert_eq!(metrics.papers_in_window, 2);
//! assert_eq!(metrics.h_index.h, 2);
//! assert!(metrics.source_tags.contains("search-engine"));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::adapter::{ProviderKind, adapter_for};
use crate::dedupe::Deduplicator;
use crate::{Publication, Result};

/// Inclusive range of publication years counted toward an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    start: i32,
    end: i32,
}

impl YearWindow {
    /// Number of years an H5 window spans.
    pub const SPAN: i32 = 5;

    /// The H5 window `[reference_year - 5, reference_year - 1]`.
    pub fn h5(reference_year: i32) -> Self {
        Self {
            start: reference_year - Self::SPAN,
            end: reference_year - 1,
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// Publications whose year falls inside the window.
    pub fn filter<'a>(&self, publications: &'a [Publication]) -> Vec<&'a Publication> {
        publications
            .iter()
            .filter(|publication| self.contains(publication.year))
            .collect()
    }
}

impl fmt::Display for YearWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// An H-index together with the median citation count of its core.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HIndex {
    /// Largest `h` such that `h` papers have at least `h` citations each
    pub h: usize,
    /// Median of the top `h` citation counts, 0 when `h` is 0
    pub median: f64,
}

/// Computes the H-index and H-median of a citation multiset.
///
/// Papers with no citations never count toward the index.
pub fn h_index(citations: &[u32]) -> HIndex {
    let mut counts: Vec<u32> = citations.iter().copied().filter(|&c| c > 0).collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));

    let h = counts
        .iter()
        .enumerate()
        .take_while(|&(i, &c)| c as usize > i)
        .count();

    HIndex {
        h,
        median: median(&counts[..h]),
    }
}

/// Median of values sorted in descending order.
fn median(sorted: &[u32]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        n if n % 2 == 1 => f64::from(sorted[n / 2]),
        n => (f64::from(sorted[n / 2 - 1]) + f64::from(sorted[n / 2])) / 2.0,
    }
}

/// One provider file, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Reads a whole file from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::new(path.to_string_lossy(), contents))
    }

    pub fn provider(&self) -> ProviderKind {
        ProviderKind::detect(&self.name)
    }
}

/// Metrics of a single provider file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetrics {
    pub name: String,
    pub provider: ProviderKind,
    /// Rows adapted from the file
    pub papers: usize,
    pub papers_in_window: usize,
    pub h_index: HIndex,
}

/// Metrics over every source of one venue.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateMetrics {
    pub window: YearWindow,
    pub h_index: HIndex,
    /// Distinct publications across all sources
    pub papers: usize,
    pub papers_in_window: usize,
    pub citations_in_window: u64,
    pub duplicates_removed: usize,
    /// Source-type labels of the files that contributed in-window papers
    pub source_tags: BTreeSet<&'static str>,
    /// Per-file breakdown in processing order
    pub per_source: Vec<SourceMetrics>,
}

/// Adapts, merges and deduplicates provider files, then computes one index.
#[derive(Debug, Clone)]
pub struct H5Aggregator {
    window: YearWindow,
    deduplicator: Deduplicator,
}

impl H5Aggregator {
    #[must_use]
    pub fn new(window: YearWindow) -> Self {
        Self {
            window,
            deduplicator: Deduplicator::new(),
        }
    }

    /// Computes the combined index of `files`.
    ///
    /// Files are processed in name order so results do not depend on how the
    /// caller listed them. Deduplication runs over the union of all sources.
    pub fn aggregate(&self, files: &[SourceFile]) -> Result<AggregateMetrics> {
        let mut ordered: Vec<&SourceFile> = files.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        let mut combined = Vec::new();
        let mut per_source = Vec::with_capacity(ordered.len());
        let mut source_tags = BTreeSet::new();

        for file in ordered {
            let provider = file.provider();
            let publications = adapter_for(provider).adapt(&file.contents)?;
            let own = self.deduplicator.dedupe(publications.clone()).publications;
            let in_window = self.window.filter(&own);
            if !in_window.is_empty() {
                source_tags.insert(provider.tag());
            }
            let counts: Vec<u32> = in_window.iter().map(|p| p.cites).collect();
            log::debug!(
                "{} ({provider}): {} row(s), {} in window {}",
                file.name,
                publications.len(),
                counts.len(),
                self.window
            );
            per_source.push(SourceMetrics {
                name: file.name.clone(),
                provider,
                papers: publications.len(),
                papers_in_window: counts.len(),
                h_index: h_index(&counts),
            });
            combined.extend(publications);
        }

        let report = self.deduplicator.dedupe(combined);
        let in_window = self.window.filter(&report.publications);
        let counts: Vec<u32> = in_window.iter().map(|p| p.cites).collect();
        let h_index = h_index(&counts);
        log::info!(
            "H5 {} over {} paper(s) in {}: h={} median={}",
            self.window,
            counts.len(),
            source_tags.iter().copied().collect::<Vec<_>>().join(", "),
            h_index.h,
            h_index.median
        );

        Ok(AggregateMetrics {
            window: self.window,
            h_index,
            papers: report.publications.len(),
            papers_in_window: counts.len(),
            citations_in_window: counts.iter().map(|&c| u64::from(c)).sum(),
            duplicates_removed: report.removed,
            source_tags,
            per_source,
        })
    }
}
