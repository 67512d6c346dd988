//! Publication deduplicator.
//!
//! Provider exports overlap: the same paper shows up in a Scholar export and
//! an OpenAlex harvest, or twice in one spreadsheet. Rows are grouped by title
//! (trimmed, otherwise exact) and each group collapses into one publication
//! carrying the highest citation count seen.
//!
//! ## Usage
//!
//! ```rust
//! use confcite::{dedupe::Deduplicator, Publication};
//!
//! let publications = vec![
//!     Publication { title: "Graph Routing".into(), cites: 3, year: 2021, ..Default::default() },
//!     Publication { title: "Graph Routing".into(), cites: 9, year: 2022, ..Default::default() },
//!     Publication { title: "Vehicle Loading".into(), cites: 1, ..Default::default() },
//! ];
//!
//! let report = Deduplicator::new().dedupe(publications);
//! assert_eq!(report.removed, 1);
//! assert_eq!(report.publications[0].cites, 9);
//! assert_eq!(report.publications[0].year, 2021);
//! ```
//!
//! ## Merge rules
//!
//! For a group of rows sharing a title:
//!
//! - `cites` is the maximum over the group
//! - every other field comes from the first row seen

use std::collections::HashMap;

use crate::Publication;

/// Publications sharing one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// The collapsed publication
    pub unique: Publication,
    /// The rows folded into it, in input order after the first
    pub duplicates: Vec<Publication>,
}

/// Outcome of a deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeReport {
    /// Surviving publications in first-seen order
    pub publications: Vec<Publication>,
    /// Number of rows removed
    pub removed: usize,
}

/// Title-based deduplication engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deduplicator;

impl Deduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Groups publications by title, in order of first appearance.
    pub fn find_duplicates(&self, publications: Vec<Publication>) -> Vec<DuplicateGroup> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(publications.len());
        let mut groups: Vec<DuplicateGroup> = Vec::new();

        for publication in publications {
            let key = publication.dedup_key().to_string();
            match index.get(&key) {
                Some(&i) => {
                    let group = &mut groups[i];
                    group.unique.cites = group.unique.cites.max(publication.cites);
                    group.duplicates.push(publication);
                }
                None => {
                    index.insert(key, groups.len());
                    groups.push(DuplicateGroup {
                        unique: publication,
                        duplicates: Vec::new(),
                    });
                }
            }
        }

        groups
    }

    /// Collapses duplicate titles and reports how many rows were removed.
    pub fn dedupe(&self, publications: Vec<Publication>) -> DedupeReport {
        let total = publications.len();
        let publications: Vec<Publication> = self
            .find_duplicates(publications)
            .into_iter()
            .map(|group| group.unique)
            .collect();
        let removed = total - publications.len();
        if removed > 0 {
            log::info!("Removed {removed} duplicate title(s) out of {total} row(s)");
        }
        DedupeReport {
            publications,
            removed,
        }
    }
}
