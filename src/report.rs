//! Plain-text quality report over a merged registry and its export tables.

use std::collections::BTreeMap;
use std::fmt;

use crate::alias::AliasCollision;
use crate::config::{ExpectedCounts, PipelineConfig};
use crate::export::{ExportTables, Orphans};
use crate::merge::UnificationEvent;
use crate::registry::{CompId, IdKind, Registry, RemovedDuplicate, Tier};

const BUCKET: u32 = 100_000;

/// Outcome of comparing the record count with [`ExpectedCounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Met,
    BelowMinimum,
    AboveMaximum,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total: usize,
    /// Record count per block of 100000 ids, keyed by block start
    pub distribution: BTreeMap<u32, usize>,
    /// Records holding each external id
    pub id_coverage: Vec<(IdKind, usize)>,
    /// Records with a tier above `None`
    pub tier_coverage: usize,
    pub duplicate_acronyms: Vec<(String, Vec<CompId>)>,
    pub collisions: Vec<AliasCollision>,
    pub unifications: Vec<UnificationEvent>,
    pub removed_duplicates: Vec<RemovedDuplicate>,
    pub empty_names: usize,
    pub empty_acronyms: usize,
    pub orphans: Orphans,
    pub alternates_exported: usize,
    pub alternates_dropped: usize,
    pub expected: ExpectedCounts,
}

impl QualityReport {
    pub fn new(registry: &Registry, tables: &ExportTables, config: &PipelineConfig) -> Self {
        let mut distribution = BTreeMap::new();
        let mut id_coverage: Vec<(IdKind, usize)> = IdKind::ALL.iter().map(|&kind| (kind, 0)).collect();
        let mut tier_coverage = 0;
        for record in registry.records() {
            *distribution
                .entry(record.comp_id().numeric() / BUCKET * BUCKET)
                .or_default() += 1;
            for (kind, count) in id_coverage.iter_mut() {
                if record.external_ids().get(*kind).is_some() {
                    *count += 1;
                }
            }
            if record.tier() > Tier::None {
                tier_coverage += 1;
            }
        }
        let (empty_names, empty_acronyms) = tables.empty_fields();

        Self {
            total: registry.len(),
            distribution,
            id_coverage,
            tier_coverage,
            duplicate_acronyms: registry.duplicate_acronyms(),
            collisions: registry.aliases().collisions().to_vec(),
            unifications: Vec::new(),
            removed_duplicates: registry.removed_duplicates().to_vec(),
            empty_names,
            empty_acronyms,
            orphans: tables.orphans(),
            alternates_exported: tables.additional_names.len(),
            alternates_dropped: tables.alternates_dropped,
            expected: config.expected_counts.clone(),
        }
    }

    /// Adds the unifications performed by a merge run.
    pub fn with_unifications(mut self, events: &[UnificationEvent]) -> Self {
        self.unifications.extend_from_slice(events);
        self
    }

    pub fn expectation(&self) -> Expectation {
        if self.total < self.expected.min_conferences {
            Expectation::BelowMinimum
        } else if self.total > self.expected.max_conferences {
            Expectation::AboveMaximum
        } else {
            Expectation::Met
        }
    }

    /// No integrity problem and at least the minimum record count.
    pub fn passed(&self) -> bool {
        self.expectation() != Expectation::BelowMinimum
            && self.empty_names == 0
            && self.empty_acronyms == 0
            && self.orphans == Orphans::default()
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QUALITY REPORT")?;
        writeln!(f, "Total conferences: {}", self.total)?;

        writeln!(f)?;
        writeln!(f, "1. CompID distribution")?;
        for (start, count) in &self.distribution {
            writeln!(f, "   {start}-{}: {count}", start + BUCKET - 1)?;
        }

        writeln!(f)?;
        writeln!(f, "2. Coverage")?;
        for (kind, count) in &self.id_coverage {
            writeln!(
                f,
                "   {} ID: {count} ({:.1}%)",
                kind.label(),
                self.percent(*count)
            )?;
        }
        writeln!(
            f,
            "   Tier: {} ({:.1}%)",
            self.tier_coverage,
            self.percent(self.tier_coverage)
        )?;

        writeln!(f)?;
        writeln!(f, "3. Duplicate acronyms: {}", self.duplicate_acronyms.len())?;
        for (acronym, ids) in &self.duplicate_acronyms {
            let ids: Vec<String> = ids.iter().map(CompId::to_string).collect();
            writeln!(f, "   {acronym}: {}", ids.join(", "))?;
        }
        writeln!(f, "   Alias collisions: {}", self.collisions.len())?;
        for collision in &self.collisions {
            writeln!(
                f,
                "   {} -> {} (shadows {}, {:?})",
                collision.acronym, collision.kept, collision.shadowed, collision.kind
            )?;
        }

        writeln!(f)?;
        writeln!(f, "4. Unifications: {}", self.unifications.len())?;
        for event in &self.unifications {
            writeln!(
                f,
                "   {} ({}) absorbed {} ({})",
                event.target, event.target_id, event.absorbed, event.absorbed_id
            )?;
        }

        writeln!(f)?;
        writeln!(f, "5. Registry duplicates removed: {}", self.removed_duplicates.len())?;
        for removed in &self.removed_duplicates {
            writeln!(f, "   {} ({})", removed.acronym, removed.comp_id)?;
        }

        writeln!(f)?;
        writeln!(f, "6. Integrity")?;
        writeln!(f, "   Empty names: {}", self.empty_names)?;
        writeln!(f, "   Empty acronyms: {}", self.empty_acronyms)?;
        writeln!(f, "   Orphan additional names: {}", self.orphans.additional_names)?;
        writeln!(f, "   Orphan editions: {}", self.orphans.editions)?;
        writeln!(
            f,
            "   Alternates exported: {}, dropped: {}",
            self.alternates_exported, self.alternates_dropped
        )?;

        writeln!(f)?;
        writeln!(f, "7. Expectation check")?;
        let (min, max) = (self.expected.min_conferences, self.expected.max_conferences);
        match self.expectation() {
            Expectation::Met => writeln!(f, "   OK: {} within [{min}, {max}]", self.total),
            Expectation::BelowMinimum => {
                writeln!(f, "   FAIL: {} below minimum {min}", self.total)
            }
            Expectation::AboveMaximum => {
                writeln!(f, "   WARNING: {} above maximum {max}", self.total)
            }
        }
    }
}
