//! Record merger.
//!
//! [`RecordMerger`] owns the [`Registry`] for the length of a run and is the
//! only thing that changes it. It streams [`CorrectionRow`]s through the
//! [`RuleSet`], creating records for unknown acronyms, renaming primaries and
//! unifying records.
//!
//! Every change is visible to the rows that follow it, and replaying the same
//! rows against the result changes nothing structurally:
//!
//! ```
//! use confcite::correction::CorrectionRow;
//! use confcite::merge::RecordMerger;
//! use confcite::registry::Registry;
//! use confcite::rules::RuleSet;
//!
//! let rows = vec![
//!     CorrectionRow::new("SBQS", "Simpósio de Qualidade de Software"),
//!     CorrectionRow::new("sbqs", "").with_new_acronym("SBQS-X"),
//! ];
//!
//! let mut merger = RecordMerger::new(Registry::new(), RuleSet::new());
//! let first = merger.apply_rows(&rows);
//! assert_eq!((first.created, first.renamed), (1, 1));
//! assert_eq!(merger.apply_rows(&rows).structural_changes(), 0);
//! ```

use std::collections::HashSet;
use std::ops::AddAssign;

use crate::alias::Resolved;
use crate::config::PipelineConfig;
use crate::correction::CorrectionRow;
use crate::registry::{CompId, Registry};
use crate::rules::{Decision, RuleSet};
use crate::utils::casefold;
use crate::{ConfError, Result};

/// Counters for one pass over correction rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub rows: usize,
    pub created: usize,
    pub renamed: usize,
    pub renamed_names: usize,
    pub unified: usize,
    /// Rows that only added alternates, provenance, tiers or ids
    pub updated: usize,
    pub conflicts: usize,
    /// Assertions already superseded by a later rename
    pub skipped: usize,
}

impl MergeStats {
    /// Creations, renames and unifications. Zero once the registry has
    /// reached a fixed point.
    pub fn structural_changes(&self) -> usize {
        self.created + self.renamed + self.unified
    }
}

impl AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.rows += other.rows;
        self.created += other.created;
        self.renamed += other.renamed;
        self.renamed_names += other.renamed_names;
        self.unified += other.unified;
        self.updated += other.updated;
        self.conflicts += other.conflicts;
        self.skipped += other.skipped;
    }
}

/// One record folded into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnificationEvent {
    pub target: String,
    pub target_id: CompId,
    pub absorbed: String,
    pub absorbed_id: CompId,
}

/// What became of a rename request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Applied,
    /// The record already carries the proposed primary
    Unchanged,
    /// Another record holds the proposal and the rename was not forced
    Conflict,
    /// The proposal was demoted by an earlier rename of the same record
    Superseded,
}

/// Rounds run by [`RecordMerger::reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Changes made by applying the unification rules directly
    pub rule_unifications: MergeStats,
    /// One entry per pass over the rows; the last one is quiet
    pub rounds: Vec<MergeStats>,
}

impl Reconciliation {
    pub fn total(&self) -> MergeStats {
        let mut total = self.rule_unifications;
        for round in &self.rounds {
            total += *round;
        }
        total
    }
}

/// Applies correction rows and rules to a registry it owns.
#[derive(Debug, Clone)]
pub struct RecordMerger {
    registry: Registry,
    rules: RuleSet,
    config: PipelineConfig,
    unifications: Vec<UnificationEvent>,
    /// (record, casefolded acronym) pairs demoted by a rename in this run
    demoted_acronyms: HashSet<(CompId, String)>,
    demoted_names: HashSet<(CompId, String)>,
}

impl RecordMerger {
    pub fn new(registry: Registry, rules: RuleSet) -> Self {
        Self {
            registry,
            rules,
            config: PipelineConfig::default(),
            unifications: Vec::new(),
            demoted_acronyms: HashSet::new(),
            demoted_names: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Unifications performed so far, in order.
    pub fn unifications(&self) -> &[UnificationEvent] {
        &self.unifications
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    pub fn resolve(&self, acronym: &str) -> Option<Resolved> {
        self.registry.resolve(acronym)
    }

    /// Creates a record for an acronym nothing resolves yet.
    ///
    /// # Errors
    ///
    /// Fails for an empty acronym or one that already resolves.
    pub fn create(&mut self, acronym: &str, name: &str) -> Result<CompId> {
        if acronym.trim().is_empty() {
            return Err(ConfError::InvalidFieldValue {
                field: "acronym".to_string(),
                message: "cannot create a record without an acronym".to_string(),
            });
        }
        if let Some(existing) = self.resolve(acronym) {
            return Err(ConfError::InvalidFieldValue {
                field: "acronym".to_string(),
                message: format!("'{acronym}' already resolves to {}", existing.comp_id),
            });
        }
        Ok(self.registry.create(acronym, name))
    }

    /// Makes `new_primary` the primary acronym of `comp_id`.
    pub fn rename(&mut self, comp_id: CompId, new_primary: &str, forced: bool) -> RenameOutcome {
        self.rename_acronym(comp_id, new_primary, forced, true)
    }

    /// Folds `source` into `target`. Returns whether anything was absorbed.
    pub fn unify(&mut self, target: CompId, source: CompId) -> bool {
        let (Some(target_record), Some(source_record)) =
            (self.registry.get(target), self.registry.get(source))
        else {
            return false;
        };
        let event = UnificationEvent {
            target: target_record.primary_acronym().to_string(),
            target_id: target,
            absorbed: source_record.primary_acronym().to_string(),
            absorbed_id: source,
        };
        if !self.registry.absorb(target, source) {
            return false;
        }
        log::info!(
            "Unified {} ({}) into {} ({})",
            event.absorbed,
            event.absorbed_id,
            event.target,
            event.target_id
        );
        self.unifications.push(event);
        true
    }

    /// Applies rows in order and reports what changed.
    pub fn apply_rows(&mut self, rows: &[CorrectionRow]) -> MergeStats {
        let mut stats = MergeStats::default();
        for row in rows {
            self.apply_row(row, &mut stats);
        }
        log::info!(
            "Merged {} row(s): {} created, {} renamed, {} unified, {} updated, {} conflict(s)",
            stats.rows,
            stats.created,
            stats.renamed,
            stats.unified,
            stats.updated,
            stats.conflicts
        );
        stats
    }

    /// Applies one row. Rows without an acronym are counted as skipped.
    pub fn apply_row(&mut self, row: &CorrectionRow, stats: &mut MergeStats) {
        stats.rows += 1;
        if row.acronym.trim().is_empty() {
            log::warn!("{} line {}: row without an acronym, skipped", row.origin.file, row.line);
            stats.skipped += 1;
            return;
        }
        let before = stats.structural_changes() + stats.renamed_names;

        let (comp_id, row_is_primary) = match self.registry.resolve(&row.acronym) {
            Some(resolved) => (resolved.comp_id, resolved.is_primary),
            None => {
                let comp_id = self.registry.create(&row.acronym, &row.name);
                log::debug!("line {}: created {comp_id} for {}", row.line, row.acronym);
                stats.created += 1;
                (comp_id, true)
            }
        };

        let updated = self.absorb_row_details(comp_id, row);

        if let Some(new_name) = &row.new_name {
            if self.rename_name(comp_id, row, new_name) {
                stats.renamed_names += 1;
            } else {
                log::debug!("line {}: name of {} unchanged", row.line, row.acronym);
            }
        }

        if let Some(proposed) = &row.new_acronym {
            match self.rules.decide(&row.acronym, proposed) {
                Decision::NoOp => {}
                Decision::Rename { new_primary, forced } => {
                    match self.rename_acronym(comp_id, &new_primary, forced, row_is_primary) {
                        RenameOutcome::Applied => stats.renamed += 1,
                        RenameOutcome::Unchanged => {}
                        RenameOutcome::Conflict => stats.conflicts += 1,
                        RenameOutcome::Superseded => stats.skipped += 1,
                    }
                }
                Decision::Merge { target } => self.merge_into(comp_id, &target, stats),
            }
        }

        if updated && stats.structural_changes() + stats.renamed_names == before {
            stats.updated += 1;
        }
    }

    /// Applies every unification rule directly, targets in sorted order.
    pub fn apply_unifications(&mut self) -> MergeStats {
        let mut stats = MergeStats::default();
        let unifications: Vec<(String, Vec<String>)> = self
            .rules
            .unifications
            .iter()
            .map(|(target, unification)| (target.clone(), unification.absorbs.clone()))
            .collect();

        for (target, absorbs) in unifications {
            let target_id = match self.registry.resolve(&target) {
                Some(resolved) => {
                    if !resolved.is_primary && self.registry.rename_acronym(resolved.comp_id, &target) {
                        stats.renamed += 1;
                    }
                    resolved.comp_id
                }
                None => {
                    let Some(first) = absorbs.iter().find_map(|a| self.registry.resolve(a)) else {
                        log::debug!("Unification {target}: no record present");
                        continue;
                    };
                    if self.registry.rename_acronym(first.comp_id, &target) {
                        stats.renamed += 1;
                    }
                    first.comp_id
                }
            };

            for absorbed in &absorbs {
                let Some(resolved) = self.registry.resolve(absorbed) else {
                    continue;
                };
                if resolved.comp_id != target_id && self.unify(target_id, resolved.comp_id) {
                    stats.unified += 1;
                }
            }
        }
        stats
    }

    /// Applies the unification rules, then replays `rows` until a pass
    /// makes no structural change.
    ///
    /// # Errors
    ///
    /// [`ConfError::NoFixedPoint`] when `max_rounds` passes still change the
    /// registry.
    pub fn reconcile(&mut self, rows: &[CorrectionRow], max_rounds: usize) -> Result<Reconciliation> {
        let mut reconciliation = Reconciliation {
            rule_unifications: self.apply_unifications(),
            rounds: Vec::new(),
        };
        for round in 1..=max_rounds {
            let stats = self.apply_rows(rows);
            reconciliation.rounds.push(stats);
            if stats.structural_changes() + stats.renamed_names == 0 {
                log::info!("Registry reached a fixed point after {round} round(s)");
                return Ok(reconciliation);
            }
        }
        Err(ConfError::NoFixedPoint { rounds: max_rounds })
    }

    /// Unions the row's provenance, tier, ids and alternate names into the
    /// record. Returns whether the record changed.
    fn absorb_row_details(&mut self, comp_id: CompId, row: &CorrectionRow) -> bool {
        let corrupted = [Some(&row.name), row.alt_name.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|text| self.config.corruption_marker(text));
        if let Some(marker) = corrupted {
            log::warn!(
                "{} line {}: alternates of {} contain '{marker}', discarded",
                row.origin.file,
                row.line,
                row.acronym
            );
        }
        let corrupted = corrupted.is_some();

        let Some(record) = self.registry.get_mut(comp_id) else {
            return false;
        };
        let mut changed = record.add_provenance(&row.origin.provenance);
        changed |= record.add_committee(&row.origin.committee);
        if let Some(tier) = row.tier {
            changed |= record.raise_tier(tier);
        }
        changed |= record.external_ids.fill_from(&row.external_ids);
        if !corrupted {
            changed |= record.add_alt_name(&row.name);
            if let Some(alt_name) = &row.alt_name {
                changed |= record.add_alt_name(alt_name);
            }
        }
        changed
    }

    fn rename_acronym(
        &mut self,
        comp_id: CompId,
        new_primary: &str,
        forced: bool,
        row_is_primary: bool,
    ) -> RenameOutcome {
        let Some(record) = self.registry.get(comp_id) else {
            return RenameOutcome::Unchanged;
        };
        let old = record.primary_acronym().to_string();
        if casefold(&old) == casefold(new_primary) {
            return RenameOutcome::Unchanged;
        }

        match self.registry.resolve(new_primary) {
            Some(other) if other.comp_id != comp_id => {
                let role = if other.is_primary { "primary" } else { "alternate" };
                if !forced {
                    log::warn!(
                        "Rename {old} -> {new_primary} skipped: {new_primary} is the {role} acronym of {}",
                        other.comp_id
                    );
                    return RenameOutcome::Conflict;
                }
                log::warn!("Forced rename {old} -> {new_primary} over {role} of {}", other.comp_id);
                if !other.is_primary {
                    self.registry.remove_alt_acronym(other.comp_id, new_primary);
                }
            }
            Some(_) => {
                let key = (comp_id, casefold(new_primary));
                if !row_is_primary || self.demoted_acronyms.contains(&key) {
                    log::warn!("Rename {old} -> {new_primary} superseded by an earlier rename, skipped");
                    return RenameOutcome::Superseded;
                }
            }
            None => {}
        }

        if !self.registry.rename_acronym(comp_id, new_primary) {
            return RenameOutcome::Unchanged;
        }
        log::debug!("Renamed {old} -> {new_primary} ({comp_id})");
        self.demoted_acronyms.insert((comp_id, casefold(&old)));
        RenameOutcome::Applied
    }

    fn rename_name(&mut self, comp_id: CompId, row: &CorrectionRow, new_name: &str) -> bool {
        let Some(record) = self.registry.get(comp_id) else {
            return false;
        };
        let key = casefold(new_name);
        let old = record.primary_name().to_string();
        if casefold(&old) == key {
            return false;
        }
        let row_name_is_primary = casefold(&row.name) == casefold(&old);
        let already_alternate = record.alt_names().iter().any(|alt| casefold(alt) == key);
        if already_alternate && (!row_name_is_primary || self.demoted_names.contains(&(comp_id, key.clone()))) {
            log::warn!("Name change '{old}' -> '{new_name}' superseded, skipped");
            return false;
        }
        if !self.registry.rename_name(comp_id, new_name) {
            return false;
        }
        self.demoted_names.insert((comp_id, casefold(&old)));
        true
    }

    fn merge_into(&mut self, comp_id: CompId, target: &str, stats: &mut MergeStats) {
        match self.registry.resolve(target) {
            None => {
                if self.rename_acronym(comp_id, target, true, true) == RenameOutcome::Applied {
                    stats.renamed += 1;
                }
            }
            Some(resolved) if resolved.comp_id == comp_id => {
                if !resolved.is_primary && self.registry.rename_acronym(comp_id, target) {
                    stats.renamed += 1;
                }
            }
            Some(resolved) => {
                if !resolved.is_primary && self.registry.rename_acronym(resolved.comp_id, target) {
                    stats.renamed += 1;
                }
                if self.unify(resolved.comp_id, comp_id) {
                    stats.unified += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{IdKind, Tier};
    use pretty_assertions::assert_eq;

    const FILE: &str = "SBC-CE-ES-2024.csv";

    fn registry(csv: &str) -> Registry {
        Registry::from_csv(csv, &RuleSet::default()).unwrap()
    }

    fn row(acronym: &str, name: &str) -> CorrectionRow {
        CorrectionRow::new(acronym, name).with_origin(FILE)
    }

    fn primary_of(merger: &RecordMerger, acronym: &str) -> Option<String> {
        merger
            .registry()
            .resolve_record(acronym)
            .map(|record| record.primary_acronym().to_string())
    }

    #[test]
    fn test_default_rename() {
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name\nCompID900001,FOO,Foo Symposium\n"),
            RuleSet::default(),
        );
        let rows = vec![row("FOO", "Foo Symposium").with_new_acronym("BAR")];

        let stats = merger.apply_rows(&rows);
        assert_eq!(stats.renamed, 1);
        let record = merger.registry().resolve_record("FOO").unwrap();
        assert_eq!(record.primary_acronym(), "BAR");
        assert!(record.alt_acronyms().contains("FOO"));
        assert_eq!(record.comp_id(), CompId(900001));

        assert_eq!(merger.apply_rows(&rows).structural_changes(), 0);
    }

    #[test]
    fn test_unification_rule() {
        let rules = RuleSet::new().with_unification("DEF", &["ABC"]);
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name,alt_acronyms\nCompID900001,ABC,Alpha,XYZ\n"),
            rules,
        );

        let stats = merger.apply_unifications();
        assert_eq!(stats.renamed, 1);

        let registry = merger.registry();
        assert_eq!(registry.len(), 1);
        let record = registry.resolve_record("XYZ").unwrap();
        assert_eq!(record.primary_acronym(), "DEF");
        assert!(record.alt_acronyms().contains("ABC"));
        assert!(record.alt_acronyms().contains("XYZ"));
        assert_eq!(registry.resolve("ABC").map(|r| r.is_primary), Some(false));

        assert_eq!(merger.apply_unifications().structural_changes(), 0);
    }

    #[test]
    fn test_unification_absorbs_existing_target() {
        let rules = RuleSet::new().with_unification("DEF", &["ABC", "GHI"]);
        let mut merger = RecordMerger::new(
            registry(
                "comp_id,acronym,name,alt_acronyms,tier,dblp_id\n\
                 CompID900001,ABC,Alpha,XYZ,Top10,abc\n\
                 CompID900002,DEF,Delta,,,\n\
                 CompID900003,GHI,Gamma,,Recommended,ghi\n",
            ),
            rules,
        );

        let stats = merger.apply_unifications();
        assert_eq!(stats.unified, 2);

        let record = merger.registry().resolve_record("XYZ").unwrap();
        assert_eq!(record.comp_id(), CompId(900002));
        assert_eq!(record.tier(), Tier::Top10);
        assert_eq!(record.external_ids().get(IdKind::Dblp), Some("abc"));
        assert_eq!(
            merger
                .unifications()
                .iter()
                .map(|e| e.absorbed.as_str())
                .collect::<Vec<_>>(),
            vec!["ABC", "GHI"]
        );
    }

    #[test]
    fn test_merge_decision_from_row() {
        let rules = RuleSet::new().with_unification("DEF", &["ABC"]);
        let mut merger = RecordMerger::new(
            registry(
                "comp_id,acronym,name,alt_acronyms\n\
                 CompID900001,ABC,Alpha,XYZ\n\
                 CompID900002,DEF,Delta,\n",
            ),
            rules,
        );
        let rows = vec![row("ABC", "Alpha").with_new_acronym("DEF")];

        let stats = merger.apply_rows(&rows);
        assert_eq!(stats.unified, 1);
        assert_eq!(merger.registry().len(), 1);
        assert_eq!(
            merger.resolve("XYZ").map(|r| r.comp_id),
            Some(CompId(900002))
        );
        assert!(merger.registry().get(CompId(900001)).is_none());

        assert_eq!(merger.apply_rows(&rows).structural_changes(), 0);
    }

    #[test]
    fn test_target_renamed_to_absorbed_acronym() {
        let rules = RuleSet::new().with_unification("DEF", &["XYZ"]);
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name,alt_acronyms\nCompID900001,DEF,Delta,XYZ\n"),
            rules,
        );
        let rows = vec![row("DEF", "Delta").with_new_acronym("XYZ")];

        let reconciliation = merger.reconcile(&rows, 5).unwrap();
        assert_eq!(reconciliation.total().renamed, 1);
        assert_eq!(reconciliation.total().unified, 0);
        assert_eq!(primary_of(&merger, "DEF").as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_unknown_acronym_creates_and_renames_in_one_pass() {
        let mut merger = RecordMerger::new(Registry::new(), RuleSet::new());
        let rows = vec![
            row("NEWC", "New Conference").with_new_acronym("NEWC2"),
            row("NEWC", "New Conference"),
        ];

        let stats = merger.apply_rows(&rows);
        assert_eq!((stats.created, stats.renamed), (1, 1));
        assert_eq!(merger.registry().len(), 1);
        let record = merger.registry().resolve_record("newc").unwrap();
        assert_eq!(record.primary_acronym(), "NEWC2");
        assert!(record.comp_id().numeric() > crate::registry::NEW_ID_BASE);
        assert!(record.provenance().contains("SBC-CE-ES-2024"));
        assert!(record.committees().contains("CE-ES"));
    }

    #[test]
    fn test_rename_onto_another_primary_is_a_conflict() {
        let csv = "comp_id,acronym,name\nCompID900001,FOO,Foo\nCompID900002,BAR,Bar\n";
        let rows = vec![row("FOO", "Foo").with_new_acronym("BAR")];

        let mut merger = RecordMerger::new(registry(csv), RuleSet::new());
        let stats = merger.apply_rows(&rows);
        assert_eq!((stats.renamed, stats.conflicts), (0, 1));
        assert_eq!(primary_of(&merger, "FOO").as_deref(), Some("FOO"));

        let mut merger = RecordMerger::new(registry(csv), RuleSet::new().with_force("FOO", "BAR"));
        let stats = merger.apply_rows(&rows);
        assert_eq!((stats.renamed, stats.conflicts), (1, 0));
        assert_eq!(merger.registry().get(CompId(900001)).unwrap().primary_acronym(), "BAR");
        assert_eq!(
            merger.registry().duplicate_acronyms(),
            vec![("bar".to_string(), vec![CompId(900001), CompId(900002)])]
        );
        assert_eq!(merger.apply_rows(&rows).structural_changes(), 0);
    }

    #[test]
    fn test_forced_rename_steals_alternate() {
        let csv = "comp_id,acronym,name,alt_acronyms\nCompID900001,FOO,Foo,\nCompID900002,QUX,Qux,BAR\n";
        let rows = vec![row("FOO", "Foo").with_new_acronym("BAR")];

        let mut merger = RecordMerger::new(registry(csv), RuleSet::new());
        assert_eq!(merger.apply_rows(&rows).conflicts, 1);

        let mut merger = RecordMerger::new(registry(csv), RuleSet::new().with_force("FOO", "BAR"));
        assert_eq!(merger.apply_rows(&rows).renamed, 1);
        assert_eq!(merger.resolve("BAR").map(|r| (r.comp_id, r.is_primary)), Some((CompId(900001), true)));
        assert!(merger.registry().get(CompId(900002)).unwrap().alt_acronyms().is_empty());
    }

    #[test]
    fn test_ignore_rule_blocks_rename() {
        let rules = RuleSet::new().with_ignore("SBSI", "WCGE");
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name\nCompID900001,SBSI,Sistemas de Informação\n"),
            rules,
        );
        let stats = merger.apply_rows(&[row("SBSI", "Sistemas de Informação").with_new_acronym("WCGE")]);
        assert_eq!(stats.structural_changes(), 0);
        assert_eq!(primary_of(&merger, "SBSI").as_deref(), Some("SBSI"));
        assert!(merger.resolve("WCGE").is_none());
    }

    #[test]
    fn test_rename_chain_converges() {
        let rows = vec![
            row("A", "Alpha").with_new_acronym("B"),
            row("B", "Alpha").with_new_acronym("C"),
        ];
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name\nCompID900001,A,Alpha\n"),
            RuleSet::new(),
        );
        assert_eq!(merger.apply_rows(&rows).renamed, 2);
        assert_eq!(primary_of(&merger, "A").as_deref(), Some("C"));

        let second = merger.apply_rows(&rows);
        assert_eq!(second.structural_changes(), 0);
        assert_eq!(second.skipped, 1);

        let mut fresh = RecordMerger::new(merger.into_registry(), RuleSet::new());
        assert_eq!(fresh.apply_rows(&rows).structural_changes(), 0);
    }

    #[test]
    fn test_contradictory_renames_converge() {
        let rows = vec![
            row("FOO", "Foo").with_new_acronym("BAR"),
            row("BAR", "Foo").with_new_acronym("FOO"),
        ];
        let mut merger = RecordMerger::new(Registry::new(), RuleSet::new());
        let reconciliation = merger.reconcile(&rows, 5).unwrap();

        assert_eq!(reconciliation.rounds.len(), 2);
        assert_eq!(reconciliation.total().created, 1);
        assert_eq!(primary_of(&merger, "FOO").as_deref(), Some("BAR"));
    }

    #[test]
    fn test_tier_ids_and_provenance() {
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name,tier,dblp_id,provenance\nCompID900001,SBES,SBES,Top20,sbes,Qualis\n"),
            RuleSet::new(),
        );
        let rows = vec![
            row("SBES", "SBES")
                .with_tier(Tier::Recommended)
                .with_external_id(IdKind::Dblp, "other")
                .with_external_id(IdKind::Scholar, "gs1"),
            CorrectionRow::new("sbes", "SBES")
                .with_origin("SBC-CE-SE-2024.csv")
                .with_tier(Tier::Top10),
        ];
        let stats = merger.apply_rows(&rows);
        assert_eq!(stats.updated, 2);
        assert_eq!(stats.structural_changes(), 0);

        let record = merger.registry().get(CompId(900001)).unwrap();
        assert_eq!(record.tier(), Tier::Top10);
        assert_eq!(record.external_ids().get(IdKind::Dblp), Some("sbes"));
        assert_eq!(record.external_ids().get(IdKind::Scholar), Some("gs1"));
        assert_eq!(
            record.provenance().iter().collect::<Vec<_>>(),
            vec!["Qualis", "SBC-CE-ES-2024", "SBC-CE-SE-2024"]
        );

        assert_eq!(merger.apply_rows(&rows).updated, 0);
    }

    #[test]
    fn test_alternate_names_and_corruption() {
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name\nCompID900001,SBRC,Simpósio Brasileiro de Redes\n"),
            RuleSet::new(),
        );
        merger.apply_rows(&[
            row("SBRC", "Brazilian Symposium on Networks").with_alt_name("SBRC Symposium"),
            row("SBRC", "Simpósio Brasileiro de Redes").with_alt_name("https://sbrc.sbc.org.br"),
        ]);

        let record = merger.registry().get(CompId(900001)).unwrap();
        assert_eq!(
            record.alt_names().iter().collect::<Vec<_>>(),
            vec!["Brazilian Symposium on Networks", "SBRC Symposium"]
        );
    }

    #[test]
    fn test_name_rename() {
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name\nCompID900001,WEI,Workshop\n"),
            RuleSet::new(),
        );
        let rows = vec![row("WEI", "Workshop").with_new_name("Workshop sobre Educação em Computação")];

        assert_eq!(merger.apply_rows(&rows).renamed_names, 1);
        let record = merger.registry().get(CompId(900001)).unwrap();
        assert_eq!(record.primary_name(), "Workshop sobre Educação em Computação");
        assert!(record.alt_names().contains("Workshop"));

        assert_eq!(merger.apply_rows(&rows).renamed_names, 0);
    }

    #[test]
    fn test_fixed_point_on_fresh_merger() {
        let rules = RuleSet::new().with_unification("DEF", &["ABC"]);
        let csv = "comp_id,acronym,name,alt_acronyms\n\
                   CompID900001,ABC,Alpha Conference,XYZ\n\
                   CompID900002,DEF,Delta,\n\
                   CompID900003,SBES,Simpósio Brasileiro de Engenharia de Software,\n";
        let rows = vec![
            row("ABC", "Alpha Conference").with_new_acronym("DEF"),
            row("SBES", "Simpósio Brasileiro de Engenharia de Software")
                .with_tier(Tier::Top10)
                .with_alt_name("Brazilian Symposium on Software Engineering"),
            row("NEWC", "New Conference").with_new_acronym("NEWC2"),
            row("WEI", "Workshop").with_new_name("Workshop sobre Educação"),
        ];

        let mut merger = RecordMerger::new(registry(csv), rules.clone());
        let first = merger.apply_rows(&rows);
        assert_eq!(
            first,
            MergeStats {
                rows: 4,
                created: 2,
                renamed: 1,
                renamed_names: 1,
                unified: 1,
                updated: 1,
                conflicts: 0,
                skipped: 0,
            }
        );

        let mut fresh = RecordMerger::new(merger.into_registry(), rules);
        let second = fresh.apply_rows(&rows);
        assert_eq!(second.structural_changes(), 0);
        assert_eq!(second.renamed_names, 0);
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_rows_without_acronym_are_skipped() {
        let rows = vec![row("", "Nameless"), row("  ", "Blank")];
        let mut merger = RecordMerger::new(Registry::new(), RuleSet::new());

        let first = merger.apply_rows(&rows);
        assert_eq!((first.created, first.skipped), (0, 2));
        assert!(merger.registry().is_empty());

        let reconciliation = merger.reconcile(&rows, 3).unwrap();
        assert_eq!(reconciliation.rounds.len(), 1);
        assert!(merger.registry().is_empty());
    }

    #[test]
    fn test_create_rejects_known_acronyms() {
        let mut merger = RecordMerger::new(
            registry("comp_id,acronym,name\nCompID900001,FOO,Foo\n"),
            RuleSet::new(),
        );
        assert!(merger.create("foo", "Foo").is_err());
        assert!(merger.create(" ", "Blank").is_err());
        assert!(merger.create("BAR", "Bar").is_ok());
    }
}
