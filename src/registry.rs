//! Canonical conference registry.
//!
//! One [`ConferenceRecord`] per conference identity, keyed by a stable
//! [`CompId`]. The registry keeps its [`AliasIndex`] in step with every
//! change, so a lookup always sees the effect of earlier merges. Only the
//! [`RecordMerger`](crate::merge::RecordMerger) changes records; everything
//! else reads them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::alias::{AliasIndex, Resolved};
use crate::config::PipelineConfig;
use crate::rules::RuleSet;
use crate::utils::casefold;
use crate::{ConfError, Result};

mod structure;

use structure::{REGISTRY_COLUMNS, RegistryColumns};

/// First id handed to records created during a merge.
pub const NEW_ID_BASE: u32 = 800_000;

const ID_PREFIX: &str = "CompID";

/// Stable identifier of a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompId(pub u32);

impl CompId {
    /// Numeric part, used as the key of exported tables.
    pub fn numeric(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ID_PREFIX}{}", self.0)
    }
}

impl FromStr for CompId {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s
            .get(..ID_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(ID_PREFIX))
            .map(|_| &s[ID_PREFIX.len()..])
            .unwrap_or(s);
        digits
            .parse()
            .map(CompId)
            .map_err(|_| ConfError::InvalidFieldValue {
                field: "comp_id".to_string(),
                message: format!("'{s}' is not a CompID"),
            })
    }
}

/// Evaluation tier, ordered `None < Recommended < Top20 < Top10`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    #[default]
    None,
    Recommended,
    Top20,
    Top10,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "",
            Tier::Recommended => "Recommended",
            Tier::Top20 => "Top20",
            Tier::Top10 => "Top10",
        }
    }

    /// Parses a registry cell. Several `|`-joined tiers resolve to the highest.
    pub fn parse(value: &str) -> Tier {
        value
            .split('|')
            .map(|part| match part.trim().to_lowercase().as_str() {
                "top10" => Tier::Top10,
                "top20" => Tier::Top20,
                "recommended" => Tier::Recommended,
                _ => Tier::None,
            })
            .max()
            .unwrap_or_default()
    }

    /// Normalizes a committee's free-text tier marker.
    ///
    /// Blank and unrecognized markers count as [`Tier::Recommended`], the
    /// latter with a warning.
    pub fn from_marker(marker: &str) -> Tier {
        let normalized: String = marker
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if normalized.is_empty() {
            Tier::Recommended
        } else if normalized.starts_with("top10") {
            Tier::Top10
        } else if normalized.starts_with("top20") {
            Tier::Top20
        } else if normalized.starts_with("eventos") {
            Tier::Recommended
        } else {
            log::warn!("Unrecognized tier marker '{marker}', using Recommended");
            Tier::Recommended
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of identifiers held by external bibliographic services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IdKind {
    /// Google Scholar Metrics venue id
    Scholar,
    /// DBLP conference stream key
    Dblp,
    /// SBC OpenLib (SOL) journal path
    Sol,
}

impl IdKind {
    pub const ALL: [IdKind; 3] = [IdKind::Scholar, IdKind::Dblp, IdKind::Sol];

    pub fn label(&self) -> &'static str {
        match self {
            IdKind::Scholar => "Google Scholar",
            IdKind::Dblp => "DBLP",
            IdKind::Sol => "SOL",
        }
    }
}

/// External ids of a record. Once set, an id is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalIds(BTreeMap<IdKind, String>);

impl ExternalIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: IdKind) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IdKind, &str)> {
        self.0.iter().map(|(kind, value)| (*kind, value.as_str()))
    }

    /// Sets `kind` unless it already holds a value. Returns whether it changed.
    pub fn set_if_empty(&mut self, kind: IdKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.0.contains_key(&kind) {
            return false;
        }
        self.0.insert(kind, value.to_string());
        true
    }

    /// Copies every id of `other` missing here.
    pub fn fill_from(&mut self, other: &ExternalIds) -> bool {
        let mut changed = false;
        for (kind, value) in other.iter() {
            changed |= self.set_if_empty(kind, value);
        }
        changed
    }
}

/// The single authoritative entry for one conference identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceRecord {
    pub(crate) comp_id: CompId,
    pub(crate) primary_acronym: String,
    pub(crate) primary_name: String,
    pub(crate) alt_acronyms: BTreeSet<String>,
    pub(crate) alt_names: BTreeSet<String>,
    pub(crate) provenance: BTreeSet<String>,
    pub(crate) committees: BTreeSet<String>,
    pub(crate) tier: Tier,
    pub(crate) external_ids: ExternalIds,
    pub(crate) society: String,
    pub(crate) data_year: Option<i32>,
}

impl ConferenceRecord {
    pub(crate) fn new(comp_id: CompId, acronym: &str, name: &str) -> Self {
        Self {
            comp_id,
            primary_acronym: acronym.trim().to_string(),
            primary_name: name.trim().to_string(),
            alt_acronyms: BTreeSet::new(),
            alt_names: BTreeSet::new(),
            provenance: BTreeSet::new(),
            committees: BTreeSet::new(),
            tier: Tier::None,
            external_ids: ExternalIds::new(),
            society: String::new(),
            data_year: None,
        }
    }

    pub fn comp_id(&self) -> CompId {
        self.comp_id
    }

    pub fn primary_acronym(&self) -> &str {
        &self.primary_acronym
    }

    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    pub fn alt_acronyms(&self) -> &BTreeSet<String> {
        &self.alt_acronyms
    }

    pub fn alt_names(&self) -> &BTreeSet<String> {
        &self.alt_names
    }

    pub fn provenance(&self) -> &BTreeSet<String> {
        &self.provenance
    }

    /// Committees whose files listed this record.
    pub fn committees(&self) -> &BTreeSet<String> {
        &self.committees
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn external_ids(&self) -> &ExternalIds {
        &self.external_ids
    }

    pub fn society(&self) -> &str {
        &self.society
    }

    pub fn data_year(&self) -> Option<i32> {
        self.data_year
    }

    /// Whether `acronym` names this record as primary or alternate.
    pub fn answers_to(&self, acronym: &str) -> bool {
        let key = casefold(acronym);
        casefold(&self.primary_acronym) == key || self.alt_acronyms.iter().any(|a| casefold(a) == key)
    }

    /// Adds an alternate acronym unless it is empty or the primary itself.
    pub(crate) fn add_alt_acronym(&mut self, acronym: &str) -> bool {
        let acronym = acronym.trim();
        if acronym.is_empty() || casefold(acronym) == casefold(&self.primary_acronym) {
            return false;
        }
        self.alt_acronyms.insert(acronym.to_string())
    }

    /// Adds an alternate name unless it is empty or the primary itself.
    pub(crate) fn add_alt_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || casefold(name) == casefold(&self.primary_name) {
            return false;
        }
        self.alt_names.insert(name.to_string())
    }

    /// Raises the tier if `tier` ranks higher. Never lowers it.
    pub(crate) fn raise_tier(&mut self, tier: Tier) -> bool {
        if tier > self.tier {
            self.tier = tier;
            true
        } else {
            false
        }
    }

    pub(crate) fn add_provenance(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        !tag.is_empty() && self.provenance.insert(tag.to_string())
    }

    pub(crate) fn add_committee(&mut self, committee: &str) -> bool {
        let committee = committee.trim();
        !committee.is_empty() && self.committees.insert(committee.to_string())
    }
}

/// A registry record removed at load time by a `registry_duplicates` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDuplicate {
    pub acronym: String,
    pub comp_id: CompId,
}

/// The canonical conference registry.
#[derive(Debug, Clone)]
pub struct Registry {
    records: BTreeMap<CompId, ConferenceRecord>,
    aliases: AliasIndex,
    /// Every id ever present in this run, including retired ones
    issued: BTreeSet<CompId>,
    next_serial: u32,
    removed_duplicates: Vec<RemovedDuplicate>,
    list_delimiter: char,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            aliases: AliasIndex::default(),
            issued: BTreeSet::new(),
            next_serial: 1,
            removed_duplicates: Vec::new(),
            list_delimiter: '|',
        }
    }

    /// Builds a registry from records, indexing their aliases.
    pub fn from_records(records: impl IntoIterator<Item = ConferenceRecord>) -> Self {
        let mut registry = Self::new();
        for record in records {
            registry.issued.insert(record.comp_id);
            if registry.records.insert(record.comp_id, record).is_some() {
                log::warn!("Registry lists the same CompID twice, keeping the last row");
            }
        }
        registry.aliases = AliasIndex::build(registry.records.values());
        registry
    }

    /// Parses a registry table.
    ///
    /// Records named by the rule set's `registry_duplicates` are dropped before
    /// the alias index is built.
    ///
    /// # Errors
    ///
    /// Fails when the `acronym` or `comp_id` column is missing or the CSV is
    /// malformed.
    pub fn from_csv(input: &str, rules: &RuleSet) -> Result<Self> {
        Self::load(input, rules, &PipelineConfig::default())
    }

    /// Parses a registry table using the list delimiter of `config`.
    pub fn load(input: &str, rules: &RuleSet, config: &PipelineConfig) -> Result<Self> {
        let records = structure::parse_registry(input, config.list_delimiter)?;
        let to_remove = rules.registry_removals();

        let mut removed = Vec::new();
        let kept: Vec<ConferenceRecord> = records
            .into_iter()
            .filter(|record| match to_remove.get(&record.comp_id) {
                Some(acronym) => {
                    log::info!(
                        "Removing registry duplicate {} ({})",
                        record.comp_id,
                        record.primary_acronym
                    );
                    removed.push(RemovedDuplicate {
                        acronym: acronym.clone(),
                        comp_id: record.comp_id,
                    });
                    false
                }
                None => true,
            })
            .collect();

        let mut registry = Self::from_records(kept);
        for duplicate in &removed {
            registry.issued.insert(duplicate.comp_id);
        }
        registry.removed_duplicates = removed;
        registry.list_delimiter = config.list_delimiter;
        log::info!("Loaded {} conference(s) from the registry", registry.len());
        Ok(registry)
    }

    /// Reads a registry table from disk.
    pub fn read(path: impl AsRef<Path>, rules: &RuleSet, config: &PipelineConfig) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::load(&input, rules, config)
    }

    /// Writes the registry back in its own table schema.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(REGISTRY_COLUMNS.iter().map(|(name, _, _)| *name))?;
        for record in self.records() {
            writer.write_record(RegistryColumns::row(record, self.list_delimiter))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in `CompId` order.
    pub fn records(&self) -> impl Iterator<Item = &ConferenceRecord> {
        self.records.values()
    }

    pub fn get(&self, comp_id: CompId) -> Option<&ConferenceRecord> {
        self.records.get(&comp_id)
    }

    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    /// Looks an acronym up among primaries, then alternates.
    pub fn resolve(&self, acronym: &str) -> Option<Resolved> {
        self.aliases.resolve(acronym)
    }

    pub fn resolve_record(&self, acronym: &str) -> Option<&ConferenceRecord> {
        self.resolve(acronym)
            .and_then(|resolved| self.records.get(&resolved.comp_id))
    }

    /// Records dropped at load by `registry_duplicates` rules.
    pub fn removed_duplicates(&self) -> &[RemovedDuplicate] {
        &self.removed_duplicates
    }

    /// Primary acronyms (casefolded) held by more than one record.
    pub fn duplicate_acronyms(&self) -> Vec<(String, Vec<CompId>)> {
        let mut by_acronym: BTreeMap<String, Vec<CompId>> = BTreeMap::new();
        for record in self.records() {
            by_acronym
                .entry(casefold(&record.primary_acronym))
                .or_default()
                .push(record.comp_id);
        }
        by_acronym
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .collect()
    }

    pub(crate) fn get_mut(&mut self, comp_id: CompId) -> Option<&mut ConferenceRecord> {
        self.records.get_mut(&comp_id)
    }

    /// Allocates a fresh id and inserts an empty record for it.
    pub(crate) fn create(&mut self, acronym: &str, name: &str) -> CompId {
        let comp_id = self.allocate_id();
        let record = ConferenceRecord::new(comp_id, acronym, name);
        self.aliases.insert_primary(&record.primary_acronym, comp_id);
        self.records.insert(comp_id, record);
        comp_id
    }

    fn allocate_id(&mut self) -> CompId {
        loop {
            let candidate = CompId(NEW_ID_BASE + self.next_serial.max(1));
            self.next_serial = self.next_serial.max(1) + 1;
            if self.issued.insert(candidate) {
                return candidate;
            }
        }
    }

    /// Drops an alternate acronym from a record and from the index.
    pub(crate) fn remove_alt_acronym(&mut self, comp_id: CompId, acronym: &str) -> bool {
        let key = casefold(acronym);
        let Some(record) = self.records.get_mut(&comp_id) else {
            return false;
        };
        let before = record.alt_acronyms.len();
        record.alt_acronyms.retain(|alt| casefold(alt) != key);
        self.aliases.remove_alternate(acronym, comp_id);
        record.alt_acronyms.len() != before
    }

    /// Replaces the primary acronym; the old one becomes an alternate.
    pub(crate) fn rename_acronym(&mut self, comp_id: CompId, new_acronym: &str) -> bool {
        let new_acronym = new_acronym.trim();
        let Some(record) = self.records.get_mut(&comp_id) else {
            return false;
        };
        if new_acronym.is_empty() || record.primary_acronym == new_acronym {
            return false;
        }
        let old = std::mem::replace(&mut record.primary_acronym, new_acronym.to_string());
        let key = casefold(new_acronym);
        record.alt_acronyms.retain(|alt| casefold(alt) != key);
        record.add_alt_acronym(&old);
        self.aliases.rename(&old, new_acronym, comp_id);
        true
    }

    /// Replaces the primary name; the old one becomes an alternate.
    pub(crate) fn rename_name(&mut self, comp_id: CompId, new_name: &str) -> bool {
        let new_name = new_name.trim();
        let Some(record) = self.records.get_mut(&comp_id) else {
            return false;
        };
        if new_name.is_empty() || record.primary_name == new_name {
            return false;
        }
        let old = std::mem::replace(&mut record.primary_name, new_name.to_string());
        let key = casefold(new_name);
        record.alt_names.retain(|alt| casefold(alt) != key);
        record.add_alt_name(&old);
        true
    }

    /// Folds `source` into `target` and removes `source`.
    ///
    /// Acronyms, names, provenance and committees are unioned, the tier is
    /// the higher of the two, and ids, society and data year are only filled
    /// where `target` has none. Every alias of `source` resolves to `target`
    /// afterwards, except acronyms another record holds as primary: those keep
    /// resolving to that record and the overlap is recorded as a collision.
    pub(crate) fn absorb(&mut self, target: CompId, source: CompId) -> bool {
        if target == source || !self.records.contains_key(&target) {
            return false;
        }
        let Some(absorbed) = self.records.remove(&source) else {
            return false;
        };
        let Some(record) = self.records.get_mut(&target) else {
            return false;
        };

        record.add_alt_acronym(&absorbed.primary_acronym);
        for alt in &absorbed.alt_acronyms {
            record.add_alt_acronym(alt);
        }
        record.add_alt_name(&absorbed.primary_name);
        for alt in &absorbed.alt_names {
            record.add_alt_name(alt);
        }
        record.provenance.extend(absorbed.provenance.iter().cloned());
        record.committees.extend(absorbed.committees.iter().cloned());
        record.raise_tier(absorbed.tier);
        record.external_ids.fill_from(&absorbed.external_ids);
        if record.society.is_empty() {
            record.society = absorbed.society.clone();
        }
        if record.data_year.is_none() {
            record.data_year = absorbed.data_year;
        }

        self.aliases.redirect(source, target);
        // a shadowed primary is not moved by the redirect
        self.aliases.insert_alternate(&absorbed.primary_acronym, target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::CollisionKind;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const REGISTRY: &str = "\
ID Conferencia,Sigla,Nome do evento,Siglas Alternativas,Nomes Alternativos,Origem Cadastro,Avaliação SBC,GS ID,DBLP ID,SOL ID,Sociedade,Ano Dados
CompID900001,ABC,Alpha Conference,XYZ,Old Alpha,Qualis 2017,Top20,abc1,abc,,SBC,2024
CompID900002,DEF,Delta Conference,,,Qualis 2017,,,,,,
CompID900003,GHI,Gamma Symposium,,,Qualis 2017,Recommended,,,,,2023.0
";

    #[rstest]
    #[case("CompID900001", Some(900001))]
    #[case("compid800002", Some(800002))]
    #[case("42", Some(42))]
    #[case("CompIDx", None)]
    #[case("", None)]
    fn test_comp_id_parse(#[case] input: &str, #[case] expected: Option<u32>) {
        assert_eq!(input.parse::<CompId>().ok().map(|id| id.0), expected);
    }

    #[test]
    fn test_comp_id_display() {
        assert_eq!(CompId(800001).to_string(), "CompID800001");
    }

    #[rstest]
    #[case("Top10", Tier::Top10)]
    #[case("top20", Tier::Top20)]
    #[case("Recommended|Top10", Tier::Top10)]
    #[case("", Tier::None)]
    fn test_tier_parse(#[case] input: &str, #[case] expected: Tier) {
        assert_eq!(Tier::parse(input), expected);
    }

    #[rstest]
    #[case("Top 10", Tier::Top10)]
    #[case("top20 - SE", Tier::Top20)]
    #[case("Eventos Recomendados", Tier::Recommended)]
    #[case("something else", Tier::Recommended)]
    #[case("", Tier::Recommended)]
    fn test_tier_from_marker(#[case] input: &str, #[case] expected: Tier) {
        assert_eq!(Tier::from_marker(input), expected);
    }

    #[test]
    fn test_tier_order() {
        assert!(Tier::Top10 > Tier::Top20);
        assert!(Tier::Top20 > Tier::Recommended);
        assert!(Tier::Recommended > Tier::None);
    }

    #[test]
    fn test_external_ids_first_wins() {
        let mut ids = ExternalIds::new();
        assert!(ids.set_if_empty(IdKind::Dblp, "sbes"));
        assert!(!ids.set_if_empty(IdKind::Dblp, "other"));
        assert!(!ids.set_if_empty(IdKind::Scholar, "  "));
        assert_eq!(ids.get(IdKind::Dblp), Some("sbes"));
        assert_eq!(ids.get(IdKind::Scholar), None);
    }

    #[test]
    fn test_from_csv() {
        let registry = Registry::from_csv(REGISTRY, &RuleSet::default()).unwrap();
        assert_eq!(registry.len(), 3);

        let abc = registry.resolve_record("xyz").unwrap();
        assert_eq!(abc.comp_id(), CompId(900001));
        assert_eq!(abc.primary_name(), "Alpha Conference");
        assert_eq!(abc.tier(), Tier::Top20);
        assert_eq!(abc.external_ids().get(IdKind::Scholar), Some("abc1"));
        assert_eq!(abc.society(), "SBC");
        assert_eq!(abc.data_year(), Some(2024));
        assert!(abc.alt_names().contains("Old Alpha"));

        let ghi = registry.get(CompId(900003)).unwrap();
        assert_eq!(ghi.data_year(), Some(2023));
    }

    #[test]
    fn test_from_csv_removes_listed_duplicates() {
        let rules = RuleSet::from_json(
            r#"{"registry_duplicates": {"unify": {"DEF": {"remove": ["CompID900002"]}}}}"#,
        )
        .unwrap();
        let registry = Registry::from_csv(REGISTRY, &rules).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("DEF").is_none());
        assert_eq!(
            registry.removed_duplicates(),
            &[RemovedDuplicate {
                acronym: "DEF".to_string(),
                comp_id: CompId(900002)
            }]
        );
    }

    #[test]
    fn test_missing_acronym_column_is_fatal() {
        let result = Registry::from_csv("ID Conferencia,Nome do evento\nCompID1,X\n", &RuleSet::default());
        assert!(matches!(
            result,
            Err(ConfError::MissingColumn { column, .. }) if column == "acronym"
        ));
    }

    #[test]
    fn test_created_ids_are_fresh() {
        let mut registry = Registry::from_records(vec![ConferenceRecord::new(
            CompId(NEW_ID_BASE + 1),
            "OLD",
            "Old",
        )]);
        let a = registry.create("NEW", "New");
        let b = registry.create("NEWER", "Newer");
        assert_eq!(a, CompId(NEW_ID_BASE + 2));
        assert_eq!(b, CompId(NEW_ID_BASE + 3));
        assert_eq!(registry.resolve("new").map(|r| r.comp_id), Some(a));
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let mut registry = Registry::new();
        let a = registry.create("A", "A");
        let b = registry.create("B", "B");
        assert!(registry.absorb(a, b));
        let c = registry.create("C", "C");
        assert_ne!(c, b);
        assert!(registry.get(b).is_none());
    }

    #[test]
    fn test_rename_acronym_keeps_old_as_alternate() {
        let mut registry = Registry::from_csv(REGISTRY, &RuleSet::default()).unwrap();
        assert!(registry.rename_acronym(CompId(900001), "XYZ"));

        let record = registry.get(CompId(900001)).unwrap();
        assert_eq!(record.primary_acronym(), "XYZ");
        assert_eq!(
            record.alt_acronyms().iter().collect::<Vec<_>>(),
            vec!["ABC"]
        );
        let resolved = registry.resolve("xyz").unwrap();
        assert!(resolved.is_primary);
        let resolved = registry.resolve("ABC").unwrap();
        assert!(!resolved.is_primary);
        assert_eq!(resolved.comp_id, CompId(900001));
    }

    #[test]
    fn test_absorb() {
        let mut registry = Registry::from_csv(REGISTRY, &RuleSet::default()).unwrap();
        assert!(registry.absorb(CompId(900002), CompId(900001)));

        assert_eq!(registry.len(), 2);
        let target = registry.get(CompId(900002)).unwrap();
        assert_eq!(target.primary_acronym(), "DEF");
        assert!(target.alt_acronyms().contains("ABC"));
        assert!(target.alt_acronyms().contains("XYZ"));
        assert!(target.alt_names().contains("Alpha Conference"));
        assert_eq!(target.tier(), Tier::Top20);
        assert_eq!(target.external_ids().get(IdKind::Dblp), Some("abc"));
        assert_eq!(target.society(), "SBC");

        for acronym in ["ABC", "XYZ", "DEF"] {
            assert_eq!(
                registry.resolve(acronym).map(|r| r.comp_id),
                Some(CompId(900002)),
                "{acronym}"
            );
        }
    }

    #[test]
    fn test_absorb_shadowed_primary() {
        let mut registry = Registry::from_csv(
            "comp_id,acronym,name\nCompID900001,X,First X\nCompID900002,X,Second X\nCompID900003,Y,Why\n",
            &RuleSet::default(),
        )
        .unwrap();
        assert!(registry.absorb(CompId(900003), CompId(900002)));

        assert!(registry.get(CompId(900003)).unwrap().alt_acronyms().contains("X"));
        assert_eq!(
            registry.resolve("X").map(|r| (r.comp_id, r.is_primary)),
            Some((CompId(900001), true))
        );
        let last = registry.aliases().collisions().last().unwrap();
        assert_eq!(
            (last.acronym.as_str(), last.kind, last.kept, last.shadowed),
            ("X", CollisionKind::ShadowedByPrimary, CompId(900001), CompId(900003))
        );
    }

    #[test]
    fn test_write_csv_round_trips_content() {
        let registry = Registry::from_csv(REGISTRY, &RuleSet::default()).unwrap();
        let mut out = Vec::new();
        registry.write_csv(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();

        let reread = Registry::from_csv(&written, &RuleSet::default()).unwrap();
        let before: Vec<_> = registry.records().cloned().collect();
        let after: Vec<_> = reread.records().cloned().collect();
        assert_eq!(before, after);
    }
}
