//! Export tables built from the merged registry.
//!
//! Three tables are produced: conferences, their additional names and their
//! editions. Alternate names scraped over the years are noisy, so they are
//! cleaned before export: corrupted lists are dropped whole, invalid or
//! near-duplicate names are skipped, and only a few survive per record.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::regex::Regex;
use crate::registry::{ConferenceRecord, IdKind, Registry};
use crate::{ConfError, Result};

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*$").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static META_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(foi\s+incorporad|merged\s+with|now\s+called|see\s+also|renamed\s+to|\d{4}$|h5\s+\d+|impact\s+factor)",
    )
    .unwrap()
});

const TYPO_FIXES: &[(&str, &str)] = &[
    ("Workshp", "Workshop"),
    ("Conferece", "Conference"),
    ("Internation ", "International "),
    ("Compuer", "Computer"),
    ("Symposim", "Symposium"),
    ("Proccedings", "Proceedings"),
    ("Intelligene", "Intelligence"),
];

const NAME_REWRITES: &[(&str, &str)] = &[
    ("IEEE International", "IEEE"),
    ("ACM International", "ACM"),
    ("International Conference", "Conference"),
    ("Proceedings of the", ""),
    ("Proceedings", "Conference"),
];

const MIN_NAME_LEN: usize = 5;
const MIN_ACRONYM_LEN: usize = 2;
const SIMILARITY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConferenceRow {
    pub cs_id: u32,
    pub name: String,
    pub acronym: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalNameRow {
    pub additional_name_id: usize,
    pub cs_id: u32,
    pub additional_name: String,
    pub additional_acronym: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditionRow {
    pub edition_id: usize,
    pub cs_id: u32,
    pub name: String,
    pub acronym: String,
    pub society: String,
    pub year: i32,
    pub id_scholar_conference: String,
    pub id_dblp_conference: String,
}

/// Which alternate set is being cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateKind {
    Acronym,
    Name,
}

impl AlternateKind {
    fn min_len(&self) -> usize {
        match self {
            AlternateKind::Acronym => MIN_ACRONYM_LEN,
            AlternateKind::Name => MIN_NAME_LEN,
        }
    }
}

/// The three export tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTables {
    pub conferences: Vec<ConferenceRow>,
    pub additional_names: Vec<AdditionalNameRow>,
    pub editions: Vec<EditionRow>,
    /// Alternates present in the registry but not exported
    pub alternates_dropped: usize,
}

impl ExportTables {
    /// Checks referential integrity and completeness.
    ///
    /// Returns the warnings on success.
    ///
    /// # Errors
    ///
    /// [`ConfError::Validation`] for orphan rows and for conferences with an
    /// empty name or acronym.
    pub fn validate(&self, config: &PipelineConfig) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let orphans = self.orphans();
        if orphans.additional_names > 0 {
            errors.push(format!("Orphan records in additional_names: {}", orphans.additional_names));
        }
        if orphans.editions > 0 {
            errors.push(format!("Orphan records in editions: {}", orphans.editions));
        }
        let (empty_names, empty_acronyms) = self.empty_fields();
        if empty_names > 0 {
            errors.push(format!("Conferences with empty names: {empty_names}"));
        }
        if empty_acronyms > 0 {
            errors.push(format!("Conferences with empty acronyms: {empty_acronyms}"));
        }

        let duplicates = self.duplicate_acronyms();
        if !duplicates.is_empty() {
            warnings.push(format!(
                "Duplicate acronyms: {}",
                duplicates.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            ));
        }
        let total = self.conferences.len();
        let expected = &config.expected_counts;
        if total < expected.min_conferences {
            warnings.push(format!(
                "Total conferences ({total}) below expected minimum ({})",
                expected.min_conferences
            ));
        }
        if total > expected.max_conferences {
            warnings.push(format!(
                "Total conferences ({total}) above expected maximum ({})",
                expected.max_conferences
            ));
        }

        for warning in &warnings {
            log::warn!("{warning}");
        }
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfError::Validation(errors))
        }
    }

    /// Distinct `cs_id`s referenced by child tables but missing from
    /// conferences.
    pub fn orphans(&self) -> Orphans {
        let ids: HashSet<u32> = self.conferences.iter().map(|c| c.cs_id).collect();
        Orphans {
            additional_names: count_orphans(&ids, self.additional_names.iter().map(|a| a.cs_id)),
            editions: count_orphans(&ids, self.editions.iter().map(|e| e.cs_id)),
        }
    }

    /// Counts of conferences with an empty name and with an empty acronym.
    pub fn empty_fields(&self) -> (usize, usize) {
        let names = self.conferences.iter().filter(|c| c.name.trim().is_empty()).count();
        let acronyms = self
            .conferences
            .iter()
            .filter(|c| c.acronym.trim().is_empty())
            .count();
        (names, acronyms)
    }

    /// Exported acronyms shared by more than one conference, with their count.
    pub fn duplicate_acronyms(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for conference in &self.conferences {
            *counts.entry(conference.acronym.clone()).or_default() += 1;
        }
        counts.retain(|_, count| *count > 1);
        counts
    }

    pub fn write_conferences<W: io::Write>(&self, writer: W) -> Result<()> {
        write_rows(writer, &self.conferences)
    }

    pub fn write_additional_names<W: io::Write>(&self, writer: W) -> Result<()> {
        write_rows(writer, &self.additional_names)
    }

    pub fn write_editions<W: io::Write>(&self, writer: W) -> Result<()> {
        write_rows(writer, &self.editions)
    }

    /// Validates the tables, then writes `conferences.csv`,
    /// `additional_names.csv` and `editions.csv` into `dir`. Returns the
    /// validation warnings.
    ///
    /// # Errors
    ///
    /// [`ConfError::Validation`] before any file is created when the tables
    /// fail validation, or an I/O error while writing.
    pub fn write_dir(&self, dir: impl AsRef<Path>, config: &PipelineConfig) -> Result<Vec<String>> {
        let warnings = self.validate(config)?;
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.write_conferences(std::fs::File::create(dir.join("conferences.csv"))?)?;
        self.write_additional_names(std::fs::File::create(dir.join("additional_names.csv"))?)?;
        self.write_editions(std::fs::File::create(dir.join("editions.csv"))?)?;
        log::info!(
            "Wrote {} conference(s), {} additional name(s), {} edition(s) to {}",
            self.conferences.len(),
            self.additional_names.len(),
            self.editions.len(),
            dir.display()
        );
        Ok(warnings)
    }
}

/// Orphan counts per child table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orphans {
    pub additional_names: usize,
    pub editions: usize,
}

fn count_orphans(ids: &HashSet<u32>, children: impl Iterator<Item = u32>) -> usize {
    children
        .filter(|id| !ids.contains(id))
        .collect::<HashSet<_>>()
        .len()
}

fn write_rows<W: io::Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Builds export tables from a registry.
#[derive(Debug, Clone)]
pub struct Exporter {
    config: PipelineConfig,
}

impl Exporter {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Builds every table. Records are visited in `CompId` order.
    pub fn export(&self, registry: &Registry) -> ExportTables {
        let mut tables = ExportTables::default();
        for record in registry.records() {
            let cs_id = record.comp_id().numeric();
            tables.conferences.push(ConferenceRow {
                cs_id,
                name: record.primary_name().to_string(),
                acronym: record.primary_acronym().to_string(),
            });

            let acronyms = self.clean_alternates(
                record.alt_acronyms(),
                record.primary_acronym(),
                record.primary_acronym(),
                AlternateKind::Acronym,
            );
            let names = self.clean_alternates(
                record.alt_names(),
                record.primary_name(),
                record.primary_acronym(),
                AlternateKind::Name,
            );
            tables.alternates_dropped += record.alt_acronyms().len() - acronyms.len();
            tables.alternates_dropped += record.alt_names().len() - names.len();

            let rows = acronyms
                .into_iter()
                .map(|acronym| (String::new(), acronym))
                .chain(names.into_iter().map(|name| (name, String::new())));
            for (additional_name, additional_acronym) in rows {
                tables.additional_names.push(AdditionalNameRow {
                    additional_name_id: tables.additional_names.len() + 1,
                    cs_id,
                    additional_name,
                    additional_acronym,
                });
            }

            if let Some(edition) = self.edition(record, tables.editions.len() + 1) {
                tables.editions.push(edition);
            }
        }

        log::info!(
            "Exported {} conference(s); {} alternate(s) kept, {} dropped",
            tables.conferences.len(),
            tables.additional_names.len(),
            tables.alternates_dropped
        );
        tables
    }

    /// Filters one alternate set down to at most `max_alternates` entries.
    pub fn clean_alternates(
        &self,
        values: &BTreeSet<String>,
        base: &str,
        acronym: &str,
        kind: AlternateKind,
    ) -> Vec<String> {
        let marker = values.iter().find_map(|value| self.config.corruption_marker(value));
        if let Some(marker) = marker {
            log::warn!("Skipping corrupted alternates of {acronym} (contains '{marker}')");
            return Vec::new();
        }

        let mut accepted: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for value in values {
            if accepted.len() >= self.config.max_alternates {
                break;
            }
            let value = value.trim();
            if value.is_empty() || value.eq_ignore_ascii_case("nan") || value == base {
                continue;
            }
            let value = fix_typos(value);
            if !is_valid_name(&value) {
                continue;
            }
            let normalized = normalize_name(&value);
            if normalized.chars().count() < kind.min_len() {
                continue;
            }
            if !seen.insert(normalized.to_lowercase()) {
                continue;
            }
            let similar = accepted.iter().any(|a| names_similar(&value, a)) || names_similar(&value, base);
            if !similar {
                accepted.push(value);
            }
        }
        accepted
    }

    fn edition(&self, record: &ConferenceRecord, edition_id: usize) -> Option<EditionRow> {
        let year = record.data_year()?;
        if !self.config.edition_years.contains(year) {
            return None;
        }
        let id = |kind| record.external_ids().get(kind).unwrap_or_default().to_string();
        Some(EditionRow {
            edition_id,
            cs_id: record.comp_id().numeric(),
            name: record.primary_name().to_string(),
            acronym: record.primary_acronym().to_string(),
            society: record.society().to_string(),
            year,
            id_scholar_conference: id(IdKind::Scholar),
            id_dblp_conference: id(IdKind::Dblp),
        })
    }
}

fn fix_typos(name: &str) -> String {
    TYPO_FIXES
        .iter()
        .fold(name.to_string(), |name, (typo, fix)| name.replace(typo, fix))
}

/// Whether a string can stand as a conference name.
///
/// Trailing `(`, `,` or `.` is retried without it, except for "Inc.".
pub(crate) fn is_valid_name(name: &str) -> bool {
    if name.chars().count() < 3 {
        return false;
    }
    if name.matches('(').count() != name.matches(')').count() {
        return false;
    }
    if !name.ends_with("Inc.") {
        if let Some(stripped) = name.strip_suffix(['(', ',', '.']) {
            return is_valid_name(stripped);
        }
    }
    !META_NAME.is_match(name)
}

/// Canonical form used to compare names: no URLs, parentheticals or
/// trailing commas, single spaces and common prefixes folded.
pub(crate) fn normalize_name(name: &str) -> String {
    let name = URL.replace_all(name, "");
    let name = PARENTHESIZED.replace_all(&name, "");
    let name = TRAILING_COMMA.replace_all(&name, "");
    let name = WHITESPACE.replace_all(&name, " ");
    NAME_REWRITES
        .iter()
        .fold(name.trim().to_string(), |name, (from, to)| name.replace(from, to))
        .trim()
        .to_string()
}

/// Equal, contained in one another, or sharing most words once normalized.
pub(crate) fn names_similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (a, b) = (normalize_name(a).to_lowercase(), normalize_name(b).to_lowercase());
    if a == b || a.contains(&b) || b.contains(&a) {
        return true;
    }
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let union = words_a.union(&words_b).count();
    union > 0 && words_a.intersection(&words_b).count() as f64 / union as f64 > SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn exporter() -> Exporter {
        Exporter::new(PipelineConfig::default())
    }

    #[rstest]
    #[case("Simpósio Brasileiro de Redes", true)]
    #[case("Symposium on Networks (SBRC)", true)]
    #[case("Workshop on Things,", true)]
    #[case("Acme Inc.", true)]
    #[case("Broken (paren", false)]
    #[case("ab", false)]
    #[case("Renamed to SBRC", false)]
    #[case("merged with SBES", false)]
    #[case("2019", false)]
    #[case("H5 12", false)]
    #[case("Impact Factor 2.1", false)]
    fn test_is_valid_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_valid_name(name), expected);
    }

    #[rstest]
    #[case("Proceedings of the Symposium (SBRC), ", "Symposium")]
    #[case("IEEE International Conference on X", "IEEE Conference on X")]
    #[case("Workshop  on\tY https://y.org", "Workshop on Y")]
    fn test_normalize_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(name), expected);
    }

    #[rstest]
    #[case("Symposium on Networks", "symposium on networks", true)]
    #[case("Symposium on Networks", "Brazilian Symposium on Networks", true)]
    #[case("Brazilian Symposium on Computer Networks and Systems", "Brazilian Symposium on Computer Networks and Distributed Systems", true)]
    #[case("Symposium on Networks", "Workshop on Databases", false)]
    #[case("", "Anything", false)]
    fn test_names_similar(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        assert_eq!(names_similar(a, b), expected);
    }

    #[test]
    fn test_clean_alternates_caps_and_filters() {
        let names = set(&[
            "Brazilian Symposium on Networks",
            "Simpósio de Redes",
            "Renamed to SBRC",
            "SBRC Workshp on Tools",
            "Symposium on Networks",
        ]);
        let cleaned = exporter().clean_alternates(
            &names,
            "Simpósio Brasileiro de Redes de Computadores",
            "SBRC",
            AlternateKind::Name,
        );
        assert_eq!(
            cleaned,
            vec![
                "Brazilian Symposium on Networks".to_string(),
                "SBRC Workshop on Tools".to_string(),
            ]
        );
    }

    #[test]
    fn test_corrupted_set_is_dropped_whole() {
        let names = set(&["Good Conference Name", "RoboCup Brazil Open"]);
        let cleaned = exporter().clean_alternates(&names, "Base", "X", AlternateKind::Name);
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_short_acronyms_survive() {
        let cleaned = exporter().clean_alternates(&set(&["WEI", "W"]), "SBC-EDU", "SBC-EDU", AlternateKind::Acronym);
        assert_eq!(cleaned, vec!["WEI".to_string()]);
    }

    fn registry() -> Registry {
        Registry::from_csv(
            "comp_id,acronym,name,alt_acronyms,alt_names,data_year,dblp_id,society\n\
             CompID900001,SBRC,Simpósio Brasileiro de Redes,SBRC-OLD,Brazilian Symposium on Networks,2024,sbrc,SBC\n\
             CompID800001,WEI,Workshop sobre Educação,,,1999,,\n\
             CompID900002,SBES,Simpósio de Engenharia de Software,,,,,\n",
            &RuleSet::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_export() {
        let tables = exporter().export(&registry());

        assert_eq!(
            tables.conferences.iter().map(|c| c.cs_id).collect::<Vec<_>>(),
            vec![800001, 900001, 900002]
        );
        assert_eq!(
            tables.additional_names,
            vec![
                AdditionalNameRow {
                    additional_name_id: 1,
                    cs_id: 900001,
                    additional_name: String::new(),
                    additional_acronym: "SBRC-OLD".to_string(),
                },
                AdditionalNameRow {
                    additional_name_id: 2,
                    cs_id: 900001,
                    additional_name: "Brazilian Symposium on Networks".to_string(),
                    additional_acronym: String::new(),
                },
            ]
        );
        // 1999 lies outside the edition range
        assert_eq!(tables.editions.len(), 1);
        assert_eq!(tables.editions[0].year, 2024);
        assert_eq!(tables.editions[0].id_dblp_conference, "sbrc");
        assert_eq!(tables.validate(&PipelineConfig::default()).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_write_conferences() {
        let tables = exporter().export(&registry());
        let mut out = Vec::new();
        tables.write_conferences(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert_eq!(
            written.lines().take(2).collect::<Vec<_>>(),
            vec!["cs_id,name,acronym", "800001,Workshop sobre Educação,WEI"]
        );
    }

    #[test]
    fn test_validation_errors() {
        let mut tables = exporter().export(&registry());
        tables.conferences[0].name.clear();
        tables.editions[0].cs_id = 42;
        match tables.validate(&PipelineConfig::default()) {
            Err(ConfError::Validation(errors)) => assert_eq!(
                errors,
                vec![
                    "Orphan records in editions: 1".to_string(),
                    "Conferences with empty names: 1".to_string(),
                ]
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("confcite-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_write_dir() {
        let dir = scratch_dir("valid");
        let tables = exporter().export(&registry());
        let warnings = tables.write_dir(&dir, &PipelineConfig::default()).unwrap();
        assert!(warnings.is_empty());
        for file in ["conferences.csv", "additional_names.csv", "editions.csv"] {
            assert!(dir.join(file).exists(), "{file}");
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[rstest]
    #[case::empty_name("empty-name")]
    #[case::orphan_edition("orphan-edition")]
    fn test_invalid_tables_write_nothing(#[case] defect: &str) {
        let dir = scratch_dir(defect);
        let mut tables = exporter().export(&registry());
        match defect {
            "empty-name" => tables.conferences[0].name.clear(),
            _ => tables.editions[0].cs_id = 42,
        }

        let result = tables.write_dir(&dir, &PipelineConfig::default());
        assert!(matches!(result, Err(ConfError::Validation(_))));
        assert!(!dir.exists());
    }

    #[test]
    fn test_validation_warnings() {
        let mut tables = exporter().export(&registry());
        tables.conferences[1].acronym = "WEI".to_string();
        let mut config = PipelineConfig::default();
        config.set_expected_counts(5, 10);
        assert_eq!(
            tables.validate(&config).unwrap(),
            vec![
                "Duplicate acronyms: WEI".to_string(),
                "Total conferences (3) below expected minimum (5)".to_string(),
            ]
        );
    }
}
