//! Committee correction files.
//!
//! Each special committee (CE) maintains a CSV listing the events it
//! recommends, with optional corrections: a new acronym, a new name, a
//! free-text alternate name, a tier marker and links to external services.
//! [`CorrectionReader`] turns those files into typed [`CorrectionRow`]s.
//!
//! ```
//! use confcite::correction::CorrectionReader;
//! use confcite::registry::{IdKind, Tier};
//!
//! let input = "SIGLA,NOME,TOP,Link da DBLP\n\
//!              SBES,Simpósio Brasileiro de Engenharia de Software,Top 10,https://dblp.org/db/conf/sbes/index.html\n";
//! let rows = CorrectionReader::new().read("SBC-CE-ES-2024.csv", input).unwrap();
//!
//! assert_eq!(rows[0].tier, Some(Tier::Top10));
//! assert_eq!(rows[0].external_ids.get(IdKind::Dblp), Some("sbes"));
//! assert_eq!(rows[0].origin.committee, "CE-ES");
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use csv::{ReaderBuilder, StringRecord};
use either::{Either, Left, Right};
use itertools::Itertools;

use crate::regex::Regex;
use crate::registry::{ExternalIds, IdKind, Tier};
use crate::utils::file_name;
use crate::{ConfError, Result};

static SCHOLAR_VENUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"venue=([^&\s]+)").unwrap());
static YEAR_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\d{4}$").unwrap());
static DBLP_CONF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/db/conf/([^/]+)/").unwrap());
static SOL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/index\.php/([^/?#]+)").unwrap());
static FILE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\d{4}$").unwrap());

const DEFAULT_HEADERS: &[(&str, &[&str])] = &[
    ("acronym", &["sigla", "acronym"]),
    ("name", &["nome", "name"]),
    ("alt_name", &["nome alternativo", "alternate name"]),
    ("new_acronym", &["nova sigla", "new acronym"]),
    ("new_name", &["novo nome", "new name"]),
    ("tier", &["top", "tier"]),
    ("scholar_link", &["google metrics link", "link gs", "gs link"]),
    ("dblp_link", &["link da dblp", "link dblp", "dblp link"]),
    ("sol_link", &["link da sol", "link sol", "sol link"]),
];

/// Where a correction row came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    /// File name the row was read from
    pub file: String,
    /// Tag recorded in the record's provenance
    pub provenance: String,
    /// Committee the file belongs to
    pub committee: String,
}

impl Origin {
    /// Derives provenance and committee from a file name such as
    /// `SBC-CE-ES-2024.ce.csv`: provenance `SBC-CE-ES-2024`, committee `CE-ES`.
    pub fn from_file_name(path: &str) -> Self {
        let file = file_name(path);
        let stem = file.strip_suffix(".csv").unwrap_or(file);
        let stem = stem.strip_suffix(".ce").unwrap_or(stem);
        let committee = stem.strip_prefix("SBC-").unwrap_or(stem);
        let committee = FILE_YEAR.replace(committee, "").into_owned();
        Self {
            file: file.to_string(),
            provenance: stem.to_string(),
            committee,
        }
    }
}

/// One assertion made by a committee about one conference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionRow {
    /// Acronym the committee uses today
    pub acronym: String,
    pub name: String,
    pub alt_name: Option<String>,
    pub new_acronym: Option<String>,
    pub new_name: Option<String>,
    /// `None` when the file has no tier column
    pub tier: Option<Tier>,
    pub external_ids: ExternalIds,
    pub origin: Origin,
    /// Line in the source file, header being line 1
    pub line: usize,
}

impl CorrectionRow {
    pub fn new(acronym: &str, name: &str) -> Self {
        Self {
            acronym: acronym.trim().to_string(),
            name: name.trim().to_string(),
            ..Default::default()
        }
    }

    pub fn with_new_acronym(mut self, acronym: &str) -> Self {
        self.new_acronym = non_empty(acronym);
        self
    }

    pub fn with_new_name(mut self, name: &str) -> Self {
        self.new_name = non_empty(name);
        self
    }

    pub fn with_alt_name(mut self, name: &str) -> Self {
        self.alt_name = non_empty(name);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_origin(mut self, file_name: &str) -> Self {
        self.origin = Origin::from_file_name(file_name);
        self
    }

    pub fn with_external_id(mut self, kind: IdKind, value: &str) -> Self {
        self.external_ids.set_if_empty(kind, value);
        self
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && !value.eq_ignore_ascii_case("nan")).then(|| value.to_string())
}

/// Google Scholar Metrics venue id from a metrics link, without a year suffix.
pub fn scholar_id(url: &str) -> Option<String> {
    let venue = SCHOLAR_VENUE.captures(url)?.get(1)?.as_str().trim();
    non_empty(&YEAR_SUFFIX.replace(venue, ""))
}

/// DBLP stream key from a `/db/conf/<key>/` link.
pub fn dblp_id(url: &str) -> Option<String> {
    non_empty(DBLP_CONF.captures(url)?.get(1)?.as_str())
}

/// SOL journal path from an `/index.php/<path>` link.
pub fn sol_id(url: &str) -> Option<String> {
    non_empty(SOL_PATH.captures(url)?.get(1)?.as_str())
}

/// Reader for committee correction files.
#[derive(Debug, Clone)]
pub struct CorrectionReader {
    header_map: HashMap<String, Vec<String>>,
}

impl Default for CorrectionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectionReader {
    #[must_use]
    pub fn new() -> Self {
        let header_map = DEFAULT_HEADERS
            .iter()
            .map(|(field, aliases)| {
                (
                    field.to_string(),
                    aliases.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self { header_map }
    }

    /// Replaces the accepted headers of `field`. Matching ignores case.
    pub fn set_header_mapping(&mut self, field: &str, aliases: Vec<String>) -> &mut Self {
        self.header_map.insert(field.to_string(), aliases);
        self
    }

    /// Reads one correction file. Rows without an acronym are skipped.
    ///
    /// # Errors
    ///
    /// Fails when the acronym column is missing or the CSV is malformed.
    pub fn read(&self, file_name: &str, input: &str) -> Result<Vec<CorrectionRow>> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(input.as_bytes());
        let columns = self.columns(reader.headers()?);
        if !columns.contains_key("acronym") {
            return Err(ConfError::MissingColumn {
                source_name: file_name.to_string(),
                column: "SIGLA".to_string(),
            });
        }

        let origin = Origin::from_file_name(file_name);
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<StringRecord>, _>>()?;
        let (skipped, rows): (Vec<usize>, Vec<CorrectionRow>) = records
            .iter()
            .enumerate()
            .partition_map(|(i, record)| self.parse_row(&columns, record, &origin, i + 2));

        if !skipped.is_empty() {
            log::warn!(
                "{}: skipped {} row(s) without an acronym (lines {})",
                origin.file,
                skipped.len(),
                skipped.iter().join(", ")
            );
        }
        log::info!("{}: read {} correction row(s)", origin.file, rows.len());
        Ok(rows)
    }

    /// Reads one file from disk.
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Vec<CorrectionRow>> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        self.read(&path.to_string_lossy(), &input)
    }

    /// Reads every `.csv` file of a directory, in file name order.
    pub fn read_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<CorrectionRow>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rows = Vec::new();
        for path in paths {
            rows.extend(self.read_path(&path)?);
        }
        Ok(rows)
    }

    fn columns(&self, headers: &StringRecord) -> HashMap<String, usize> {
        let mut columns = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            let header = header.trim().trim_start_matches('\u{feff}').to_lowercase();
            for (field, aliases) in &self.header_map {
                if aliases.iter().any(|alias| alias.to_lowercase() == header) {
                    columns.entry(field.clone()).or_insert(i);
                }
            }
        }
        columns
    }

    fn parse_row(
        &self,
        columns: &HashMap<String, usize>,
        record: &StringRecord,
        origin: &Origin,
        line: usize,
    ) -> Either<usize, CorrectionRow> {
        let cell = |field: &str| {
            columns
                .get(field)
                .and_then(|&i| record.get(i))
                .and_then(non_empty)
        };

        let Some(acronym) = cell("acronym") else {
            return Left(line);
        };

        let tier = columns.contains_key("tier").then(|| match cell("tier") {
            Some(marker) => Tier::from_marker(&marker),
            None => Tier::Recommended,
        });

        let mut external_ids = ExternalIds::new();
        let links: [(IdKind, &str, fn(&str) -> Option<String>); 3] = [
            (IdKind::Scholar, "scholar_link", scholar_id),
            (IdKind::Dblp, "dblp_link", dblp_id),
            (IdKind::Sol, "sol_link", sol_id),
        ];
        for (kind, field, extract) in links {
            if let Some(id) = cell(field).as_deref().and_then(extract) {
                external_ids.set_if_empty(kind, &id);
            }
        }

        Right(CorrectionRow {
            acronym,
            name: cell("name").unwrap_or_default(),
            alt_name: cell("alt_name"),
            new_acronym: cell("new_acronym"),
            new_name: cell("new_name"),
            tier,
            external_ids,
            origin: origin.clone(),
            line,
        })
    }
}
