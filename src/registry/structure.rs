//! Column layout of the registry table.

use csv::{ReaderBuilder, StringRecord};

use crate::registry::{CompId, ConferenceRecord, IdKind, Tier};
use crate::utils::{parse_year, split_list};
use crate::{ConfError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    CompId,
    Acronym,
    Name,
    AltAcronyms,
    AltNames,
    Provenance,
    Tier,
    Committees,
    ScholarId,
    DblpId,
    SolId,
    Society,
    DataYear,
}

/// Canonical header, the column it feeds, and the legacy headers it accepts.
pub(crate) const REGISTRY_COLUMNS: &[(&str, Column, &[&str])] = &[
    ("comp_id", Column::CompId, &["ID Conferencia", "CompID"]),
    ("acronym", Column::Acronym, &["Sigla"]),
    ("name", Column::Name, &["Nome do evento", "Nome"]),
    ("alt_acronyms", Column::AltAcronyms, &["Siglas Alternativas"]),
    ("alt_names", Column::AltNames, &["Nomes Alternativos"]),
    ("provenance", Column::Provenance, &["Origem Cadastro"]),
    ("tier", Column::Tier, &["Avaliação SBC"]),
    ("committees", Column::Committees, &["SBC-CE"]),
    ("scholar_id", Column::ScholarId, &["GS ID"]),
    ("dblp_id", Column::DblpId, &["DBLP ID"]),
    ("sol_id", Column::SolId, &["SOL ID"]),
    ("society", Column::Society, &["Sociedade"]),
    ("data_year", Column::DataYear, &["Ano Dados"]),
];

/// Positions of the known columns in a header row.
#[derive(Debug, Default)]
pub(crate) struct RegistryColumns {
    positions: Vec<(Column, usize)>,
}

impl RegistryColumns {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut positions = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            let header = header.trim().trim_start_matches('\u{feff}');
            let column = REGISTRY_COLUMNS.iter().find(|(canonical, _, aliases)| {
                canonical.eq_ignore_ascii_case(header)
                    || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(header))
            });
            if let Some((_, column, _)) = column {
                if !positions.iter().any(|(c, _)| c == column) {
                    positions.push((*column, i));
                }
            }
        }
        Self { positions }
    }

    fn has(&self, column: Column) -> bool {
        self.positions.iter().any(|(c, _)| *c == column)
    }

    fn get<'r>(&self, record: &'r StringRecord, column: Column) -> &'r str {
        self.positions
            .iter()
            .find(|(c, _)| *c == column)
            .and_then(|&(_, i)| record.get(i))
            .map(str::trim)
            .filter(|value| !value.eq_ignore_ascii_case("nan"))
            .unwrap_or_default()
    }

    /// Serializes a record in `REGISTRY_COLUMNS` order.
    pub(crate) fn row(record: &ConferenceRecord, delimiter: char) -> Vec<String> {
        let join = |values: &std::collections::BTreeSet<String>| {
            values
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(delimiter.to_string().as_str())
        };
        let id = |kind| record.external_ids.get(kind).unwrap_or_default().to_string();
        REGISTRY_COLUMNS
            .iter()
            .map(|(_, column, _)| match column {
                Column::CompId => record.comp_id.to_string(),
                Column::Acronym => record.primary_acronym.clone(),
                Column::Name => record.primary_name.clone(),
                Column::AltAcronyms => join(&record.alt_acronyms),
                Column::AltNames => join(&record.alt_names),
                Column::Provenance => join(&record.provenance),
                Column::Tier => record.tier.as_str().to_string(),
                Column::Committees => join(&record.committees),
                Column::ScholarId => id(IdKind::Scholar),
                Column::DblpId => id(IdKind::Dblp),
                Column::SolId => id(IdKind::Sol),
                Column::Society => record.society.clone(),
                Column::DataYear => record.data_year.map(|y| y.to_string()).unwrap_or_default(),
            })
            .collect()
    }
}

/// Parses registry rows. Rows with an unreadable id or no acronym are
/// skipped with a warning.
pub(crate) fn parse_registry(input: &str, delimiter: char) -> Result<Vec<ConferenceRecord>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());
    let columns = RegistryColumns::from_headers(reader.headers()?);

    for (required, column) in [("acronym", Column::Acronym), ("comp_id", Column::CompId)] {
        if !columns.has(column) {
            return Err(ConfError::MissingColumn {
                source_name: "registry".to_string(),
                column: required.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = result?;
        let line = i + 2;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let comp_id = match columns.get(&row, Column::CompId).parse::<CompId>() {
            Ok(id) => id,
            Err(e) => {
                log::warn!("registry line {line}: {e}, row skipped");
                continue;
            }
        };

        let acronym = columns.get(&row, Column::Acronym);
        if acronym.is_empty() {
            log::warn!("registry line {line}: {comp_id} has no acronym, row skipped");
            continue;
        }

        let mut record = ConferenceRecord::new(
            comp_id,
            acronym,
            columns.get(&row, Column::Name),
        );
        for alt in split_list(columns.get(&row, Column::AltAcronyms), delimiter) {
            record.add_alt_acronym(&alt);
        }
        for alt in split_list(columns.get(&row, Column::AltNames), delimiter) {
            record.add_alt_name(&alt);
        }
        for tag in split_list(columns.get(&row, Column::Provenance), delimiter) {
            record.add_provenance(&tag);
        }
        for committee in split_list(columns.get(&row, Column::Committees), delimiter) {
            record.add_committee(&committee);
        }
        record.tier = Tier::parse(columns.get(&row, Column::Tier));
        for (kind, column) in [
            (IdKind::Scholar, Column::ScholarId),
            (IdKind::Dblp, Column::DblpId),
            (IdKind::Sol, Column::SolId),
        ] {
            record.external_ids.set_if_empty(kind, columns.get(&row, column));
        }
        record.society = columns.get(&row, Column::Society).to_string();
        record.data_year = parse_year(columns.get(&row, Column::DataYear));
        records.push(record);
    }
    Ok(records)
}
