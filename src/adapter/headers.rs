//! Column tables for the CSV-shaped providers.

use csv::StringRecord;

use crate::adapter::ProviderKind;

/// Canonical publication fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Field {
    Title,
    Cites,
    Authors,
    Year,
    Source,
    Publisher,
    Doi,
}

type HeaderTable = &'static [(Field, &'static [&'static str])];

/// Columns are listed by preference; the first non-empty one wins per row.
const OPENALEX_HEADERS: HeaderTable = &[
    (Field::Title, &["title", "display_name"]),
    (Field::Cites, &["cited_by_count"]),
    (
        Field::Authors,
        &["authorships.author.display_name", "authorships.raw_author_name"],
    ),
    (Field::Year, &["publication_year"]),
    (
        Field::Source,
        &["source", "conference", "booktitle", "primary_location.source.display_name"],
    ),
    (
        Field::Publisher,
        &["primary_location.source.host_organization_name", "publisher"],
    ),
    (Field::Doi, &["doi", "ids.doi"]),
];

const SCHOLAR_HEADERS: HeaderTable = &[
    (Field::Title, &["title"]),
    (Field::Cites, &["cites", "citations", "cited by"]),
    (Field::Authors, &["authors", "author"]),
    (Field::Year, &["year"]),
    (Field::Source, &["source", "venue"]),
    (Field::Publisher, &["publisher"]),
    (Field::Doi, &["doi"]),
];

const CROSSREF_HEADERS: HeaderTable = &[
    (Field::Title, &["title"]),
    (
        Field::Cites,
        &["is-referenced-by-count", "is_referenced_by_count", "cites"],
    ),
    (Field::Authors, &["author", "authors"]),
    (
        Field::Year,
        &["published", "published-print", "published-online", "issued", "year"],
    ),
    (Field::Source, &["container-title", "container_title", "event"]),
    (Field::Publisher, &["publisher"]),
    (Field::Doi, &["doi", "url"]),
];

const NORMALIZED_HEADERS: HeaderTable = &[
    (Field::Title, &["title"]),
    (Field::Cites, &["cites"]),
    (Field::Authors, &["authors"]),
    (Field::Year, &["year"]),
    (Field::Source, &["source"]),
    (Field::Publisher, &["publisher"]),
    (Field::Doi, &["doi"]),
];

/// Header table and author separators of a provider.
pub(crate) fn table_for(kind: ProviderKind) -> (HeaderTable, &'static [char]) {
    match kind {
        ProviderKind::OpenAlex => (OPENALEX_HEADERS, &['|']),
        ProviderKind::Scholar => (SCHOLAR_HEADERS, &[',']),
        ProviderKind::Crossref => (CROSSREF_HEADERS, &[';']),
        ProviderKind::Springer | ProviderKind::Normalized => (NORMALIZED_HEADERS, &[';', '|']),
    }
}

/// Column positions of each field in one file, in preference order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColumnMap {
    columns: Vec<(Field, Vec<usize>)>,
}

impl ColumnMap {
    pub(crate) fn from_headers(headers: &StringRecord, table: HeaderTable) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let columns = table
            .iter()
            .map(|(field, aliases)| {
                let positions = aliases
                    .iter()
                    .filter_map(|alias| lowered.iter().position(|h| h == alias))
                    .collect();
                (*field, positions)
            })
            .collect();
        Self { columns }
    }

    pub(crate) fn has(&self, field: Field) -> bool {
        !self.positions(field).is_empty()
    }

    pub(crate) fn positions(&self, field: Field) -> &[usize] {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, positions)| positions.as_slice())
            .unwrap_or(&[])
    }
}
