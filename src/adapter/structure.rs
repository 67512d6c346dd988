//! Intermediate row structure used while adapting CSV exports.

use csv::StringRecord;
use std::collections::HashMap;

use crate::Publication;
use crate::adapter::headers::{ColumnMap, Field};
use crate::utils::{format_doi, parse_cites, parse_year};

/// The first non-empty value of each canonical field in one CSV record.
#[derive(Debug, Clone)]
pub(crate) struct RawPublicationRow {
    fields: HashMap<Field, String>,
    /// Line number for diagnostics
    line_number: usize,
}

impl RawPublicationRow {
    pub(crate) fn from_record(columns: &ColumnMap, record: &StringRecord, line_number: usize) -> Self {
        let mut fields = HashMap::new();
        for field in [
            Field::Title,
            Field::Cites,
            Field::Authors,
            Field::Year,
            Field::Source,
            Field::Publisher,
            Field::Doi,
        ] {
            let value = columns
                .positions(field)
                .iter()
                .filter_map(|&i| record.get(i))
                .map(str::trim)
                .find(|value| !value.is_empty() && !value.eq_ignore_ascii_case("nan"));
            if let Some(value) = value {
                fields.insert(field, value.to_string());
            }
        }
        Self {
            fields,
            line_number,
        }
    }

    fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub(crate) fn has_year(&self) -> bool {
        self.get(Field::Year).and_then(parse_year).is_some()
    }

    /// Converts into the canonical schema, coalescing absent fields to their
    /// defaults. Returns `None` for rows without a title.
    pub(crate) fn into_publication(self, author_delimiters: &[char]) -> Option<Publication> {
        let title = self.get(Field::Title)?.to_string();
        let year = match self.get(Field::Year) {
            Some(value) => parse_year(value).unwrap_or_else(|| {
                log::debug!("line {}: unparsable year '{value}'", self.line_number);
                0
            }),
            None => 0,
        };
        let authors = self
            .get(Field::Authors)
            .map(|value| {
                value
                    .split(author_delimiters)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Some(Publication {
            title,
            cites: self.get(Field::Cites).map(parse_cites).unwrap_or(0),
            authors,
            year,
            source: self.get(Field::Source).unwrap_or_default().to_string(),
            publisher: self.get(Field::Publisher).unwrap_or_default().to_string(),
            doi: self.get(Field::Doi).and_then(format_doi),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ProviderKind;
    use crate::adapter::headers::table_for;

    fn row(headers: &[&str], values: &[&str]) -> RawPublicationRow {
        let (table, _) = table_for(ProviderKind::Normalized);
        let columns = ColumnMap::from_headers(&StringRecord::from(headers.to_vec()), table);
        RawPublicationRow::from_record(&columns, &StringRecord::from(values.to_vec()), 2)
    }

    #[test]
    fn test_defaults_for_absent_fields() {
        let raw = row(&["Title"], &["Only Title"]);
        assert!(!raw.has_year());
        let publication = raw.into_publication(&[';']).unwrap();
        assert_eq!(publication.cites, 0);
        assert_eq!(publication.year, 0);
        assert!(publication.authors.is_empty());
        assert_eq!(publication.doi, None);
    }

    #[test]
    fn test_short_record_is_tolerated() {
        let raw = row(&["Title", "Cites", "Year"], &["T"]);
        let publication = raw.into_publication(&[';']).unwrap();
        assert_eq!(publication.title, "T");
        assert_eq!(publication.cites, 0);
    }

    #[test]
    fn test_nan_cells_count_as_missing() {
        let raw = row(&["Title", "Year"], &["nan", "NaN"]);
        assert!(!raw.has_year());
        assert!(raw.into_publication(&[';']).is_none());
    }
}
