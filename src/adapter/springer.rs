//! Springer Meta API responses.
//!
//! The harvester caches one response per chapter DOI. A file may hold a single
//! response object or an array of them. The Meta API carries no citation
//! counts, so every publication adapted here has `cites == 0`.

use serde::Deserialize;

use crate::adapter::{ProviderKind, SourceAdapter};
use crate::utils::{format_doi, parse_year};
use crate::{ConfError, Publication, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpringerPayload {
    Many(Vec<SpringerResponse>),
    One(SpringerResponse),
}

#[derive(Debug, Default, Deserialize)]
struct SpringerResponse {
    #[serde(default)]
    records: Vec<SpringerRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpringerRecord {
    title: String,
    doi: String,
    publication_date: String,
    publisher: String,
    publication_name: String,
    creators: Vec<SpringerCreator>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpringerCreator {
    creator: String,
}

impl From<SpringerRecord> for Publication {
    fn from(record: SpringerRecord) -> Self {
        Publication {
            title: record.title.trim().to_string(),
            cites: 0,
            authors: record
                .creators
                .into_iter()
                .map(|c| c.creator.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            year: parse_year(&record.publication_date).unwrap_or(0),
            source: record.publication_name,
            publisher: record.publisher,
            doi: format_doi(&record.doi),
        }
    }
}

/// Adapter for cached Springer Meta API JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpringerAdapter;

impl SourceAdapter for SpringerAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Springer
    }

    fn adapt(&self, input: &str) -> Result<Vec<Publication>> {
        let payload: SpringerPayload = serde_json::from_str(input)
            .map_err(|e| ConfError::InvalidFormat(format!("Springer response: {e}")))?;
        let responses = match payload {
            SpringerPayload::Many(responses) => responses,
            SpringerPayload::One(response) => vec![response],
        };
        Ok(responses
            .into_iter()
            .flat_map(|response| response.records)
            .map(Publication::from)
            .filter(|publication| !publication.title.is_empty())
            .collect())
    }
}
