//! Pipeline configuration.
//!
//! Holds the knobs that shape exports and the quality report: the expected
//! record-count bounds, the cap on exported alternates, the plausible year
//! range for editions and the markers that flag a scraped alternate list as
//! corrupted.
//!
//! # Example
//!
//! ```
//! use confcite::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json(r#"{
//!     "reference_year": 2025,
//!     "expected_counts": { "min_conferences": 1400 }
//! }"#).unwrap();
//!
//! assert_eq!(config.reference_year, Some(2025));
//! assert_eq!(config.expected_counts.min_conferences, 1400);
//! assert_eq!(config.max_alternates, 2);
//! ```

use serde::Deserialize;

use crate::{ConfError, Result};

/// Default fragments whose presence marks an alternate list as garbage.
const DEFAULT_CORRUPTION_MARKERS: &[&str] = &[
    "RoboCup",
    "Computer on The Beach",
    "Workshop on Tractable",
    "International Conference of the Italian",
    "International Conference on Neural",
    "https://",
    "http://",
    ".org/",
    ".com/",
];

/// Bounds the merged registry size is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExpectedCounts {
    /// Below this the report flags the run as failed.
    pub min_conferences: usize,
    /// Above this the report carries a warning.
    pub max_conferences: usize,
}

impl Default for ExpectedCounts {
    fn default() -> Self {
        Self {
            min_conferences: 0,
            max_conferences: 1650,
        }
    }
}

/// Exclusive year bounds for a record to produce an edition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditionYears {
    pub min: i32,
    pub max: i32,
}

impl Default for EditionYears {
    fn default() -> Self {
        Self {
            min: 2000,
            max: 2030,
        }
    }
}

impl EditionYears {
    pub fn contains(&self, year: i32) -> bool {
        year > self.min && year < self.max
    }
}

/// Configuration shared by the merge, export and report stages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Year the H5 window is anchored on, if metrics are computed.
    pub reference_year: Option<i32>,
    pub expected_counts: ExpectedCounts,
    /// Maximum alternate acronyms (and, separately, names) exported per record.
    pub max_alternates: usize,
    pub edition_years: EditionYears,
    pub corruption_markers: Vec<String>,
    /// Separator of multi-valued registry cells.
    pub list_delimiter: char,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_year: None,
            expected_counts: ExpectedCounts::default(),
            max_alternates: 2,
            edition_years: EditionYears::default(),
            corruption_markers: DEFAULT_CORRUPTION_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            list_delimiter: '|',
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration document. Missing fields keep their defaults.
    pub fn from_json(input: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| ConfError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the expected record-count bounds
    pub fn set_expected_counts(&mut self, min: usize, max: usize) -> &mut Self {
        self.expected_counts = ExpectedCounts {
            min_conferences: min,
            max_conferences: max,
        };
        self
    }

    /// Sets the reference year for metric windows
    pub fn set_reference_year(&mut self, year: i32) -> &mut Self {
        self.reference_year = Some(year);
        self
    }

    /// Sets how many alternates of each kind are exported per record
    pub fn set_max_alternates(&mut self, max: usize) -> &mut Self {
        self.max_alternates = max;
        self
    }

    /// Replaces the corruption marker list
    pub fn set_corruption_markers(&mut self, markers: Vec<String>) -> &mut Self {
        self.corruption_markers = markers;
        self
    }

    /// Returns the first corruption marker found in `text`.
    pub fn corruption_marker<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.corruption_markers
            .iter()
            .find(|marker| !marker.is_empty() && text.contains(marker.as_str()))
            .map(String::as_str)
    }

    fn validate(&self) -> Result<()> {
        if self.expected_counts.min_conferences > self.expected_counts.max_conferences {
            return Err(ConfError::Config(format!(
                "min_conferences ({}) exceeds max_conferences ({})",
                self.expected_counts.min_conferences, self.expected_counts.max_conferences
            )));
        }
        if self.edition_years.min >= self.edition_years.max {
            return Err(ConfError::Config("edition_years.min must be below max".into()));
        }
        Ok(())
    }
}
