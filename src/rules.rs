//! Rename and unification rules.
//!
//! Committees keep proposing renames that curators have already decided
//! about. A [`RuleSet`] records those decisions and answers, for a
//! `(current, proposed)` acronym pair, what the merger should do.
//!
//! The JSON document looks like this:
//!
//! ```json
//! {
//!   "ignore_renames": { "SBSI": { "wrong_rename": "WCGE" } },
//!   "force_renames": { "WEI": { "new_name": "SBC-WEI" } },
//!   "unifications": { "DEF": { "absorbs": ["ABC", "XYZ"] } },
//!   "registry_duplicates": { "unify": { "SBRC": { "remove": ["CompID900123"] } } },
//!   "unmatched_renames": "apply"
//! }
//! ```
//!
//! Every section is optional.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::registry::CompId;
use crate::utils::casefold;
use crate::{ConfError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IgnoreRename {
    pub wrong_rename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForceRename {
    pub new_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Unification {
    #[serde(default)]
    pub absorbs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DuplicateRemoval {
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryDuplicates {
    #[serde(default)]
    pub unify: BTreeMap<String, DuplicateRemoval>,
}

/// What to do with a proposed rename no rule mentions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedRenames {
    #[default]
    Apply,
    Ignore,
}

/// The merger's verdict on one proposed acronym change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoOp,
    /// Fold the current record into `target`
    Merge { target: String },
    /// Make `new_primary` the record's primary acronym
    Rename { new_primary: String, forced: bool },
}

/// Curated rename and unification rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub ignore_renames: BTreeMap<String, IgnoreRename>,
    pub force_renames: BTreeMap<String, ForceRename>,
    pub unifications: BTreeMap<String, Unification>,
    #[serde(alias = "qualis_duplicates")]
    pub registry_duplicates: RegistryDuplicates,
    pub unmatched_renames: UnmatchedRenames,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a rule document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Rules`] when the document is not valid JSON or
    /// does not match the expected shape.
    pub fn from_json(input: &str) -> Result<Self> {
        let rules: RuleSet =
            serde_json::from_str(input).map_err(|e| ConfError::Rules(e.to_string()))?;
        for warning in rules.conflicts() {
            log::warn!("Rules: {warning}");
        }
        Ok(rules)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Never apply `current -> proposed`.
    pub fn with_ignore(mut self, current: &str, proposed: &str) -> Self {
        self.ignore_renames.insert(
            current.to_string(),
            IgnoreRename {
                wrong_rename: proposed.to_string(),
            },
        );
        self
    }

    /// Always apply `current -> new_name`, even over conflicts.
    pub fn with_force(mut self, current: &str, new_name: &str) -> Self {
        self.force_renames.insert(
            current.to_string(),
            ForceRename {
                new_name: new_name.to_string(),
            },
        );
        self
    }

    /// Fold every acronym of `absorbs` into `target`.
    pub fn with_unification(mut self, target: &str, absorbs: &[&str]) -> Self {
        self.unifications
            .entry(target.to_string())
            .or_default()
            .absorbs
            .extend(absorbs.iter().map(|a| a.to_string()));
        self
    }

    pub fn with_unmatched_renames(mut self, policy: UnmatchedRenames) -> Self {
        self.unmatched_renames = policy;
        self
    }

    /// Decides what to do when a row for `current` proposes `proposed`.
    ///
    /// Precedence: an ignore rule for the exact pair, then a force rule, then
    /// a unification that absorbs `current` into `proposed`, then the
    /// unmatched-rename policy.
    pub fn decide(&self, current: &str, proposed: &str) -> Decision {
        let (current_key, proposed_key) = (casefold(current), casefold(proposed));
        if proposed_key.is_empty() || current_key == proposed_key {
            return Decision::NoOp;
        }

        let ignored = find(&self.ignore_renames, &current_key)
            .is_some_and(|rule| casefold(&rule.wrong_rename) == proposed_key);
        if ignored {
            log::debug!("Ignoring rename {current} -> {proposed}");
            return Decision::NoOp;
        }

        if let Some(rule) = find(&self.force_renames, &current_key) {
            if casefold(&rule.new_name) == proposed_key {
                return Decision::Rename {
                    new_primary: proposed.trim().to_string(),
                    forced: true,
                };
            }
        }

        if let Some(target) = self.unification_target(current, proposed) {
            return Decision::Merge {
                target: target.to_string(),
            };
        }

        match self.unmatched_renames {
            UnmatchedRenames::Apply => Decision::Rename {
                new_primary: proposed.trim().to_string(),
                forced: false,
            },
            UnmatchedRenames::Ignore => Decision::NoOp,
        }
    }

    /// The unification target when `proposed` is a target that absorbs
    /// `current`.
    pub fn unification_target(&self, current: &str, proposed: &str) -> Option<&str> {
        let (current_key, proposed_key) = (casefold(current), casefold(proposed));
        self.unifications
            .iter()
            .find(|(target, unification)| {
                casefold(target) == proposed_key
                    && unification.absorbs.iter().any(|a| casefold(a) == current_key)
            })
            .map(|(target, _)| target.as_str())
    }

    /// Ids the registry loader must drop, with the acronym each rule names.
    pub fn registry_removals(&self) -> HashMap<CompId, String> {
        let mut removals = HashMap::new();
        for (acronym, removal) in &self.registry_duplicates.unify {
            for id in &removal.remove {
                match id.parse::<CompId>() {
                    Ok(comp_id) => {
                        removals.insert(comp_id, acronym.clone());
                    }
                    Err(e) => log::warn!("Rules: registry duplicate of {acronym}: {e}"),
                }
            }
        }
        removals
    }

    /// Contradictions the rules contain. They are reported, not resolved.
    pub fn conflicts(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut absorbed_by: BTreeMap<String, &str> = BTreeMap::new();
        for (target, unification) in &self.unifications {
            for source in &unification.absorbs {
                let key = casefold(source);
                if key == casefold(target) {
                    warnings.push(format!("{target} absorbs itself"));
                } else if let Some(previous) = absorbed_by.insert(key, target.as_str()) {
                    warnings.push(format!("{source} is absorbed by both {previous} and {target}"));
                }
            }
        }
        for (current, force) in &self.force_renames {
            let ignored = find(&self.ignore_renames, &casefold(current))
                .is_some_and(|rule| casefold(&rule.wrong_rename) == casefold(&force.new_name));
            if ignored {
                warnings.push(format!(
                    "{current} -> {} is both forced and ignored; the ignore rule wins",
                    force.new_name
                ));
            }
        }
        warnings
    }
}

/// Looks a rule up by casefolded acronym.
fn find<'a, T>(rules: &'a BTreeMap<String, T>, key: &str) -> Option<&'a T> {
    rules
        .iter()
        .find(|(acronym, _)| casefold(acronym) == key)
        .map(|(_, rule)| rule)
}
