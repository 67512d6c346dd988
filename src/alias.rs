//! Acronym lookup across primary and alternate acronyms.
//!
//! Keys are casefolded. A lookup consults primaries first, so an acronym that
//! is one record's primary and another's alternate resolves to the former.
//! Such overlaps are recorded as [`AliasCollision`]s instead of being dropped.

use std::collections::HashMap;

use crate::registry::{CompId, ConferenceRecord};
use crate::utils::casefold;

/// Result of an acronym lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub comp_id: CompId,
    /// Whether the acronym is the record's primary
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// Two records share a primary acronym
    DuplicatePrimary,
    /// An alternate of one record is another record's primary
    ShadowedByPrimary,
    /// Two records list the same alternate
    DuplicateAlternate,
}

/// An acronym that more than one record answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCollision {
    pub acronym: String,
    pub kind: CollisionKind,
    /// Record the index resolves the acronym to
    pub kept: CompId,
    /// Record whose claim is shadowed
    pub shadowed: CompId,
}

/// Index from acronym to record id.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    primary: HashMap<String, CompId>,
    alternate: HashMap<String, CompId>,
    collisions: Vec<AliasCollision>,
}

impl AliasIndex {
    /// Indexes every record's primary, then every alternate.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a ConferenceRecord>) -> Self {
        let records: Vec<&ConferenceRecord> = records.into_iter().collect();
        let mut index = Self::default();
        for record in &records {
            index.insert_primary(record.primary_acronym(), record.comp_id());
        }
        for record in &records {
            for alt in record.alt_acronyms() {
                index.insert_alternate(alt, record.comp_id());
            }
        }
        index
    }

    pub fn resolve(&self, acronym: &str) -> Option<Resolved> {
        let key = casefold(acronym);
        if key.is_empty() {
            return None;
        }
        if let Some(&comp_id) = self.primary.get(&key) {
            return Some(Resolved {
                comp_id,
                is_primary: true,
            });
        }
        self.alternate.get(&key).map(|&comp_id| Resolved {
            comp_id,
            is_primary: false,
        })
    }

    /// Overlaps seen while building or updating the index.
    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    /// Number of indexed acronyms.
    pub fn len(&self) -> usize {
        self.primary.len() + self.alternate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.alternate.is_empty()
    }

    /// Points `acronym` at `comp_id` as a primary.
    ///
    /// An existing primary of another record is kept and the collision is
    /// recorded; an alternate entry for the key is replaced.
    pub(crate) fn insert_primary(&mut self, acronym: &str, comp_id: CompId) {
        let key = casefold(acronym);
        if key.is_empty() {
            return;
        }
        match self.primary.get(&key) {
            Some(&existing) if existing != comp_id => {
                self.collide(acronym, CollisionKind::DuplicatePrimary, existing, comp_id);
            }
            Some(_) => {}
            None => {
                if let Some(previous) = self.alternate.remove(&key) {
                    if previous != comp_id {
                        self.collide(acronym, CollisionKind::ShadowedByPrimary, comp_id, previous);
                    }
                }
                self.primary.insert(key, comp_id);
            }
        }
    }

    /// Points `acronym` at `comp_id` as an alternate, unless another record
    /// already claims it.
    pub(crate) fn insert_alternate(&mut self, acronym: &str, comp_id: CompId) {
        let key = casefold(acronym);
        if key.is_empty() {
            return;
        }
        if let Some(&owner) = self.primary.get(&key) {
            if owner != comp_id {
                self.collide(acronym, CollisionKind::ShadowedByPrimary, owner, comp_id);
            }
            return;
        }
        match self.alternate.get(&key) {
            Some(&owner) if owner != comp_id => {
                self.collide(acronym, CollisionKind::DuplicateAlternate, owner, comp_id);
            }
            Some(_) => {}
            None => {
                self.alternate.insert(key, comp_id);
            }
        }
    }

    /// Removes an alternate entry if it belongs to `comp_id`.
    pub(crate) fn remove_alternate(&mut self, acronym: &str, comp_id: CompId) {
        let key = casefold(acronym);
        if self.alternate.get(&key) == Some(&comp_id) {
            self.alternate.remove(&key);
        }
    }

    /// Moves `old` from primary to alternate and makes `new` the primary.
    pub(crate) fn rename(&mut self, old: &str, new: &str, comp_id: CompId) {
        let old_key = casefold(old);
        if self.primary.get(&old_key) == Some(&comp_id) {
            self.primary.remove(&old_key);
        }
        self.remove_alternate(new, comp_id);
        self.insert_primary(new, comp_id);
        if old_key != casefold(new) {
            self.insert_alternate(old, comp_id);
        }
    }

    /// Reassigns every key of `from` to `to`. Primaries of `from` become
    /// alternates of `to`. Keys `from` never won are left alone.
    pub(crate) fn redirect(&mut self, from: CompId, to: CompId) {
        let moved: Vec<String> = self
            .primary
            .iter()
            .filter(|(_, id)| **id == from)
            .map(|(key, _)| key.clone())
            .collect();
        for key in moved {
            self.primary.remove(&key);
            self.alternate.insert(key, to);
        }
        for id in self.alternate.values_mut() {
            if *id == from {
                *id = to;
            }
        }
    }

    fn collide(&mut self, acronym: &str, kind: CollisionKind, kept: CompId, shadowed: CompId) {
        log::warn!("Acronym '{acronym}' is claimed by {kept} and {shadowed} ({kind:?}), resolving to {kept}");
        self.collisions.push(AliasCollision {
            acronym: acronym.trim().to_string(),
            kind,
            kept,
            shadowed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn record(id: u32, acronym: &str, alts: &[&str]) -> ConferenceRecord {
        let mut record = ConferenceRecord::new(CompId(id), acronym, acronym);
        for alt in alts {
            record.add_alt_acronym(alt);
        }
        record
    }

    #[fixture]
    fn index() -> AliasIndex {
        AliasIndex::build(&[
            record(1, "SBES", &["SBES-old", "CBSoft"]),
            record(2, "CBSoft", &[]),
            record(3, "SBQS", &["SBES-old"]),
        ])
    }

    #[rstest]
    #[case("SBES", Some((1, true)))]
    #[case("sbes-OLD", Some((1, false)))]
    #[case(" CBSoft ", Some((2, true)))]
    #[case("SBQS", Some((3, true)))]
    #[case("unknown", None)]
    #[case("", None)]
    fn test_resolve(index: AliasIndex, #[case] acronym: &str, #[case] expected: Option<(u32, bool)>) {
        assert_eq!(
            index.resolve(acronym).map(|r| (r.comp_id.0, r.is_primary)),
            expected
        );
    }

    #[rstest]
    fn test_collisions_are_recorded(index: AliasIndex) {
        let kinds: Vec<_> = index
            .collisions()
            .iter()
            .map(|c| (c.acronym.as_str(), c.kind, c.kept.0, c.shadowed.0))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("CBSoft", CollisionKind::ShadowedByPrimary, 2, 1),
                ("SBES-old", CollisionKind::DuplicateAlternate, 1, 3),
            ]
        );
    }

    #[test]
    fn test_rename_and_redirect() {
        let mut index = AliasIndex::build(&[record(1, "A", &[]), record(2, "B", &["B2"])]);

        index.rename("A", "A2", CompId(1));
        assert_eq!(index.resolve("A2").map(|r| r.is_primary), Some(true));
        assert_eq!(index.resolve("A").map(|r| (r.comp_id.0, r.is_primary)), Some((1, false)));

        index.redirect(CompId(2), CompId(1));
        for key in ["B", "B2"] {
            assert_eq!(
                index.resolve(key).map(|r| (r.comp_id.0, r.is_primary)),
                Some((1, false))
            );
        }
        assert_eq!(index.len(), 4);
    }
}
