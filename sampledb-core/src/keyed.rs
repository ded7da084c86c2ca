//! Ordered collections addressed by natural key
//!
//! Raw sequence groups, FASTQ runs and processed files are stored as JSON
//! arrays but addressed by identity fields. Lookups are a linear scan where
//! the first match wins, so abnormal duplicates resolve to the earliest entry.

use crate::model::{FastqRun, ProcessedFile, RawSequenceGroup, RunKey};

/// An element that carries its own identity within a list
pub trait NaturalKey {
    type Key: ?Sized;

    fn has_key(&self, key: &Self::Key) -> bool;
}

impl NaturalKey for RawSequenceGroup {
    type Key = str;

    fn has_key(&self, key: &str) -> bool {
        self.gf_id == key
    }
}

impl NaturalKey for FastqRun {
    type Key = RunKey;

    fn has_key(&self, key: &RunKey) -> bool {
        self.gf_project == key.gf_project && self.run == key.run
    }
}

impl NaturalKey for ProcessedFile {
    type Key = str;

    fn has_key(&self, key: &str) -> bool {
        self.file_path == key
    }
}

/// Find the first element matching `matches`, appending `make()` if none does.
///
/// Returns the element and whether it was inserted.
pub fn find_or_insert_by<T>(
    items: &mut Vec<T>,
    matches: impl Fn(&T) -> bool,
    make: impl FnOnce() -> T,
) -> (&mut T, bool) {
    match items.iter().position(matches) {
        Some(index) => (&mut items[index], false),
        None => {
            items.push(make());
            let last = items.len() - 1;
            (&mut items[last], true)
        }
    }
}

pub fn find_or_insert<'a, T: NaturalKey>(
    items: &'a mut Vec<T>,
    key: &T::Key,
    make: impl FnOnce() -> T,
) -> (&'a mut T, bool) {
    find_or_insert_by(items, |item| item.has_key(key), make)
}

pub fn contains_key<T: NaturalKey>(items: &[T], key: &T::Key) -> bool {
    items.iter().any(|item| item.has_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserts_when_absent() {
        let mut groups: Vec<RawSequenceGroup> = Vec::new();
        let (group, inserted) = find_or_insert(&mut groups, "GF1", || RawSequenceGroup::new("GF1"));
        assert!(inserted);
        assert_eq!(group.gf_id, "GF1");
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_existing_is_reused() {
        let mut groups = vec![RawSequenceGroup::new("GF1"), RawSequenceGroup::new("GF2")];
        let (group, inserted) = find_or_insert(&mut groups, "GF2", || RawSequenceGroup::new("GF2"));
        assert!(!inserted);
        group.extra.insert("seen".into(), serde_json::Value::Bool(true));
        assert_eq!(groups.len(), 2);
        assert!(groups[1].extra.contains_key("seen"));
    }

    #[test]
    fn test_first_match_wins() {
        let mut runs = vec![
            FastqRun::new(&RunKey::new("P1", "run1")),
            FastqRun::new(&RunKey::new("P1", "run1")),
        ];
        let key = RunKey::new("P1", "run1");
        let (run, inserted) = find_or_insert(&mut runs, &key, || FastqRun::new(&key));
        assert!(!inserted);
        run.files.insert("L001".into(), Default::default());
        assert!(runs[0].files.contains_key("L001"));
        assert!(runs[1].files.is_empty());
    }

    #[test]
    fn test_run_key_needs_both_fields() {
        let runs = vec![FastqRun::new(&RunKey::new("P1", "run1"))];
        assert!(contains_key(&runs, &RunKey::new("P1", "run1")));
        assert!(!contains_key(&runs, &RunKey::new("P2", "run1")));
        assert!(!contains_key(&runs, &RunKey::new("P1", "run2")));
    }
}
