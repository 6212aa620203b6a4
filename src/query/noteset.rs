use serde::Serialize;
use std::collections::HashSet;

/// An ordered set of noteIds. Iteration follows insertion order; membership checks are O(1).
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteSet {
    notes: Vec<String>,
    #[serde(skip)]
    members: HashSet<String>,
}

impl PartialEq for NoteSet {
    fn eq(&self, other: &Self) -> bool {
        self.notes == other.notes
    }
}

impl Eq for NoteSet {}

impl NoteSet {
    pub fn new() -> NoteSet {
        NoteSet::default()
    }

    /// Adds `note_id` at the end. Returns false if it was already present.
    pub fn add<S: Into<String>>(&mut self, note_id: S) -> bool {
        let note_id = note_id.into();
        if self.members.contains(&note_id) {
            return false;
        }
        self.members.insert(note_id.clone());
        self.notes.push(note_id);
        true
    }

    /// Stable union: appends the members of `other` not yet present, in `other`'s order.
    pub fn add_all(&mut self, other: &NoteSet) {
        for note_id in other.iter() {
            self.add(note_id);
        }
    }

    pub fn has(&self, note_id: &str) -> bool {
        self.members.contains(note_id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.notes.iter().map(String::as_str)
    }

    pub fn ids(&self) -> &[String] {
        &self.notes
    }

    pub fn into_ids(self) -> Vec<String> {
        self.notes
    }

    pub fn union(&self, other: &NoteSet) -> NoteSet {
        let mut union = self.clone();
        union.add_all(other);
        union
    }

    /// Members of `self` also in `other`, in `self`'s order.
    pub fn intersection(&self, other: &NoteSet) -> NoteSet {
        self.filter(|note_id| other.has(note_id))
    }

    /// Members of `self` not in `other`, in `self`'s order.
    pub fn minus(&self, other: &NoteSet) -> NoteSet {
        self.filter(|note_id| !other.has(note_id))
    }

    pub fn filter<F: FnMut(&str) -> bool>(&self, mut predicate: F) -> NoteSet {
        self.iter().filter(|note_id| predicate(*note_id)).collect()
    }

    pub fn is_subset(&self, other: &NoteSet) -> bool {
        self.iter().all(|note_id| other.has(note_id))
    }

    pub fn truncate(&mut self, len: usize) {
        for removed in self.notes.drain(len.min(self.notes.len())..) {
            self.members.remove(&removed);
        }
    }

    /// Reorder members with a stable sort. Membership is unchanged.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&String, &String) -> std::cmp::Ordering,
    {
        self.notes.sort_by(compare);
    }
}

impl<S: Into<String>> FromIterator<S> for NoteSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = NoteSet::new();
        for note_id in iter {
            set.add(note_id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a NoteSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}
