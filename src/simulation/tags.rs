//! Tag-set indexed storage.
//!
//! Each tag is assigned a distinct bit index on first sight; a tag-set is a
//! bitmap over that universe. Subset and superset queries are bit-parallel,
//! which keeps the registry lookups on the scheduler's hot path cheap. For
//! stores of a few ten to a few thousand entries this is sufficient; larger
//! universes would want a prefix-tree index and sparse bitmap compression.

use std::collections::HashMap;

/// A bitmap over the tag universe of one store.
///
/// Invariant: trailing zero chunks are never materialized, so two bitmaps
/// are `==` iff they represent the same tag-set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Bitmap(Vec<u64>);

impl Bitmap {
    pub(crate) fn empty() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn with_bit(index: usize) -> Self {
        let mut chunks = vec![0u64; index / 64 + 1];
        chunks[index / 64] = 1 << (index % 64);
        Self(chunks)
    }

    pub(crate) fn or(&mut self, other: &Bitmap) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (chunk, other_chunk) in self.0.iter_mut().zip(&other.0) {
            *chunk |= other_chunk;
        }
    }

    /// Whether every bit of `target` is set in `self`.
    pub(crate) fn contains(&self, target: &Bitmap) -> bool {
        if target.0.len() > self.0.len() {
            return false;
        }
        self.0
            .iter()
            .zip(&target.0)
            .all(|(chunk, target_chunk)| chunk & target_chunk == *target_chunk)
    }

    /// Whether every bit of `self` is set in `target`.
    pub(crate) fn contained_in(&self, target: &Bitmap) -> bool {
        target.contains(self)
    }
}

/// A set of `(tag-set, value)` entries queryable by containment.
///
/// Entries keep their insertion order, which is also the iteration order of
/// [`containing`](Self::containing) and [`contained_in`](Self::contained_in).
pub(crate) struct TaggedStore<T> {
    bits_by_tag: HashMap<String, usize>,
    entries: Vec<(Bitmap, T)>,
}

impl<T> TaggedStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            bits_by_tag: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Replaces the value stored under exactly `tags`, or inserts a new
    /// entry. Panics on an empty tag list.
    pub(crate) fn set(&mut self, value: T, tags: &[String]) {
        if tags.is_empty() {
            panic!("tags must not be empty");
        }

        let bitmap = self.assign_bitmap(tags);

        if let Some(entry) = self.entries.iter_mut().find(|(entry_bitmap, _)| *entry_bitmap == bitmap) {
            entry.1 = value;
            return;
        }

        self.entries.push((bitmap, value));
    }

    /// The value whose tag-set equals `tags`.
    pub(crate) fn matching(&self, tags: &[String]) -> Option<&T> {
        let bitmap = self.known_bitmap(tags)?;
        self.entries
            .iter()
            .find(|(entry_bitmap, _)| *entry_bitmap == bitmap)
            .map(|(_, value)| value)
    }

    pub(crate) fn matching_mut(&mut self, tags: &[String]) -> Option<&mut T> {
        let bitmap = self.known_bitmap(tags)?;
        self.entries
            .iter_mut()
            .find(|(entry_bitmap, _)| *entry_bitmap == bitmap)
            .map(|(_, value)| value)
    }

    /// All values whose tag-sets are supersets of `tags`.
    pub(crate) fn containing(&self, tags: &[String]) -> Vec<&T> {
        let Some(bitmap) = self.known_bitmap(tags) else {
            return Vec::new();
        };
        self.entries
            .iter()
            .filter(|(entry_bitmap, _)| entry_bitmap.contains(&bitmap))
            .map(|(_, value)| value)
            .collect()
    }

    /// All values whose tag-sets are subsets of `tags`.
    pub(crate) fn contained_in(&self, tags: &[String]) -> Vec<&T> {
        let bitmap = self.known_bitmap_lossy(tags);
        self.entries
            .iter()
            .filter(|(entry_bitmap, _)| entry_bitmap.contained_in(&bitmap))
            .map(|(_, value)| value)
            .collect()
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    fn assign_bitmap(&mut self, tags: &[String]) -> Bitmap {
        let mut bitmap = Bitmap::empty();
        for tag in tags {
            let next_index = self.bits_by_tag.len();
            let index = *self.bits_by_tag.entry(tag.clone()).or_insert(next_index);
            bitmap.or(&Bitmap::with_bit(index));
        }
        bitmap
    }

    // A tag that was never stored has no bit, so a query containing it can
    // neither equal nor be contained in any entry.
    fn known_bitmap(&self, tags: &[String]) -> Option<Bitmap> {
        let mut bitmap = Bitmap::empty();
        for tag in tags {
            let index = self.bits_by_tag.get(tag)?;
            bitmap.or(&Bitmap::with_bit(*index));
        }
        Some(bitmap)
    }

    // Unknown tags only widen a superset query; skipping them is exact.
    fn known_bitmap_lossy(&self, tags: &[String]) -> Bitmap {
        let mut bitmap = Bitmap::empty();
        for tag in tags {
            if let Some(index) = self.bits_by_tag.get(tag) {
                bitmap.or(&Bitmap::with_bit(*index));
            }
        }
        bitmap
    }
}

impl<T> Default for TaggedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn bitmap_with_bit() {
        let cases = [
            (0, vec![1u64]),
            (63, vec![1 << 63]),
            (64, vec![0, 1]),
            (127, vec![0, 1 << 63]),
        ];
        for (index, chunks) in cases {
            assert_eq!(Bitmap::with_bit(index), Bitmap(chunks), "index {index}");
        }
    }

    #[test]
    fn bitmap_or() {
        let cases = [
            (vec![], vec![], vec![]),
            (vec![1u64 << 63], vec![], vec![1 << 63]),
            (vec![0, 1 << 1], vec![1 << 1, 1 << 2], vec![1 << 1, 1 << 1 | 1 << 2]),
            (vec![1 << 1], vec![0, 1 << 2], vec![1 << 1, 1 << 2]),
        ];
        for (left, right, expected) in cases {
            let mut bitmap = Bitmap(left.clone());
            bitmap.or(&Bitmap(right.clone()));
            assert_eq!(bitmap, Bitmap(expected), "{left:?} | {right:?}");
        }
    }

    #[test]
    fn bitmap_contains() {
        let bitmap = Bitmap(vec![1 << 0 | 1 << 1, 1 << 0]);
        assert!(bitmap.contains(&Bitmap::empty()));
        assert!(bitmap.contains(&Bitmap(vec![1 << 0])));
        assert!(bitmap.contains(&Bitmap(vec![1 << 1, 1 << 0])));
        assert!(!bitmap.contains(&Bitmap(vec![1 << 2])));
        assert!(!bitmap.contains(&Bitmap(vec![0, 0, 1])));
    }

    #[test]
    fn bitmap_contained_in() {
        let bitmap = Bitmap(vec![1 << 1]);
        assert!(bitmap.contained_in(&Bitmap(vec![1 << 0 | 1 << 1])));
        assert!(bitmap.contained_in(&Bitmap(vec![1 << 1, 1 << 5])));
        assert!(!bitmap.contained_in(&Bitmap(vec![1 << 0])));
        assert!(Bitmap::empty().contained_in(&Bitmap(vec![1 << 0])));
    }

    #[test]
    fn set_then_matching_returns_the_value() {
        let mut store = TaggedStore::new();
        store.set(1, &tags(&["a", "b"]));

        assert_eq!(store.matching(&tags(&["a", "b"])), Some(&1));
        // Tag-sets are unordered.
        assert_eq!(store.matching(&tags(&["b", "a"])), Some(&1));
        assert_eq!(store.matching(&tags(&["a"])), None);
        assert_eq!(store.matching(&tags(&["a", "b", "c"])), None);
    }

    #[test]
    fn set_replaces_on_equal_tag_set() {
        let mut store = TaggedStore::new();
        store.set(1, &tags(&["a"]));
        store.set(2, &tags(&["a"]));

        assert_eq!(store.matching(&tags(&["a"])), Some(&2));
        assert_eq!(store.all().count(), 1);
    }

    #[test]
    #[should_panic(expected = "tags must not be empty")]
    fn set_panics_on_empty_tags() {
        let mut store = TaggedStore::new();
        store.set(1, &[]);
    }

    #[test]
    fn containing_returns_supersets_in_insertion_order() {
        let mut store = TaggedStore::new();
        store.set(1, &tags(&["a"]));
        store.set(2, &tags(&["a", "b"]));
        store.set(3, &tags(&["b"]));
        store.set(4, &tags(&["a", "b", "c"]));

        assert_eq!(store.containing(&tags(&["a"])), vec![&1, &2, &4]);
        assert_eq!(store.containing(&tags(&["a", "b"])), vec![&2, &4]);
        assert_eq!(store.containing(&tags(&["unseen"])), Vec::<&i32>::new());
        // The empty query is contained in everything.
        assert_eq!(store.containing(&[]), vec![&1, &2, &3, &4]);
    }

    #[test]
    fn contained_in_returns_subsets() {
        let mut store = TaggedStore::new();
        store.set(1, &tags(&["a"]));
        store.set(2, &tags(&["a", "b"]));
        store.set(3, &tags(&["c"]));

        assert_eq!(store.contained_in(&tags(&["a", "b"])), vec![&1, &2]);
        assert_eq!(store.contained_in(&tags(&["a", "b", "unseen"])), vec![&1, &2]);
        assert_eq!(store.contained_in(&tags(&["c"])), vec![&3]);
        assert_eq!(store.contained_in(&[]), Vec::<&i32>::new());
    }

    #[test]
    fn bit_indices_survive_many_tags() {
        let mut store = TaggedStore::new();
        for index in 0..200 {
            store.set(index, &tags(&[&format!("tag{index}")]));
        }
        store.set(1000, &tags(&["tag0", "tag199"]));

        assert_eq!(store.matching(&tags(&["tag0", "tag199"])), Some(&1000));
        assert_eq!(store.matching(&tags(&["tag150"])), Some(&150));
        assert_eq!(
            store.containing(&tags(&["tag199"])),
            vec![&199, &1000]
        );
    }
}
