//! Ordered collection addressable by position and by symbolic key.
//!
//! [`Registry`] keeps entries in insertion order and maintains a
//! `key -> position` side table for the entries that were given a key.
//! Replacing an entry (by index or by key) keeps its position and its
//! key, so positional and keyed views never disagree.

use indexmap::IndexMap;

use crate::error::RegistryError;

/// An insertion-ordered collection with optional unique keys.
///
/// # Examples
///
/// ```
/// use shoal_core::Registry;
///
/// let mut reg = Registry::new();
/// reg.push("anonymous");
/// reg.insert("avg", "horizontal average");
/// assert_eq!(reg.get(1), Some(&"horizontal average"));
///
/// reg.set(1, "replacement").unwrap();
/// assert_eq!(reg.get_by_key("avg"), Some(&"replacement"));
/// assert_eq!(reg.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct Registry<T> {
    entries: Vec<T>,
    keys: Vec<Option<String>>,
    positions: IndexMap<String, usize>,
}

impl<T> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            keys: Vec::new(),
            positions: IndexMap::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry without a key. Returns its position.
    pub fn push(&mut self, item: T) -> usize {
        self.entries.push(item);
        self.keys.push(None);
        self.entries.len() - 1
    }

    /// Append an entry under `key`, failing if the key is taken.
    pub fn push_keyed(&mut self, key: impl Into<String>, item: T) -> Result<usize, RegistryError> {
        let key = key.into();
        if self.positions.contains_key(&key) {
            return Err(RegistryError::DuplicateKey { key });
        }
        let index = self.entries.len();
        self.entries.push(item);
        self.keys.push(Some(key.clone()));
        self.positions.insert(key, index);
        Ok(index)
    }

    /// Insert or replace by key.
    ///
    /// An existing key keeps its position and the old entry is returned;
    /// a new key is appended at the end.
    pub fn insert(&mut self, key: impl Into<String>, item: T) -> Option<T> {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&index) => Some(std::mem::replace(&mut self.entries[index], item)),
            None => {
                let index = self.entries.len();
                self.entries.push(item);
                self.keys.push(Some(key.clone()));
                self.positions.insert(key, index);
                None
            }
        }
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Mutable entry at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    /// Replace the entry at `index`, keeping its key. Returns the old entry.
    pub fn set(&mut self, index: usize, item: T) -> Result<T, RegistryError> {
        let len = self.entries.len();
        match self.entries.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, item)),
            None => Err(RegistryError::IndexOutOfBounds { index, len }),
        }
    }

    /// Entry registered under `key`.
    pub fn get_by_key(&self, key: &str) -> Option<&T> {
        self.positions.get(key).map(|&i| &self.entries[i])
    }

    /// Mutable entry registered under `key`.
    pub fn get_by_key_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.positions.get(key) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    /// Position of the entry registered under `key`.
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Key of the entry at `index`, if it has one.
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.keys.get(index).and_then(|k| k.as_deref())
    }

    /// Remove the entry at `index`, shifting later entries down by one.
    pub fn remove(&mut self, index: usize) -> Result<T, RegistryError> {
        let len = self.entries.len();
        if index >= len {
            return Err(RegistryError::IndexOutOfBounds { index, len });
        }
        let item = self.entries.remove(index);
        if let Some(key) = self.keys.remove(index) {
            self.positions.shift_remove(&key);
        }
        for pos in self.positions.values_mut() {
            if *pos > index {
                *pos -= 1;
            }
        }
        Ok(item)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(|k| k.as_deref())
    }

    /// Entries in position order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Mutable entries in position order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    /// `(key, entry)` pairs in position order.
    pub fn iter_with_keys(&self) -> impl Iterator<Item = (Option<&str>, &T)> {
        self.keys.iter().map(|k| k.as_deref()).zip(self.entries.iter())
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Registry<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
