use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::hash::Hash;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::errors::{BttokError, Result};

/// A key that can be stored in a [`FeatureIndex`].
///
/// Keys are persisted as plain strings, so every key type must be able to
/// round-trip through [`FeatureKey::encode`] and [`FeatureKey::decode`].
pub trait FeatureKey: Ord + Hash + Clone {
    /// Encodes the key into its persisted string form.
    fn encode(&self) -> String;

    /// Decodes a persisted string. Returns `None` if the string is not a
    /// valid encoding.
    fn decode(s: &str) -> Option<Self>;
}

/// A (window offset, character) pair.
///
/// Persisted as the decimal offset immediately followed by the character,
/// e.g. `3あ`. The character is always the last `char` of the string, so a
/// digit character stays unambiguous (`12` is offset 1, character `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharKey {
    pub offset: usize,
    pub ch: char,
}

impl CharKey {
    pub fn new(offset: usize, ch: char) -> Self {
        CharKey { offset, ch }
    }
}

impl FeatureKey for CharKey {
    fn encode(&self) -> String {
        format!("{}{}", self.offset, self.ch)
    }

    fn decode(s: &str) -> Option<Self> {
        let ch = s.chars().next_back()?;
        let offset = s[..s.len() - ch.len_utf8()].parse().ok()?;
        Some(CharKey { offset, ch })
    }
}

/// A (window position, surface token) pair, persisted as `position:token`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenKey {
    pub position: usize,
    pub token: String,
}

impl TokenKey {
    pub fn new<S: Into<String>>(position: usize, token: S) -> Self {
        TokenKey {
            position,
            token: token.into(),
        }
    }
}

impl FeatureKey for TokenKey {
    fn encode(&self) -> String {
        format!("{}:{}", self.position, self.token)
    }

    fn decode(s: &str) -> Option<Self> {
        let (position, token) = s.split_once(':')?;
        Some(TokenKey {
            position: position.parse().ok()?,
            token: token.to_string(),
        })
    }
}

/// Plain labels, such as part-of-speech tags.
impl FeatureKey for String {
    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(s: &str) -> Option<Self> {
        Some(s.to_string())
    }
}

/// Immutable mapping from feature keys to dense ids starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureIndex<K: FeatureKey> {
    ids: HashMap<K, u32>,
}

impl<K: FeatureKey> Default for FeatureIndex<K> {
    fn default() -> Self {
        FeatureIndex {
            ids: HashMap::new(),
        }
    }
}

impl<K: FeatureKey> FeatureIndex<K> {
    /// Builds an index from arbitrary keys. Duplicates are collapsed and ids
    /// follow the sorted key order.
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut builder = IndexBuilder::new();
        builder.extend(keys);
        builder.finish()
    }

    /// Returns the id of `key`, or `None` when the key was never observed.
    pub fn get(&self, key: &K) -> Option<u32> {
        self.ids.get(key).copied()
    }

    /// Number of keys, which is also one past the largest id.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns all entries ordered by id.
    pub fn entries(&self) -> Vec<(&K, u32)> {
        let mut entries: Vec<(&K, u32)> = self.ids.iter().map(|(k, &id)| (k, id)).collect();
        entries.sort_by_key(|&(_, id)| id);
        entries
    }

    /// Writes the index as a JSON object of encoded key to id.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let map: BTreeMap<String, u32> = self.ids.iter().map(|(k, &id)| (k.encode(), id)).collect();
        serde_json::to_writer(writer, &map)?;
        Ok(())
    }

    /// Reads an index written by [`FeatureIndex::write_json`].
    ///
    /// # Errors
    /// Returns [`BttokError::InvalidIndex`] if a key cannot be decoded or if
    /// the ids are not exactly `0..len`.
    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        let map: BTreeMap<String, u32> = serde_json::from_reader(reader)?;

        let mut seen = vec![false; map.len()];
        let mut ids = HashMap::with_capacity(map.len());
        for (encoded, id) in map {
            let key = K::decode(&encoded)
                .ok_or_else(|| BttokError::InvalidIndex(format!("undecodable key {:?}", encoded)))?;
            match seen.get_mut(id as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(BttokError::InvalidIndex(format!(
                        "id {} of key {:?} is duplicated or out of range",
                        id, encoded
                    )))
                }
            }
            if ids.insert(key, id).is_some() {
                return Err(BttokError::InvalidIndex(format!(
                    "key {:?} decodes to a duplicate",
                    encoded
                )));
            }
        }

        Ok(FeatureIndex { ids })
    }

    /// Saves the index as JSON.
    ///
    /// # Arguments
    /// * `path` - The file to create or truncate.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads an index saved with [`FeatureIndex::save`].
    ///
    /// # Arguments
    /// * `path` - The JSON file to read.
    ///
    /// # Errors
    /// Returns [`BttokError::InvalidIndex`] if the ids are not dense or a
    /// key cannot be decoded as `K`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::read_json(BufReader::new(File::open(path)?))
    }
}

/// Accumulates distinct keys and assigns ids once the corpus is exhausted.
#[derive(Debug, Clone)]
pub struct IndexBuilder<K: FeatureKey> {
    keys: BTreeSet<K>,
}

impl<K: FeatureKey> Default for IndexBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: FeatureKey> IndexBuilder<K> {
    pub fn new() -> Self {
        IndexBuilder {
            keys: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, key: K) {
        self.keys.insert(key);
    }

    pub fn extend<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
    {
        self.keys.extend(keys);
    }

    /// Number of distinct keys observed so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Assigns ids in sorted key order, so the same corpus always yields
    /// the same index.
    pub fn finish(self) -> FeatureIndex<K> {
        let ids = self
            .keys
            .into_iter()
            .enumerate()
            .map(|(id, key)| (key, id as u32))
            .collect();
        FeatureIndex { ids }
    }
}
