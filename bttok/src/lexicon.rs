use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{BttokError, Result};
use crate::index::{FeatureKey, TokenKey};
use crate::tagger::TaggedToken;

/// Coarse part-of-speech tags keyed by (ordinal in sentence, surface).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosLexicon {
    tags: HashMap<TokenKey, String>,
}

impl PosLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tag. The first tag recorded for a key is kept.
    pub fn insert<S: Into<String>, T: Into<String>>(&mut self, ordinal: usize, surface: S, tag: T) {
        self.tags
            .entry(TokenKey::new(ordinal, surface))
            .or_insert_with(|| tag.into());
    }

    /// Records every token of one tagged sentence under its coarse tag.
    pub fn add_sentence(&mut self, tokens: &[TaggedToken]) {
        for (ordinal, token) in tokens.iter().enumerate() {
            self.insert(ordinal, token.surface.as_str(), token.coarse_pos());
        }
    }

    /// Looks up a segment by its position in the sentence and its text.
    ///
    /// # Arguments
    /// * `ordinal` - Zero-based index of the segment in its sentence.
    /// * `surface` - The segment text.
    ///
    /// # Returns
    /// The coarse tag, or `None` if the pair was never seen.
    pub fn get(&self, ordinal: usize, surface: &str) -> Option<&str> {
        self.tags
            .get(&TokenKey::new(ordinal, surface))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Saves the lexicon as a JSON object of `ordinal:surface` to tag.
    pub fn save(&self, path: &Path) -> Result<()> {
        let map: BTreeMap<String, &str> = self
            .tags
            .iter()
            .map(|(key, tag)| (key.encode(), tag.as_str()))
            .collect();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &map)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads a lexicon saved with [`PosLexicon::save`].
    ///
    /// # Errors
    /// Returns [`BttokError::InvalidIndex`] if a key is not `ordinal:surface`.
    pub fn load(path: &Path) -> Result<Self> {
        let map: BTreeMap<String, String> =
            serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let mut tags = HashMap::with_capacity(map.len());
        for (encoded, tag) in map {
            let key = TokenKey::decode(&encoded).ok_or_else(|| {
                BttokError::InvalidIndex(format!("undecodable lexicon key {:?}", encoded))
            })?;
            tags.insert(key, tag);
        }
        Ok(PosLexicon { tags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_first_tag_wins() {
        let mut lexicon = PosLexicon::new();
        lexicon.insert(0, "見", "動詞");
        lexicon.insert(0, "見", "名詞");
        assert_eq!(lexicon.get(0, "見"), Some("動詞"));
        assert_eq!(lexicon.get(1, "見"), None);
        assert_eq!(lexicon.len(), 1);
    }

    #[test]
    fn test_add_sentence_uses_coarse_tags() {
        let mut lexicon = PosLexicon::new();
        lexicon.add_sentence(&[
            TaggedToken::new("母", "名詞-一般"),
            TaggedToken::new("の", "助詞-連体化"),
        ]);
        assert_eq!(lexicon.get(0, "母"), Some("名詞"));
        assert_eq!(lexicon.get(1, "の"), Some("助詞"));
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let mut lexicon = PosLexicon::new();
        lexicon.insert(0, "映画", "名詞");
        lexicon.insert(3, "a:b", "記号");

        let file = NamedTempFile::new()?;
        lexicon.save(file.path())?;
        assert_eq!(PosLexicon::load(file.path())?, lexicon);
        Ok(())
    }
}
