use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{BttokError, Result};

/// Word separator of the joined wakati text; its vector is not kept.
const SEPARATOR: &str = "_";

/// Character embeddings read from a fastText `.vec` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharVectors {
    vectors: BTreeMap<String, Vec<f32>>,
}

impl CharVectors {
    /// Parses the text format: a `<count> <dim>` header, then one
    /// `<token> <f32>...` row per token.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut vectors = BTreeMap::new();
        for (i, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            let mut fields = line.split_whitespace();
            let token = match fields.next() {
                Some(token) if token != SEPARATOR => token,
                _ => continue,
            };
            let vector = fields
                .map(|v| {
                    v.parse::<f32>()
                        .map_err(|e| {
                            BttokError::invalid_format("vector", i + 1, format!("{}: {:?}", e, v))
                        })
                })
                .collect::<Result<Vec<f32>>>()?;
            vectors.insert(token.to_string(), vector);
        }
        Ok(CharVectors { vectors })
    }

    /// Reads a fastText `.vec` file from disk. See [`CharVectors::parse`].
    pub fn load_vec(path: &Path) -> Result<Self> {
        Self::parse(BufReader::new(File::open(path)?))
    }

    /// Returns the embedding of `token`, or `None` for an unknown token.
    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Writes the vectors as a JSON object of token to array.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &self.vectors)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let vectors = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Ok(CharVectors { vectors })
    }
}
