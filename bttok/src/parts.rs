use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::index::{FeatureIndex, IndexBuilder, TokenKey};
use crate::sparse::{RowLabel, SparseVector};
use crate::tagger::{TaggedToken, Tagger};
use crate::window::Padding;

/// Token window of the part-of-speech dataset.
///
/// With the defaults a row covers `terms[i..i+4]` as head, `terms[i+4]` as
/// target and `terms[i+6..i+10]` as tail; the token right after the target
/// is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsWindow {
    pub head_len: usize,
    pub tail_skip: usize,
    pub tail_len: usize,
}

impl Default for PartsWindow {
    fn default() -> Self {
        PartsWindow {
            head_len: 4,
            tail_skip: 1,
            tail_len: 4,
        }
    }
}

impl PartsWindow {
    fn tail_start(&self) -> usize {
        self.head_len + 1 + self.tail_skip
    }

    fn span(&self) -> usize {
        self.tail_start() + self.tail_len
    }
}

/// Sentinel text around each review before tagging, so that the first
/// tokens of the review get a full head.
pub fn parts_padding() -> Padding {
    Padding::repeat('*', 8, 12)
}

/// One line of the raw part-of-speech dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartsRow {
    pub head: Vec<String>,
    pub target: String,
    pub tail: Vec<String>,
    pub tag: String,
}

impl PartsRow {
    /// Parses a whitespace separated row. The last field is the tag and the
    /// first `head_len` fields are the head. Returns `None` if the row is too
    /// short to contain a target.
    pub fn parse(line: &str, head_len: usize) -> Option<Self> {
        let mut fields: Vec<&str> = line.split_whitespace().collect();
        let tag = fields.pop()?.to_string();
        if fields.len() <= head_len {
            return None;
        }
        let tail = fields.split_off(head_len + 1);
        let target = fields.pop()?.to_string();

        Some(PartsRow {
            head: fields.into_iter().map(str::to_string).collect(),
            target,
            tail: tail.into_iter().map(str::to_string).collect(),
            tag,
        })
    }

    /// All terms of the row in order, paired with their position.
    pub fn terms(&self) -> impl Iterator<Item = (usize, &str)> {
        self.head
            .iter()
            .chain(std::iter::once(&self.target))
            .chain(self.tail.iter())
            .map(String::as_str)
            .enumerate()
    }
}

impl fmt::Display for PartsRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for term in self.head.iter().chain(std::iter::once(&self.target)).chain(self.tail.iter()) {
            write!(f, "{} ", term)?;
        }
        write!(f, "{}", self.tag)
    }
}

/// Slides `window` over the wakati `terms` and emits a row wherever the
/// tagger's token at the target position has the same surface as the
/// target term. Other positions are skipped.
pub fn extract_pairs<S: AsRef<str>>(
    terms: &[S],
    tagged: &[TaggedToken],
    window: &PartsWindow,
) -> Vec<PartsRow> {
    let mut rows = Vec::new();
    for i in 0..terms.len().saturating_sub(window.span()) {
        let target_pos = i + window.head_len;
        let target = terms[target_pos].as_ref();
        let part = match tagged.get(target_pos) {
            Some(part) if part.surface == target => part,
            _ => continue,
        };

        let tail_start = (i + window.tail_start()).min(terms.len());
        let tail_end = (i + window.span()).min(terms.len());
        rows.push(PartsRow {
            head: terms[i..target_pos].iter().map(|t| t.as_ref().to_string()).collect(),
            target: target.to_string(),
            tail: terms[tail_start..tail_end]
                .iter()
                .map(|t| t.as_ref().to_string())
                .collect(),
            tag: part.pos.clone(),
        });
    }
    rows
}

/// Pads, tokenizes and tags one review, then extracts its rows.
pub fn extract_review<T: Tagger + ?Sized>(
    tagger: &mut T,
    review: &str,
    window: &PartsWindow,
    padding: &Padding,
) -> Result<Vec<PartsRow>> {
    let text = format!("{}{}{}", padding.left, review, padding.right);
    let terms = tagger.wakati(&text)?;
    let tagged = tagger.tag(&text)?;
    Ok(extract_pairs(&terms, &tagged, window))
}

/// Collects the (position, term) and tag vocabularies of a parts dataset.
#[derive(Debug, Default)]
pub struct PartsIndexBuilder {
    terms: IndexBuilder<TokenKey>,
    tags: IndexBuilder<String>,
}

impl PartsIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, row: &PartsRow) {
        self.terms
            .extend(row.terms().map(|(position, term)| TokenKey::new(position, term)));
        self.tags.insert(row.tag.clone());
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn finish(self) -> PartsVectorizer {
        PartsVectorizer {
            terms: self.terms.finish(),
            tags: self.tags.finish(),
        }
    }
}

/// Turns parts rows into multiclass training rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartsVectorizer {
    pub terms: FeatureIndex<TokenKey>,
    pub tags: FeatureIndex<String>,
}

impl PartsVectorizer {
    pub fn vectorize(&self, row: &PartsRow) -> SparseVector {
        row.terms()
            .filter_map(|(position, term)| self.terms.get(&TokenKey::new(position, term)))
            .collect()
    }

    /// Renders `row` labelled with its tag's class id. Returns `None` if the
    /// tag is not in the tag index.
    pub fn to_row(&self, row: &PartsRow) -> Option<String> {
        let class = self.tags.get(&row.tag)?;
        Some(self.vectorize(row).to_row(RowLabel::Class(class)))
    }
}
