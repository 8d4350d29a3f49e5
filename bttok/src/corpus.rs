use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{BttokError, Result};

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\\x00-\x1f]").unwrap());

/// One line of the review corpus. Other fields of the JSON object are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub title: String,
    pub review: String,
}

impl Review {
    /// A file name derived from the title that stays inside its directory.
    pub fn file_stem(&self) -> String {
        let stem = UNSAFE_FILE_CHARS.replace_all(&self.title, "_");
        match stem.as_ref() {
            "" | "." | ".." => "_".to_string(),
            _ => stem.into_owned(),
        }
    }

    /// The review text as space separated characters.
    pub fn char_array(&self) -> String {
        let chars: Vec<String> = self.review.chars().map(String::from).collect();
        chars.join(" ")
    }
}

/// Streams reviews from a JSON lines reader, skipping blank lines.
pub struct Reviews<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Reviews<R> {
    pub fn new(reader: R) -> Self {
        Reviews {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl Reviews<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for Reviews<R> {
    type Item = Result<Review>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line)
                    .map_err(|e| BttokError::invalid_format("review", self.line_no, e.to_string())),
            );
        }
    }
}
