use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{BttokError, Result};

/// Named window configurations.
///
/// A model trained with one preset must be decoded with the same preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Width 8, boundary after offset 3.
    Wakati,
    /// Width 10, boundary after offset 4.
    WakatiWide,
}

/// Sentinel text added around the input before windowing, so that the
/// first and last characters get a full window of context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub left: String,
    pub right: String,
}

impl Padding {
    /// `sentinel` repeated `left_count` times before and `right_count` times after.
    pub fn repeat(sentinel: char, left_count: usize, right_count: usize) -> Self {
        Padding {
            left: std::iter::repeat(sentinel).take(left_count).collect(),
            right: std::iter::repeat(sentinel).take(right_count).collect(),
        }
    }
}

/// Shape of the character windows fed to the scorer.
///
/// A `WindowConfig` is always valid: `width` is positive and the target
/// offset lies inside the window. Deserialization checks this too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowConfigFile")]
pub struct WindowConfig {
    width: usize,
    target_offset: usize,
    padding: Option<Padding>,
}

/// Unchecked form of [`WindowConfig`] as it appears in JSON files.
#[derive(Deserialize)]
struct WindowConfigFile {
    width: usize,
    target_offset: usize,
    #[serde(default)]
    padding: Option<Padding>,
}

impl TryFrom<WindowConfigFile> for WindowConfig {
    type Error = BttokError;

    fn try_from(file: WindowConfigFile) -> Result<Self> {
        let config = WindowConfig::new(file.width, file.target_offset)?;
        Ok(match file.padding {
            Some(padding) => config.with_padding(padding),
            None => config,
        })
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Wakati)
    }
}

impl WindowConfig {
    /// Creates an unpadded configuration.
    ///
    /// # Arguments
    /// * `width` - Number of characters in each window.
    /// * `target_offset` - Offset of the subject character inside a window.
    ///
    /// # Errors
    /// Returns [`BttokError::InvalidArgument`] if `width` is zero or
    /// `target_offset` does not fall inside the window.
    pub fn new(width: usize, target_offset: usize) -> Result<Self> {
        if width == 0 {
            return Err(BttokError::invalid_argument("width", "must be > 0"));
        }
        if target_offset >= width {
            return Err(BttokError::invalid_argument(
                "target_offset",
                format!("{} is outside a window of width {}", target_offset, width),
            ));
        }
        Ok(WindowConfig {
            width,
            target_offset,
            padding: None,
        })
    }

    pub fn from_preset(preset: Preset) -> Self {
        let (width, target_offset) = match preset {
            Preset::Wakati => (8, 3),
            Preset::WakatiWide => (10, 4),
        };
        WindowConfig {
            width,
            target_offset,
            padding: None,
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn target_offset(&self) -> usize {
        self.target_offset
    }

    pub fn padding(&self) -> Option<&Padding> {
        self.padding.as_ref()
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`BttokError::Json`] if the file is not a valid
    /// configuration, including one with an out of range shape.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    /// Number of padding characters placed before the text.
    pub fn left_padding(&self) -> usize {
        self.padding.as_ref().map_or(0, |p| p.left.chars().count())
    }

    /// Returns the characters of `text` with the configured padding applied.
    pub fn prepare(&self, text: &str) -> Vec<char> {
        match &self.padding {
            Some(padding) => padding
                .left
                .chars()
                .chain(text.chars())
                .chain(padding.right.chars())
                .collect(),
            None => text.chars().collect(),
        }
    }

    /// Number of windows over a prepared sequence of `len` characters.
    pub fn num_windows(&self, len: usize) -> usize {
        (len + 1).saturating_sub(self.width)
    }

    /// Iterates over every full window of a prepared sequence.
    pub fn windows<'a>(&self, chars: &'a [char]) -> impl Iterator<Item = Window<'a>> + 'a {
        let target_offset = self.target_offset;
        chars
            .windows(self.width)
            .enumerate()
            .map(move |(start, chars)| Window::new(start, chars, target_offset))
    }

    /// Maps a window start back to the position of its subject in the
    /// unpadded text. Returns `None` if the subject is a padding character.
    pub fn subject_position(&self, start: usize, text_len: usize) -> Option<usize> {
        (start + self.target_offset)
            .checked_sub(self.left_padding())
            .filter(|&pos| pos < text_len)
    }
}

/// A fixed-width slice of a character sequence with a designated subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    start: usize,
    chars: &'a [char],
    target_offset: usize,
}

impl<'a> Window<'a> {
    pub(crate) fn new(start: usize, chars: &'a [char], target_offset: usize) -> Self {
        debug_assert!(target_offset < chars.len());
        Window {
            start,
            chars,
            target_offset,
        }
    }

    /// Position of the first character in the prepared sequence.
    pub fn start(&self) -> usize {
        self.start
    }

    /// All characters of the window, subject included.
    pub fn chars(&self) -> &'a [char] {
        self.chars
    }

    /// The character whose boundary status the window decides.
    pub fn subject(&self) -> char {
        self.chars[self.target_offset]
    }

    /// Characters before the subject.
    pub fn head(&self) -> &'a [char] {
        &self.chars[..self.target_offset]
    }

    /// Characters after the subject.
    pub fn tail(&self) -> &'a [char] {
        &self.chars[self.target_offset + 1..]
    }
}
