use std::fmt;

use crate::lexicon::PosLexicon;
use crate::window::{Window, WindowConfig};

/// Scores above this value mark a boundary after the window subject.
pub const BOUNDARY_THRESHOLD: f64 = 0.5;
/// Inserted after a subject that is followed by a boundary.
pub const BOUNDARY_MARK: char = '/';

/// A window together with the probability the scorer assigned to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredWindow<'a> {
    pub window: Window<'a>,
    pub score: f64,
}

impl ScoredWindow<'_> {
    pub fn is_boundary(&self) -> bool {
        self.score > BOUNDARY_THRESHOLD
    }
}

/// Pairs the windows of a prepared sequence with their scores. Windows
/// without a score are dropped, as are surplus scores.
pub fn scored_windows<'a>(
    chars: &'a [char],
    scores: &[f64],
    config: &WindowConfig,
) -> Vec<ScoredWindow<'a>> {
    config
        .windows(chars)
        .zip(scores.iter().copied())
        .map(|(window, score)| ScoredWindow { window, score })
        .collect()
}

/// Rebuilds `text` from window subjects, inserting `/` after every subject
/// whose window scored above the threshold.
///
/// Only subjects that belong to the unpadded text are emitted; padding is
/// skipped. When there are fewer scores than windows the output stops at
/// the last scored window.
pub fn reconstruct(text: &str, scores: &[f64], config: &WindowConfig) -> String {
    let chars = config.prepare(text);
    let text_len = text.chars().count();

    let num_windows = config.num_windows(chars.len());
    if scores.len() < num_windows {
        log::debug!(
            "{} scores for {} windows, output truncated",
            scores.len(),
            num_windows
        );
    }

    let mut output = String::new();
    for scored in scored_windows(&chars, scores, config) {
        if config
            .subject_position(scored.window.start(), text_len)
            .is_none()
        {
            continue;
        }
        output.push(scored.window.subject());
        if scored.is_boundary() {
            output.push(BOUNDARY_MARK);
        }
    }
    output
}

/// A segment of reconstructed text and its part-of-speech tag, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedSegment {
    pub text: String,
    pub tag: Option<String>,
}

impl fmt::Display for AnnotatedSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}/{}", self.text, tag),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Splits reconstructed text on boundary marks and tags each segment by
/// its ordinal and text.
pub fn annotate(reconstructed: &str, lexicon: &PosLexicon) -> Vec<AnnotatedSegment> {
    reconstructed
        .split(BOUNDARY_MARK)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(ordinal, segment)| AnnotatedSegment {
            text: segment.to_string(),
            tag: lexicon.get(ordinal, segment).map(str::to_string),
        })
        .collect()
}
