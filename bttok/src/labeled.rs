use std::fmt;

/// Separator of a window whose subject is followed by a word boundary.
pub const BOUNDARY_MARKER: &str = " o ";
/// Separator of a window whose subject continues the current word.
pub const INNER_MARKER: &str = " x ";

/// Joins wakati terms before windowing; marks the boundaries.
const JOINER: char = '_';
/// Characters of joined text on each side of the examined position.
const SPAN: usize = 8;

/// One line of the raw labeled dataset.
///
/// `head` ends with the subject character for non-boundary windows; for
/// boundary windows the boundary lies between `head` and `tail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledWindow {
    pub boundary: bool,
    pub head: String,
    pub tail: String,
}

impl LabeledWindow {
    /// Parses a raw dataset line.
    ///
    /// A line is a non-boundary window when it contains ` x `. Every other
    /// line counts as a boundary window. All markers are removed from the
    /// text.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let boundary = !line.contains(INNER_MARKER);
        let (head, tail) = line
            .split_once(INNER_MARKER)
            .or_else(|| line.split_once(BOUNDARY_MARKER))
            .unwrap_or((line, ""));

        LabeledWindow {
            boundary,
            head: strip_markers(head),
            tail: strip_markers(tail),
        }
    }

    /// The window characters with the marker removed.
    pub fn chars(&self) -> Vec<char> {
        self.head.chars().chain(self.tail.chars()).collect()
    }
}

impl fmt::Display for LabeledWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.boundary {
            BOUNDARY_MARKER
        } else {
            INNER_MARKER
        };
        write!(f, "{}{}{}", self.head, marker, self.tail)
    }
}

fn strip_markers(s: &str) -> String {
    s.replace(INNER_MARKER, "").replace(BOUNDARY_MARKER, "")
}

/// Generates labeled windows from the wakati segmentation of one text.
///
/// The terms are joined with `_` and every position with a full span of
/// eight characters on both sides is examined. A `_` position yields a
/// boundary window (four characters before, four after). A character
/// position yields a non-boundary window ending the head with that
/// character, unless the next character is `_`: that case is covered by the
/// boundary window of the following position. Windows that would have an
/// empty side are skipped.
pub fn labeled_windows<S: AsRef<str>>(terms: &[S]) -> Vec<LabeledWindow> {
    let mut joined: Vec<char> = Vec::new();
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            joined.push(JOINER);
        }
        joined.extend(term.as_ref().chars());
    }

    let mut windows = Vec::new();
    for i in 0..joined.len().saturating_sub(2 * SPAN) {
        let head = &joined[i..i + SPAN];
        let target = joined[i + SPAN];
        let tail = &joined[i + SPAN..i + 2 * SPAN];

        if target != JOINER && tail[1] == JOINER {
            continue;
        }

        let head_chars: Vec<char> = head.iter().copied().filter(|&c| c != JOINER).collect();
        let tail_chars: Vec<char> = tail.iter().copied().filter(|&c| c != JOINER).collect();

        let window = if target == JOINER {
            LabeledWindow {
                boundary: true,
                head: last_n(&head_chars, 4),
                tail: tail_chars.iter().take(4).collect(),
            }
        } else {
            // tail_chars[0] is the target itself.
            let tail2: Vec<char> = tail_chars.iter().take(5).copied().collect();
            LabeledWindow {
                boundary: false,
                head: last_n(&head_chars, 3) + &tail2[0].to_string(),
                tail: tail2[1..].iter().collect(),
            }
        };

        if window.head.is_empty() || window.tail.is_empty() {
            continue;
        }
        windows.push(window);
    }
    windows
}

fn last_n(chars: &[char], n: usize) -> String {
    chars[chars.len().saturating_sub(n)..].iter().collect()
}
