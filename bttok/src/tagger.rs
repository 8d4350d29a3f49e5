use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::errors::{BttokError, Result};

/// A surface token and its part-of-speech string as reported by the tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub surface: String,
    pub pos: String,
}

impl TaggedToken {
    pub fn new<S: Into<String>, P: Into<String>>(surface: S, pos: P) -> Self {
        TaggedToken {
            surface: surface.into(),
            pos: pos.into(),
        }
    }

    /// The top level of a hyphenated POS string, e.g. `名詞` for `名詞-一般`.
    pub fn coarse_pos(&self) -> &str {
        self.pos.split('-').next().unwrap_or(&self.pos)
    }
}

/// A morphological analyzer.
pub trait Tagger {
    /// Splits `text` into surface tokens.
    fn wakati(&mut self, text: &str) -> Result<Vec<String>>;

    /// Splits `text` into surface tokens with their parts of speech.
    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>>;
}

/// Runs the `mecab` binary once per call.
#[derive(Debug, Clone)]
pub struct MecabTagger {
    program: String,
    args: Vec<String>,
}

impl Default for MecabTagger {
    fn default() -> Self {
        Self::new("mecab")
    }
}

impl MecabTagger {
    pub fn new<S: Into<String>>(program: S) -> Self {
        MecabTagger {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments passed on every invocation, such as `-d <dicdir>`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn run(&self, format: &str, text: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg(format)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "tagger stdin unavailable"))?;
        let input = format!("{}\n", text);
        // Feed stdin from another thread so a large output cannot fill the
        // pipe while we are still writing.
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "tagger stdin writer panicked"))?;

        // A tagger that fails before reading all of stdin also breaks the
        // pipe; the exit status is the error to report.
        if !output.status.success() {
            return Err(BttokError::ExternalProcess {
                program: self.program.clone(),
                status: output.status,
            });
        }
        written?;
        String::from_utf8(output.stdout)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }
}

impl Tagger for MecabTagger {
    fn wakati(&mut self, text: &str) -> Result<Vec<String>> {
        Ok(parse_wakati(&self.run("-Owakati", text)?))
    }

    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>> {
        parse_chasen(&self.run("-Ochasen", text)?)
    }
}

/// Parses space separated wakati output.
pub fn parse_wakati(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Parses ChaSen-format output: tab separated lines with the surface in
/// field 0 and the part of speech in field 3, one `EOS` per sentence.
pub fn parse_chasen(output: &str) -> Result<Vec<TaggedToken>> {
    let mut tokens = Vec::new();
    for (i, line) in output.lines().enumerate() {
        if line.is_empty() || line == "EOS" {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match (fields.first(), fields.get(3)) {
            (Some(surface), Some(pos)) => tokens.push(TaggedToken::new(*surface, *pos)),
            _ => {
                return Err(BttokError::invalid_format(
                    "chasen output",
                    i + 1,
                    format!("expected at least 4 fields: {:?}", line),
                ))
            }
        }
    }
    Ok(tokens)
}
