use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::{BttokError, Result};
use crate::sparse::{write_rows, RowLabel, SparseVector};

/// Assigns a boundary probability to every window vector, in order.
pub trait Scorer {
    fn score(&mut self, rows: &[SparseVector]) -> Result<Vec<f64>>;
}

impl<F> Scorer for F
where
    F: FnMut(&[SparseVector]) -> Result<Vec<f64>>,
{
    fn score(&mut self, rows: &[SparseVector]) -> Result<Vec<f64>> {
        self(rows)
    }
}

/// Scores rows with the LightGBM command line predictor.
///
/// Rows are written to `data_path`, the predictor is run as
/// `<program> config=<config> data=<data_path> output_result=<output_path>`
/// and one probability per line is read back from `output_path`. The call
/// blocks until the predictor exits.
#[derive(Debug, Clone)]
pub struct LightGbmScorer {
    program: String,
    config: PathBuf,
    data_path: PathBuf,
    output_path: PathBuf,
}

impl LightGbmScorer {
    pub fn new<S: Into<String>>(
        program: S,
        config: &Path,
        data_path: &Path,
        output_path: &Path,
    ) -> Self {
        LightGbmScorer {
            program: program.into(),
            config: config.to_path_buf(),
            data_path: data_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
        }
    }
}

impl Scorer for LightGbmScorer {
    fn score(&mut self, rows: &[SparseVector]) -> Result<Vec<f64>> {
        let mut writer = BufWriter::new(File::create(&self.data_path)?);
        write_rows(&mut writer, RowLabel::Placeholder, rows)?;
        writer.flush()?;
        drop(writer);

        let status = Command::new(&self.program)
            .arg(format!("config={}", self.config.display()))
            .arg(format!("data={}", self.data_path.display()))
            .arg(format!("output_result={}", self.output_path.display()))
            .status()?;
        if !status.success() {
            return Err(BttokError::ExternalProcess {
                program: self.program.clone(),
                status,
            });
        }

        read_predictions(&self.output_path)
    }
}

/// Reads one probability per line. Blank lines are skipped.
pub fn read_predictions(path: &Path) -> Result<Vec<f64>> {
    parse_predictions(BufReader::new(File::open(path)?))
}

pub fn parse_predictions<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut probs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let prob = line.parse().map_err(|e| {
            BttokError::invalid_format("prediction", i + 1, format!("{}: {:?}", e, line))
        })?;
        probs.push(prob);
    }
    Ok(probs)
}
