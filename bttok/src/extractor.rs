use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::corpus::Reviews;
use crate::errors::{BttokError, Result};
use crate::index::{CharKey, FeatureIndex, IndexBuilder};
use crate::labeled::{labeled_windows, LabeledWindow};
use crate::lexicon::PosLexicon;
use crate::parts::{extract_review, PartsIndexBuilder, PartsRow, PartsVectorizer, PartsWindow};
use crate::predictor::annotate;
use crate::scorer::{read_predictions, Scorer};
use crate::segmenter::Segmenter;
use crate::sparse::RowLabel;
use crate::tagger::Tagger;
use crate::vectorizer::{to_rows, vectorize_sequence};
use crate::window::Padding;

/// Lines between progress messages on dataset passes.
const DATASET_PROGRESS: usize = 100_000;
/// Reviews between progress messages on corpus passes.
const CORPUS_PROGRESS: usize = 10_000;
/// Lines handed to the thread pool at once when rendering sparse rows.
const CHUNK_SIZE: usize = 10_000;

/// Extractor struct for the file-level passes of the pipeline.
/// It reads corpora and raw datasets line by line, writes datasets, indexes
/// and sparse training files, and stops early when `running` is cleared.
pub struct Extractor {
    running: Arc<AtomicBool>,
    pool: ThreadPool,
}

impl Extractor {
    /// Creates a new instance of [`Extractor`].
    ///
    /// # Arguments
    /// * `running` - Cleared to interrupt a pass between two lines.
    /// * `num_threads` - Workers used to render sparse rows; 0 lets rayon decide.
    ///
    /// # Errors
    /// Returns an error if the thread pool cannot be built.
    pub fn new(running: Arc<AtomicBool>, num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        Ok(Extractor { running, pool })
    }

    fn interrupted(&self, what: &str, done: usize) -> bool {
        if self.running.load(Ordering::SeqCst) {
            return false;
        }
        log::warn!("{} interrupted after {} lines", what, done);
        true
    }

    /// Prints every review as space separated characters.
    pub fn char_array<W: Write + ?Sized>(&self, reviews_path: &Path, out: &mut W) -> Result<()> {
        for review in Reviews::open(reviews_path)? {
            writeln!(out, "{}", review?.char_array())?;
        }
        Ok(())
    }

    /// Writes the raw labeled character dataset generated from the wakati
    /// segmentation of every review.
    pub fn make_data<T: Tagger + ?Sized>(
        &self,
        reviews_path: &Path,
        tagger: &mut T,
        dataset_path: &Path,
    ) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(dataset_path)?);
        let mut num_windows = 0;

        for (i, review) in Reviews::open(reviews_path)?.enumerate() {
            if self.interrupted("make-data", i) {
                break;
            }
            if i % CORPUS_PROGRESS == 0 {
                log::info!("now iter {}: {} windows written", i, num_windows);
            }
            let terms = tagger.wakati(&review?.review)?;
            for window in labeled_windows(&terms) {
                writeln!(writer, "{}", window)?;
                num_windows += 1;
            }
        }

        writer.flush()?;
        Ok(num_windows)
    }

    /// Builds the character index of a raw labeled dataset in one streaming
    /// pass.
    pub fn make_index(&self, dataset_path: &Path) -> Result<FeatureIndex<CharKey>> {
        let reader = BufReader::new(File::open(dataset_path)?);
        let mut builder = IndexBuilder::new();

        for (i, line) in reader.lines().enumerate() {
            if self.interrupted("make-index", i) {
                break;
            }
            let line = line?;
            if i % DATASET_PROGRESS == 0 {
                log::info!("now iter {} {:?}: {} keys", i, line, builder.len());
            }
            let window = LabeledWindow::parse(&line);
            builder.extend(
                window
                    .chars()
                    .into_iter()
                    .enumerate()
                    .map(|(offset, ch)| CharKey::new(offset, ch)),
            );
        }

        log::info!("{} distinct keys", builder.len());
        Ok(builder.finish())
    }

    /// Writes one binary training row per raw dataset line. Blank lines are
    /// skipped.
    pub fn make_sparse(
        &self,
        dataset_path: &Path,
        index: &FeatureIndex<CharKey>,
        sparse_path: &Path,
    ) -> Result<usize> {
        self.render_chunks(dataset_path, sparse_path, |_, line| {
            let window = LabeledWindow::parse(line);
            let label = RowLabel::Binary(window.boundary);
            Ok(vectorize_sequence(&window.chars(), index).to_row(label))
        })
    }

    /// Writes the raw part-of-speech dataset of every review.
    pub fn make_parts_data<T: Tagger + ?Sized>(
        &self,
        reviews_path: &Path,
        tagger: &mut T,
        window: &PartsWindow,
        padding: &Padding,
        dataset_path: &Path,
    ) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(dataset_path)?);
        let mut num_rows = 0;

        for (i, review) in Reviews::open(reviews_path)?.enumerate() {
            if self.interrupted("make-parts-data", i) {
                break;
            }
            if i % CORPUS_PROGRESS == 0 {
                log::info!("now iter {}: {} rows written", i, num_rows);
            }
            for row in extract_review(tagger, &review?.review, window, padding)? {
                writeln!(writer, "{}", row)?;
                num_rows += 1;
            }
        }

        writer.flush()?;
        Ok(num_rows)
    }

    /// Builds the (position, term) and tag indexes of a raw parts dataset.
    pub fn make_parts_index(
        &self,
        dataset_path: &Path,
        window: &PartsWindow,
    ) -> Result<PartsVectorizer> {
        let reader = BufReader::new(File::open(dataset_path)?);
        let mut builder = PartsIndexBuilder::new();

        for (i, line) in reader.lines().enumerate() {
            if self.interrupted("make-parts-index", i) {
                break;
            }
            let line = line?;
            if i % DATASET_PROGRESS == 0 {
                log::info!("now iter {} {:?}: {} terms", i, line, builder.num_terms());
            }
            if line.trim().is_empty() {
                continue;
            }
            builder.add(&parse_parts_row(&line, window, i + 1)?);
        }

        Ok(builder.finish())
    }

    /// Writes one multiclass training row per raw parts dataset line.
    pub fn make_parts_sparse(
        &self,
        dataset_path: &Path,
        vectorizer: &PartsVectorizer,
        window: &PartsWindow,
        sparse_path: &Path,
    ) -> Result<usize> {
        self.render_chunks(dataset_path, sparse_path, |line_no, line| {
            let row = parse_parts_row(line, window, line_no)?;
            vectorizer.to_row(&row).ok_or_else(|| {
                let msg = format!("unknown tag {:?}", row.tag);
                BttokError::invalid_format("parts row", line_no, msg)
            })
        })
    }

    /// Reads `input` in chunks, renders every non-blank line with `render`
    /// on the thread pool and writes the results in input order.
    fn render_chunks<F>(&self, input: &Path, output: &Path, render: F) -> Result<usize>
    where
        F: Fn(usize, &str) -> Result<String> + Sync,
    {
        let reader = BufReader::new(File::open(input)?);
        let mut writer = BufWriter::new(File::create(output)?);
        let mut chunk: Vec<(usize, String)> = Vec::with_capacity(CHUNK_SIZE);
        let mut num_rows = 0;

        let mut lines = reader.lines().enumerate();
        loop {
            let done = match lines.next() {
                Some((i, line)) => {
                    if self.interrupted("sparse rendering", i) {
                        break;
                    }
                    let line = line?;
                    if i % DATASET_PROGRESS == 0 {
                        log::info!("vectorizing now iter {} {:?}", i, line);
                    }
                    if !line.trim().is_empty() {
                        chunk.push((i + 1, line));
                    }
                    if chunk.len() < CHUNK_SIZE {
                        continue;
                    }
                    false
                }
                None => true,
            };

            let rows: Vec<String> = self.pool.install(|| {
                chunk
                    .par_iter()
                    .map(|(line_no, line)| render(*line_no, line))
                    .collect::<Result<Vec<String>>>()
            })?;
            for row in &rows {
                writeln!(writer, "{}", row)?;
            }
            num_rows += rows.len();
            chunk.clear();

            if done {
                break;
            }
        }

        // Flush whatever was read before an interruption.
        if !chunk.is_empty() {
            for (line_no, line) in &chunk {
                writeln!(writer, "{}", render(*line_no, line)?)?;
            }
            num_rows += chunk.len();
        }

        writer.flush()?;
        Ok(num_rows)
    }

    /// Records the coarse tag of every (ordinal, surface) in the corpus.
    pub fn make_lexicon<T: Tagger + ?Sized>(
        &self,
        reviews_path: &Path,
        tagger: &mut T,
    ) -> Result<PosLexicon> {
        let mut lexicon = PosLexicon::new();
        for (i, review) in Reviews::open(reviews_path)?.enumerate() {
            if self.interrupted("make-lexicon", i) {
                break;
            }
            if i % CORPUS_PROGRESS == 0 {
                log::info!("now iter {}: {} entries", i, lexicon.len());
            }
            lexicon.add_sentence(&tagger.tag(&review?.review)?);
        }
        Ok(lexicon)
    }

    /// Segments every review, printing one line per review and, with a
    /// lexicon, a second line of `segment/TAG` pairs.
    ///
    /// The scorer rows of each review are kept as `<data_dir>/<title>.data`
    /// next to the raw text in `<data_dir>/<title>.orig`.
    pub fn predict<S: Scorer, W: Write + ?Sized>(
        &self,
        reviews_path: &Path,
        segmenter: &mut Segmenter<S>,
        data_dir: &Path,
        lexicon: Option<&PosLexicon>,
        out: &mut W,
    ) -> Result<()> {
        fs::create_dir_all(data_dir)?;

        for (i, review) in Reviews::open(reviews_path)?.enumerate() {
            if self.interrupted("predict", i) {
                break;
            }
            if i % CORPUS_PROGRESS == 0 {
                log::info!("now iter {}", i);
            }
            let review = review?;
            let stem = review.file_stem();

            let vectors = segmenter.vectorize(&review.review);
            let mut data = BufWriter::new(File::create(data_dir.join(format!("{}.data", stem)))?);
            for row in to_rows(&vectors) {
                writeln!(data, "{}", row)?;
            }
            data.flush()?;
            fs::write(data_dir.join(format!("{}.orig", stem)), &review.review)?;

            let segmented = segmenter.segment_vectors(&review.review, &vectors)?;
            writeln!(out, "{}", segmented)?;
            if let Some(lexicon) = lexicon {
                let tagged: Vec<String> = annotate(&segmented, lexicon)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                writeln!(out, "{}", tagged.join(" "))?;
            }
        }
        Ok(())
    }
}

/// Prints each prediction next to the row it was made for.
pub fn check<W: Write + ?Sized>(
    predictions_path: &Path,
    rows_path: &Path,
    out: &mut W,
) -> Result<()> {
    let probs = read_predictions(predictions_path)?;
    let rows = BufReader::new(File::open(rows_path)?).lines();
    for (prob, row) in probs.iter().zip(rows) {
        writeln!(out, "{} {}", prob, row?.trim())?;
    }
    Ok(())
}

fn parse_parts_row(line: &str, window: &PartsWindow, line_no: usize) -> Result<PartsRow> {
    PartsRow::parse(line, window.head_len).ok_or_else(|| {
        BttokError::invalid_format("parts row", line_no, format!("too few fields: {:?}", line))
    })
}

/// Runs `f` against a buffered writer for `path`, or for stdout when
/// `path` is `None`.
pub fn with_output<F>(path: Option<&Path>, f: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            f(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            f(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use tempfile::{tempdir, NamedTempFile};

    use crate::sparse::SparseVector;
    use crate::tagger::TaggedToken;
    use crate::window::WindowConfig;

    struct SpaceTagger;

    impl Tagger for SpaceTagger {
        fn wakati(&mut self, text: &str) -> Result<Vec<String>> {
            Ok(text.split_whitespace().map(str::to_string).collect())
        }

        fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>> {
            Ok(text
                .split_whitespace()
                .map(|t| TaggedToken::new(t, if t.len() > 1 { "名詞-一般" } else { "助詞" }))
                .collect())
        }
    }

    fn extractor() -> Extractor {
        Extractor::new(Arc::new(AtomicBool::new(true)), 2).unwrap()
    }

    fn write_file(lines: &[&str]) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        file.as_file().sync_all()?;
        Ok(file)
    }

    fn read_file(path: &Path) -> Result<String> {
        let mut output = String::new();
        File::open(path)?.read_to_string(&mut output)?;
        Ok(output)
    }

    #[test]
    fn test_char_index_and_sparse() -> Result<()> {
        let dataset = write_file(&["ab x cd", "", "ba o dc"])?;
        let extractor = extractor();

        let index = extractor.make_index(dataset.path())?;
        // (0,a) (0,b) (1,a) (1,b) (2,c) (2,d) (3,c) (3,d)
        assert_eq!(index.len(), 8);
        assert_eq!(index.get(&CharKey::new(0, 'a')), Some(0));
        assert_eq!(index.get(&CharKey::new(3, 'd')), Some(7));

        let sparse = NamedTempFile::new()?;
        assert_eq!(extractor.make_sparse(dataset.path(), &index, sparse.path())?, 2);
        assert_eq!(
            read_file(sparse.path())?,
            "0.00 0:1.0 3:1.0 4:1.0 7:1.0\n1.00 1:1.0 2:1.0 5:1.0 6:1.0\n"
        );
        Ok(())
    }

    #[test]
    fn test_make_sparse_preserves_order_across_chunks() -> Result<()> {
        let lines: Vec<String> = (0..CHUNK_SIZE + 5)
            .map(|i| if i % 2 == 0 { "ab x cd".to_string() } else { "ab o cd".to_string() })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let dataset = write_file(&refs)?;
        let extractor = extractor();
        let index = extractor.make_index(dataset.path())?;

        let sparse = NamedTempFile::new()?;
        assert_eq!(extractor.make_sparse(dataset.path(), &index, sparse.path())?, CHUNK_SIZE + 5);
        let output = read_file(sparse.path())?;
        for (i, row) in output.lines().enumerate() {
            let expected = if i % 2 == 0 { "0.00" } else { "1.00" };
            assert!(row.starts_with(expected), "row {} is {:?}", i, row);
        }
        Ok(())
    }

    #[test]
    fn test_interrupted_index_is_empty() -> Result<()> {
        let dataset = write_file(&["ab x cd"])?;
        let extractor = Extractor::new(Arc::new(AtomicBool::new(false)), 1)?;
        assert!(extractor.make_index(dataset.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_make_data() -> Result<()> {
        let reviews = write_file(&[
            r#"{"title": "t", "review": "abc de fgh ij klm no"}"#,
            r#"{"title": "u", "review": "short"}"#,
        ])?;
        let dataset = NamedTempFile::new()?;
        let written = extractor().make_data(reviews.path(), &mut SpaceTagger, dataset.path())?;
        assert_eq!(written, 3);
        assert_eq!(read_file(dataset.path())?, "defg x hijk\nefgh o ijkl\nfghi x jklm\n");
        Ok(())
    }

    #[test]
    fn test_parts_pipeline() -> Result<()> {
        let reviews = write_file(&[r#"{"title": "t", "review": "aa b cc d ee f gg h ii j kk"}"#])?;
        let window = PartsWindow::default();
        let padding = Padding {
            left: String::new(),
            right: String::new(),
        };
        let extractor = extractor();

        let dataset = NamedTempFile::new()?;
        let rows = extractor.make_parts_data(
            reviews.path(),
            &mut SpaceTagger,
            &window,
            &padding,
            dataset.path(),
        )?;
        assert_eq!(rows, 1);
        assert_eq!(read_file(dataset.path())?, "aa b cc d ee gg h ii j 名詞-一般\n");
        Ok(())
    }

    #[test]
    fn test_parts_index_and_sparse() -> Result<()> {
        let dataset = write_file(&["a b c d e g h i j 名詞-一般", "b c d e f h i j k 助詞"])?;
        let window = PartsWindow::default();
        let extractor = extractor();

        let vectorizer = extractor.make_parts_index(dataset.path(), &window)?;
        assert_eq!(vectorizer.tags.len(), 2);
        assert_eq!(vectorizer.terms.len(), 18);

        let sparse = NamedTempFile::new()?;
        assert_eq!(
            extractor.make_parts_sparse(dataset.path(), &vectorizer, &window, sparse.path())?,
            2
        );
        let output = read_file(sparse.path())?;
        let labels: Vec<&str> = output.lines().map(|l| l.split(' ').next().unwrap()).collect();
        assert_eq!(labels, vec!["1", "0"]);
        assert!(output.lines().all(|l| l.split(' ').count() == 10));
        Ok(())
    }

    #[test]
    fn test_parts_sparse_rejects_short_rows() -> Result<()> {
        let good = write_file(&["a b c d e g h i j 名詞"])?;
        let bad = write_file(&["a b c d e g h i j 名詞", "a 名詞"])?;
        let window = PartsWindow::default();
        let extractor = extractor();
        let vectorizer = extractor.make_parts_index(good.path(), &window)?;

        let sparse = NamedTempFile::new()?;
        let result = extractor.make_parts_sparse(bad.path(), &vectorizer, &window, sparse.path());
        assert!(matches!(result, Err(BttokError::InvalidFormat { line: 2, .. })));
        Ok(())
    }

    #[test]
    fn test_make_lexicon() -> Result<()> {
        let reviews = write_file(&[r#"{"title": "t", "review": "映画 は 苦手"}"#])?;
        let lexicon = extractor().make_lexicon(reviews.path(), &mut SpaceTagger)?;
        assert_eq!(lexicon.get(0, "映画"), Some("名詞"));
        assert_eq!(lexicon.get(1, "は"), Some("助詞"));
        Ok(())
    }

    #[test]
    fn test_predict() -> Result<()> {
        let reviews = write_file(&[r#"{"title": "a/b", "review": "abcdef"}"#])?;
        let data_dir = tempdir()?;
        let index = FeatureIndex::from_keys(vec![CharKey::new(0, 'a')]);
        let mut calls = 0;
        let scorer = |rows: &[SparseVector]| -> Result<Vec<f64>> {
            calls += 1;
            Ok((0..rows.len()).map(|i| if i % 2 == 0 { 0.9 } else { 0.1 }).collect())
        };
        let mut segmenter = Segmenter::new(index, WindowConfig::new(3, 1)?, scorer);
        let mut lexicon = PosLexicon::new();
        lexicon.insert(0, "b", "名詞");

        let mut out = Vec::new();
        extractor().predict(
            reviews.path(),
            &mut segmenter,
            data_dir.path(),
            Some(&lexicon),
            &mut out,
        )?;

        assert_eq!(String::from_utf8_lossy(&out), "b/cd/e\nb/名詞 cd e\n");
        assert_eq!(read_file(&data_dir.path().join("a_b.orig"))?, "abcdef");
        assert_eq!(
            read_file(&data_dir.path().join("a_b.data"))?,
            "0.5 0:1.0\n0.5\n0.5\n0.5\n"
        );
        drop(segmenter);
        assert_eq!(calls, 1);
        Ok(())
    }

    #[test]
    fn test_check() -> Result<()> {
        let predictions = write_file(&["0.25", "0.75"])?;
        let rows = write_file(&["0.5 1:1.0", "0.5 2:1.0", "0.5 3:1.0"])?;
        let mut out = Vec::new();
        check(predictions.path(), rows.path(), &mut out)?;
        assert_eq!(String::from_utf8_lossy(&out), "0.25 0.5 1:1.0\n0.75 0.5 2:1.0\n");
        Ok(())
    }

    #[test]
    fn test_char_array() -> Result<()> {
        let reviews = write_file(&[r#"{"title": "t", "review": "映画だ"}"#])?;
        let mut out = Vec::new();
        extractor().char_array(reviews.path(), &mut out)?;
        assert_eq!(String::from_utf8_lossy(&out), "映 画 だ\n");
        Ok(())
    }
}
