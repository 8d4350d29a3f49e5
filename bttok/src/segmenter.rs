use crate::errors::Result;
use crate::index::{CharKey, FeatureIndex};
use crate::lexicon::PosLexicon;
use crate::predictor::{annotate, reconstruct, AnnotatedSegment, BOUNDARY_MARK};
use crate::scorer::Scorer;
use crate::sparse::SparseVector;
use crate::vectorizer::vectorize;
use crate::window::WindowConfig;

/// Segmenter struct for boundary prediction with an external scorer.
/// It vectorizes every window of a sentence, asks the scorer for boundary
/// probabilities and rebuilds the sentence with `/` at predicted boundaries.
pub struct Segmenter<S: Scorer> {
    index: FeatureIndex<CharKey>,
    config: WindowConfig,
    pub scorer: S,
}

impl<S: Scorer> Segmenter<S> {
    /// Creates a new instance of [`Segmenter`].
    ///
    /// # Arguments
    /// * `index` - The character feature index the scorer's model was trained on.
    /// * `config` - The window configuration used when building the training rows.
    /// * `scorer` - Anything that turns sparse rows into boundary probabilities.
    ///
    /// # Example
    /// ```
    /// use bttok::index::{CharKey, FeatureIndex};
    /// use bttok::segmenter::Segmenter;
    /// use bttok::sparse::SparseVector;
    /// use bttok::window::WindowConfig;
    ///
    /// let index = FeatureIndex::from_keys(vec![CharKey::new(0, 'a')]);
    /// let config = WindowConfig::new(3, 1).unwrap();
    /// let scorer = |rows: &[SparseVector]| -> bttok::Result<Vec<f64>> {
    ///     Ok(vec![0.9; rows.len()])
    /// };
    ///
    /// let mut segmenter = Segmenter::new(index, config, scorer);
    /// assert_eq!(segmenter.segment("abcd").unwrap(), "b/c/");
    /// ```
    pub fn new(index: FeatureIndex<CharKey>, config: WindowConfig, scorer: S) -> Self {
        Segmenter {
            index,
            config,
            scorer,
        }
    }

    pub fn index(&self) -> &FeatureIndex<CharKey> {
        &self.index
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// One sparse vector per window of `sentence`.
    pub fn vectorize(&self, sentence: &str) -> Vec<SparseVector> {
        vectorize(sentence, &self.index, &self.config)
    }

    /// Scores `sentence` and returns it with `/` after every subject
    /// predicted to end a word.
    ///
    /// The scorer is not called for sentences without a full window.
    pub fn segment(&mut self, sentence: &str) -> Result<String> {
        let vectors = self.vectorize(sentence);
        self.segment_vectors(sentence, &vectors)
    }

    /// Like [`Segmenter::segment`], reusing `vectors` previously returned by
    /// [`Segmenter::vectorize`] for the same `sentence`.
    ///
    /// # Arguments
    /// * `sentence` - The text the vectors were built from.
    /// * `vectors` - One sparse vector per window of `sentence`.
    ///
    /// # Returns
    /// The sentence with `/` after every predicted word end.
    pub fn segment_vectors(&mut self, sentence: &str, vectors: &[SparseVector]) -> Result<String> {
        if vectors.is_empty() {
            return Ok(String::new());
        }
        let scores = self.scorer.score(vectors)?;
        Ok(reconstruct(sentence, &scores, &self.config))
    }

    /// Segments `sentence` into words.
    pub fn segment_words(&mut self, sentence: &str) -> Result<Vec<String>> {
        Ok(self
            .segment(sentence)?
            .split(BOUNDARY_MARK)
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Segments `sentence` and tags each segment from `lexicon`.
    pub fn segment_and_tag(
        &mut self,
        sentence: &str,
        lexicon: &PosLexicon,
    ) -> Result<Vec<AnnotatedSegment>> {
        Ok(annotate(&self.segment(sentence)?, lexicon))
    }
}
