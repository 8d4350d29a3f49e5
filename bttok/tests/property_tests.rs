//! Property-based tests for indexing, windowing and reconstruction.
//!
//! - Ids: an index maps its keys onto exactly `0..len`
//! - Windows: a text of `n` characters yields `n - width + 1` windows
//! - Vectors: every id comes from the index and no window emits more ids than its width
//! - Reconstruction: low scores reproduce the subjects, high scores mark each one

use std::collections::HashSet;

use bttok::index::{CharKey, FeatureIndex, IndexBuilder, TokenKey};
use bttok::predictor::{reconstruct, BOUNDARY_MARK};
use bttok::vectorizer::vectorize;
use bttok::window::{Padding, WindowConfig};
use proptest::prelude::*;

// =============================================================================
// Test Generators
// =============================================================================

/// Short texts over a small alphabet, so that keys repeat across windows.
fn review_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("[あいうえおかきくけこ映画苦手]{0,40}").unwrap()
}

/// A valid window shape: width in 1..=12 and an offset inside it.
fn window_config() -> impl Strategy<Value = WindowConfig> {
    (1usize..=12)
        .prop_flat_map(|width| (Just(width), 0..width))
        .prop_map(|(width, offset)| WindowConfig::new(width, offset).unwrap())
}

fn char_keys() -> impl Strategy<Value = Vec<CharKey>> {
    prop::collection::vec((0usize..10, prop::char::range('a', 'z')), 0..60)
        .prop_map(|pairs| pairs.into_iter().map(|(o, c)| CharKey::new(o, c)).collect())
}

/// Subjects of every window of `text`, in order.
fn subjects(text: &str, config: &WindowConfig) -> Vec<char> {
    let chars = config.prepare(text);
    config.windows(&chars).map(|w| w.subject()).collect()
}

// =============================================================================
// FeatureIndex
// =============================================================================

proptest! {
    #[test]
    fn index_ids_are_dense(keys in char_keys()) {
        let index = FeatureIndex::from_keys(keys.clone());
        let distinct: HashSet<CharKey> = keys.into_iter().collect();
        prop_assert_eq!(index.len(), distinct.len());

        let mut ids: Vec<u32> = index.entries().into_iter().map(|(_, id)| id).collect();
        ids.sort_unstable();
        let expected: Vec<u32> = (0..distinct.len() as u32).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn index_ignores_insertion_order(keys in char_keys()) {
        let forward = FeatureIndex::from_keys(keys.clone());
        let backward = FeatureIndex::from_keys(keys.iter().rev().copied());
        for key in &keys {
            prop_assert_eq!(forward.get(key), backward.get(key));
        }
    }

    #[test]
    fn token_index_survives_json(
        tokens in prop::collection::vec((0usize..9, "[a-z:]{1,6}"), 1..30),
    ) {
        let mut builder = IndexBuilder::new();
        builder.extend(tokens.iter().map(|(p, t)| TokenKey::new(*p, t.as_str())));
        let index = builder.finish();

        let mut buf = Vec::new();
        index.write_json(&mut buf).unwrap();
        let loaded = FeatureIndex::<TokenKey>::read_json(buf.as_slice()).unwrap();
        prop_assert_eq!(loaded.entries(), index.entries());
    }
}

// =============================================================================
// Windows and vectors
// =============================================================================

proptest! {
    #[test]
    fn window_count_matches_length(text in review_text(), config in window_config()) {
        let len = text.chars().count();
        let vectors = vectorize(&text, &FeatureIndex::default(), &config);
        let expected = if len >= config.width() { len - config.width() + 1 } else { 0 };
        prop_assert_eq!(vectors.len(), expected);
    }

    #[test]
    fn vectors_only_use_known_ids(
        text in review_text(),
        config in window_config(),
        corpus in review_text(),
    ) {
        let index = FeatureIndex::from_keys(
            corpus.chars().enumerate().map(|(i, c)| CharKey::new(i % config.width(), c)),
        );
        for vector in vectorize(&text, &index, &config) {
            prop_assert!(vector.len() <= config.width());
            for id in vector.ids() {
                prop_assert!((id as usize) < index.len());
            }
        }
    }

    #[test]
    fn padding_adds_windows(
        text in review_text(),
        config in window_config(),
        left in 0usize..4,
        right in 0usize..4,
    ) {
        let padded = config.clone().with_padding(Padding::repeat('*', left, right));
        let len = text.chars().count() + left + right;
        let expected = (len + 1).saturating_sub(config.width());
        prop_assert_eq!(vectorize(&text, &FeatureIndex::default(), &padded).len(), expected);
    }
}

// =============================================================================
// Reconstruction
// =============================================================================

proptest! {
    #[test]
    fn low_scores_insert_no_marks(text in review_text(), config in window_config()) {
        let n = config.num_windows(text.chars().count());
        let output = reconstruct(&text, &vec![0.5; n], &config);
        prop_assert!(!output.contains(BOUNDARY_MARK));
        prop_assert_eq!(output.chars().collect::<Vec<_>>(), subjects(&text, &config));
    }

    #[test]
    fn high_scores_mark_every_subject(text in review_text(), config in window_config()) {
        let n = config.num_windows(text.chars().count());
        let output = reconstruct(&text, &vec![0.51; n], &config);

        let expected: String = subjects(&text, &config)
            .into_iter()
            .flat_map(|c| [c, BOUNDARY_MARK])
            .collect();
        prop_assert_eq!(output, expected);
    }

    #[test]
    fn marks_follow_scores(
        text in review_text(),
        config in window_config(),
        scores in prop::collection::vec(0.0f64..1.0, 0..40),
    ) {
        let with_scores = reconstruct(&text, &scores, &config);
        let marks = with_scores.chars().filter(|&c| c == BOUNDARY_MARK).count();
        let expected = scores
            .iter()
            .take(config.num_windows(text.chars().count()))
            .filter(|&&s| s > 0.5)
            .count();
        prop_assert_eq!(marks, expected);
    }
}
