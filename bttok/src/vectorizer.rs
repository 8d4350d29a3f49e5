use crate::index::{CharKey, FeatureIndex};
use crate::sparse::{RowLabel, SparseVector};
use crate::window::{Window, WindowConfig};

/// Looks up every `(offset, char)` of `chars` in `index`, skipping keys the
/// index has never seen.
pub fn vectorize_sequence(chars: &[char], index: &FeatureIndex<CharKey>) -> SparseVector {
    chars
        .iter()
        .enumerate()
        .filter_map(|(offset, &ch)| index.get(&CharKey::new(offset, ch)))
        .collect()
}

pub fn vectorize_window(window: &Window<'_>, index: &FeatureIndex<CharKey>) -> SparseVector {
    vectorize_sequence(window.chars(), index)
}

/// Produces one sparse vector per window of `text`.
///
/// Padding from `config` is applied first. Text shorter than the window
/// width yields no vectors.
pub fn vectorize(
    text: &str,
    index: &FeatureIndex<CharKey>,
    config: &WindowConfig,
) -> Vec<SparseVector> {
    let chars = config.prepare(text);
    config
        .windows(&chars)
        .map(|window| vectorize_window(&window, index))
        .collect()
}

/// Renders vectors as scorer input rows with a placeholder label.
pub fn to_rows(vectors: &[SparseVector]) -> Vec<String> {
    vectors
        .iter()
        .map(|vector| vector.to_row(RowLabel::Placeholder))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::window::Padding;

    fn ab_index() -> FeatureIndex<CharKey> {
        FeatureIndex::from_keys(vec![CharKey::new(0, 'a'), CharKey::new(1, 'b')])
    }

    #[test]
    fn test_vectorize_all_present() {
        let config = WindowConfig::new(2, 0).unwrap();
        let vectors = vectorize("ab", &ab_index(), &config);
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].entries(), &[(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn test_vectorize_missing_key_is_omitted() {
        let config = WindowConfig::new(2, 0).unwrap();
        let vectors = vectorize("ax", &ab_index(), &config);
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].ids().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_vectorize_counts_windows() {
        let config = WindowConfig::new(3, 1).unwrap();
        assert_eq!(vectorize("abcdef", &ab_index(), &config).len(), 4);
        assert!(vectorize("ab", &ab_index(), &config).is_empty());
        assert!(vectorize("", &ab_index(), &config).is_empty());
    }

    #[test]
    fn test_vectorize_with_padding() {
        let index = FeatureIndex::from_keys(vec![CharKey::new(0, '*'), CharKey::new(1, 'a')]);
        let config = WindowConfig::new(2, 1)
            .unwrap()
            .with_padding(Padding::repeat('*', 1, 0));
        let vectors = vectorize("a", &index, &config);
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_to_rows() {
        let config = WindowConfig::new(2, 0).unwrap();
        let rows = to_rows(&vectorize("abx", &ab_index(), &config));
        assert_eq!(rows, vec!["0.5 0:1.0 1:1.0".to_string(), "0.5".to_string()]);
    }
}
