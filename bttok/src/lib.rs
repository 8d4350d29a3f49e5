pub mod charvec;
pub mod corpus;
pub mod errors;
pub mod export;
pub mod extractor;
pub mod index;
pub mod labeled;
pub mod lexicon;
pub mod parts;
pub mod predictor;
pub mod scorer;
pub mod segmenter;
pub mod sparse;
pub mod tagger;
pub mod vectorizer;
pub mod window;

pub use errors::{BttokError, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}
