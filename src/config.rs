use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Index configuration for a [`crate::SearchManager`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory for persisted generations; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    /// Tokenizer configuration shared by all language trackers
    pub tokenizer: TokenizerConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

impl IndexConfig {
    /// Persist index generations under the given directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Use a custom tokenizer configuration
    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

/// Tokenizer configuration
///
/// Stemmer and stopword list are selected per language tracker from its
/// language code; these knobs control the shared analysis behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: true,
            stem: true,
            min_token_length: 2,
            max_token_length: 50,
        }
    }
}
