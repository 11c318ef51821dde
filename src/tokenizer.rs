use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use stop_words::{get, LANGUAGE};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;
use crate::models::LanguageCode;

/// Text tokenizer with per-language stemming and stopword removal
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

/// Map a language code to its stemmer algorithm and stopword list.
/// Unknown codes fall back to English analysis.
fn language_profile(code: &LanguageCode) -> (Algorithm, LANGUAGE) {
    match code.as_str() {
        "fr" | "fre" | "fra" => (Algorithm::French, LANGUAGE::French),
        "de" | "ger" | "deu" => (Algorithm::German, LANGUAGE::German),
        "es" | "spa" => (Algorithm::Spanish, LANGUAGE::Spanish),
        "it" | "ita" => (Algorithm::Italian, LANGUAGE::Italian),
        "pt" | "por" => (Algorithm::Portuguese, LANGUAGE::Portuguese),
        "nl" | "dut" | "nld" => (Algorithm::Dutch, LANGUAGE::Dutch),
        "ru" | "rus" => (Algorithm::Russian, LANGUAGE::Russian),
        "sv" | "swe" => (Algorithm::Swedish, LANGUAGE::Swedish),
        _ => (Algorithm::English, LANGUAGE::English),
    }
}

impl Tokenizer {
    /// Create a tokenizer for the given language
    pub fn for_language(config: &TokenizerConfig, code: &LanguageCode) -> Self {
        let (algorithm, stop_language) = language_profile(code);

        let stemmer = if config.stem {
            Some(Stemmer::create(algorithm))
        } else {
            None
        };

        let stopwords = if config.remove_stopwords {
            get(stop_language)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Tokenize text into a vector of terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let tokens: Vec<String> = text
            .unicode_words()
            .map(|word| {
                if self.config.lowercase {
                    word.to_lowercase()
                } else {
                    word.to_string()
                }
            })
            .filter(|token| {
                token.len() >= self.config.min_token_length
                    && token.len() <= self.config.max_token_length
                    && !self.stopwords.contains(token)
            })
            .collect();

        match &self.stemmer {
            Some(stemmer) => tokens
                .into_iter()
                .map(|token| stemmer.stem(&token).to_string())
                .collect(),
            None => tokens,
        }
    }

    /// Get unique terms from text
    pub fn unique_terms(&self, text: &str) -> HashSet<String> {
        self.tokenize(text).into_iter().collect()
    }
}
