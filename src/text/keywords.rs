//! Query keyword extraction and keyword-frequency scoring
//!
//! This is the bag-of-keywords heuristic behind retrieval: a query is reduced
//! to its distinct longer words, and a passage scores one point per
//! case-insensitive occurrence of any of them.

use crate::error::{DocrelayError, Result};
use regex::Regex;

/// Default shortest keyword length, in characters
pub const DEFAULT_MIN_TOKEN_LEN: usize = 4;

/// Splits free-text queries into distinct lowercase keywords
#[derive(Debug, Clone)]
pub struct QueryTokenizer {
    separator_regex: Regex,
    min_token_len: usize,
}

impl QueryTokenizer {
    pub fn new(min_token_len: usize) -> Result<Self> {
        if min_token_len == 0 {
            return Err(DocrelayError::Config(
                "min_token_len must be greater than zero".to_string(),
            ));
        }

        let separator_regex = Regex::new(r"\W+").map_err(|e| {
            DocrelayError::TextProcessing(format!("Failed to compile separator regex: {}", e))
        })?;

        Ok(Self {
            separator_regex,
            min_token_len,
        })
    }

    /// Lowercase, split on non-word characters, keep long words, de-duplicate.
    ///
    /// Tokens keep the order of their first occurrence.
    pub fn tokenize(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut tokens: Vec<String> = Vec::new();

        for word in self.separator_regex.split(&lowered) {
            if word.chars().count() < self.min_token_len {
                continue;
            }
            if !tokens.iter().any(|t| t == word) {
                tokens.push(word.to_string());
            }
        }

        tokens
    }
}

/// Total occurrences of every token in `content`, ignoring case.
///
/// `tokens` must already be lowercase. Each token is counted on its own, so
/// a word matching two tokens ("graph" and "graphene") scores for both.
/// Occurrences of one token never overlap each other: "aaaa" is found once
/// in "aaaaa".
pub fn keyword_score(content: &str, tokens: &[String]) -> usize {
    if tokens.is_empty() || content.is_empty() {
        return 0;
    }

    let haystack = content.to_lowercase();
    tokens
        .iter()
        .map(|token| haystack.matches(token.as_str()).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_question() {
        let tokenizer = QueryTokenizer::new(DEFAULT_MIN_TOKEN_LEN).unwrap();
        let tokens = tokenizer.tokenize("What is the status of Graphene synthesis?");
        assert_eq!(tokens, vec!["what", "status", "graphene", "synthesis"]);
    }

    #[test]
    fn test_tokenize_deduplicates() {
        let tokenizer = QueryTokenizer::new(DEFAULT_MIN_TOKEN_LEN).unwrap();
        let tokens = tokenizer.tokenize("Coating, coating and COATING process");
        assert_eq!(tokens, vec!["coating", "process"]);
    }

    #[test]
    fn test_tokenize_blank_and_short() {
        let tokenizer = QueryTokenizer::new(DEFAULT_MIN_TOKEN_LEN).unwrap();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   \n\t").is_empty());
        assert!(tokenizer.tokenize("is it on? ok!").is_empty());
    }

    #[test]
    fn test_tokenize_counts_characters_not_bytes() {
        let tokenizer = QueryTokenizer::new(DEFAULT_MIN_TOKEN_LEN).unwrap();
        // "độ" is 2 characters but 5 bytes
        assert_eq!(tokenizer.tokenize("độ bền nhiệt"), vec!["nhiệt"]);
    }

    #[test]
    fn test_custom_min_length() {
        let tokenizer = QueryTokenizer::new(2).unwrap();
        assert_eq!(tokenizer.tokenize("is it ok"), vec!["is", "it", "ok"]);
        assert!(QueryTokenizer::new(0).is_err());
    }

    #[test]
    fn test_keyword_score() {
        let tokens = vec!["graphene".to_string(), "coating".to_string()];
        assert_eq!(keyword_score("Graphene coating process", &tokens), 2);
        assert_eq!(keyword_score("GRAPHENE, graphene and more Graphene", &tokens), 3);
        assert_eq!(keyword_score("unrelated text about polymers", &tokens), 0);
        assert_eq!(keyword_score("", &tokens), 0);
        assert_eq!(keyword_score("graphene", &[]), 0);
    }

    #[test]
    fn test_keyword_score_substrings() {
        let tokens = vec!["graph".to_string(), "graphene".to_string()];
        // "graphene" contains "graph", both tokens count
        assert_eq!(keyword_score("graphene", &tokens), 2);
    }

    #[test]
    fn test_keyword_score_self_overlap_counts_once() {
        let tokens = vec!["aaaa".to_string()];
        assert_eq!(keyword_score("aaaaa", &tokens), 1);
        assert_eq!(keyword_score("aaaaaaaa", &tokens), 2);

        let tokens = vec!["anana".to_string()];
        assert_eq!(keyword_score("Bananana", &tokens), 1);
    }
}
