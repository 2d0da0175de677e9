//! Category keyword vocabulary used to tag requests

use std::collections::{BTreeMap, BTreeSet};

use super::similarity::word_set;

/// Category used when no vocabulary keyword matches
pub const DEFAULT_CATEGORY: &str = "general";

/// Maps categories to the keywords that identify them
#[derive(Debug, Clone, Default)]
pub struct KeywordVocabulary {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl KeywordVocabulary {
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        let categories = categories
            .into_iter()
            .map(|(category, words)| {
                let words = words.iter().map(|w| w.trim().to_lowercase()).collect();
                (category.trim().to_lowercase(), words)
            })
            .collect();

        Self { categories }
    }

    /// Vocabulary keywords of `category` present in the text, sorted
    pub fn keywords_for(&self, category: &str, text: &str) -> Vec<String> {
        let Some(vocabulary) = self.categories.get(category) else {
            return Vec::new();
        };

        word_set(text)
            .into_iter()
            .filter(|word| vocabulary.contains(word))
            .collect()
    }

    /// Pick the category with the most keyword matches; ties go to the
    /// alphabetically first category
    pub fn classify(&self, text: &str) -> (String, Vec<String>) {
        let words = word_set(text);
        let mut best: Option<(&String, Vec<String>)> = None;

        for (category, vocabulary) in &self.categories {
            let matched: Vec<String> = words
                .iter()
                .filter(|word| vocabulary.contains(*word))
                .cloned()
                .collect();

            let better = match &best {
                Some((_, current)) => matched.len() > current.len(),
                None => !matched.is_empty(),
            };
            if better {
                best = Some((category, matched));
            }
        }

        match best {
            Some((category, keywords)) => (category.clone(), keywords),
            None => (DEFAULT_CATEGORY.to_string(), Vec::new()),
        }
    }

    /// Category and keywords for a request, honoring an explicit category
    pub fn resolve(&self, explicit: Option<&str>, text: &str) -> (String, Vec<String>) {
        match explicit.map(|c| c.trim().to_lowercase()) {
            Some(category) if !category.is_empty() => {
                let keywords = self.keywords_for(&category, text);
                (category, keywords)
            }
            _ => self.classify(text),
        }
    }
}
