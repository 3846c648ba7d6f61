//! The pool of words drawers choose from.

use rand::seq::IndexedRandom;

const DEFAULT_WORDS: &[&str] = &[
    "apple", "banana", "cat", "dog", "elephant", "fish", "guitar", "house",
    "island", "jacket", "kite", "lemon", "mountain", "notebook", "orange",
    "piano", "queen", "rabbit", "sunflower", "tree", "umbrella", "volcano",
    "watermelon", "xylophone", "yacht", "zebra", "airplane", "beach",
    "castle", "dragon", "eagle", "flower", "giraffe", "helicopter", "igloo",
    "jungle", "kangaroo", "lighthouse", "moon", "night", "octopus",
    "penguin", "rainbow", "snake", "tiger", "unicorn", "violin", "wolf",
    "yellow", "zombie", "bicycle", "camera", "diamond", "fireworks",
];

/// A static list of candidate words. Shared read-only by every room.
#[derive(Debug, Clone)]
pub struct WordPool {
    words: Vec<String>,
}

impl WordPool {
    /// Builds a pool from `words`, dropping blanks and duplicates
    /// (case-insensitively) while keeping first-seen order.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = std::collections::HashSet::new();
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty() && seen.insert(w.to_lowercase()))
            .collect();
        Self { words }
    }

    /// Samples `n` distinct words, uniformly, without replacement.
    ///
    /// Returns every word (in random order) if the pool has fewer than `n`.
    pub fn sample(&self, n: usize) -> Vec<String> {
        self.words
            .choose_multiple(&mut rand::rng(), n)
            .cloned()
            .collect()
    }

    /// Picks one of `offered` uniformly at random.
    pub fn pick(offered: &[String]) -> Option<String> {
        offered.choose(&mut rand::rng()).cloned()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w.eq_ignore_ascii_case(word))
    }
}

impl Default for WordPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_has_no_duplicates() {
        let pool = WordPool::default();
        assert_eq!(pool.len(), DEFAULT_WORDS.len());
        assert!(pool.contains("Xylophone"));
    }

    #[test]
    fn test_new_drops_blanks_and_duplicates() {
        let pool = WordPool::new(["cat", " ", "Cat", "dog ", "dog"]);
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("cat"));
        assert!(pool.contains("dog"));
    }

    #[test]
    fn test_sample_is_distinct_and_from_pool() {
        let pool = WordPool::default();
        for _ in 0..50 {
            let words = pool.sample(3);
            assert_eq!(words.len(), 3);
            assert!(words.iter().all(|w| pool.contains(w)));
            assert_ne!(words[0], words[1]);
            assert_ne!(words[1], words[2]);
            assert_ne!(words[0], words[2]);
        }
    }

    #[test]
    fn test_sample_more_than_pool_returns_all() {
        let pool = WordPool::new(["a", "b"]);
        let mut words = pool.sample(5);
        words.sort();
        assert_eq!(words, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_pick_from_offered() {
        let offered = vec!["cat".to_string(), "dog".to_string()];
        let picked = WordPool::pick(&offered).unwrap();
        assert!(offered.contains(&picked));
        assert_eq!(WordPool::pick(&[]), None);
    }
}
