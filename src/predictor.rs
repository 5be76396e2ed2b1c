//! Next-word prediction from bigram and trigram frequency tables.
//!
//! A [`Predictor`] is immutable once built. It is shared with the prediction
//! worker through an `Arc` and never locked.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::hash::Hash;

use itertools::Itertools;

pub mod store;

/// A candidate next word and how often it followed the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub word: String,
    pub count: u64,
}

/// Successor counts keyed by context, ranked once at construction.
///
/// A context with no observations is absent; zero counts are never stored.
#[derive(Debug, Clone)]
pub struct FrequencyTable<K> {
    contexts: HashMap<K, Vec<Candidate>>,
}

/// Single-word context (order 2).
pub type BigramTable = FrequencyTable<String>;

/// Ordered word-pair context (order 3).
pub type TrigramTable = FrequencyTable<(String, String)>;

impl<K: Eq + Hash> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self {
            contexts: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> FrequencyTable<K> {
    /// Build a table from raw counts.
    ///
    /// Repeated contexts and repeated words are summed. Zero counts are
    /// dropped, and so is a context left with no successors. Candidates are
    /// ordered by descending count, then by word.
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        S: IntoIterator<Item = (String, u64)>,
    {
        let mut merged: HashMap<K, HashMap<String, u64>> = HashMap::new();
        for (context, successors) in counts {
            let entry = merged.entry(context).or_default();
            for (word, count) in successors {
                if count > 0 {
                    *entry.entry(word).or_default() += count;
                }
            }
        }

        let contexts = merged
            .into_iter()
            .filter(|(_, successors)| !successors.is_empty())
            .map(|(context, successors)| {
                let ranked = successors
                    .into_iter()
                    .map(|(word, count)| Candidate { word, count })
                    .sorted_by(|a, b| {
                        (Reverse(a.count), &a.word).cmp(&(Reverse(b.count), &b.word))
                    })
                    .collect();
                (context, ranked)
            })
            .collect();

        Self { contexts }
    }

    /// Ranked successors of `context`, or `None` if it was never observed.
    pub fn get(&self, context: &K) -> Option<&[Candidate]> {
        self.contexts.get(context).map(Vec::as_slice)
    }

    /// Number of distinct contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Ranks continuations of a trailing context.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    bigram: BigramTable,
    trigram: TrigramTable,
}

impl Predictor {
    pub fn from_tables(bigram: BigramTable, trigram: TrigramTable) -> Self {
        Self { bigram, trigram }
    }

    /// A predictor with no observations. Every query returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bigram_contexts(&self) -> usize {
        self.bigram.len()
    }

    pub fn trigram_contexts(&self) -> usize {
        self.trigram.len()
    }

    /// Return at most `top_k` words likely to follow `context`.
    ///
    /// The last two words are looked up in the trigram table first. Only
    /// when that misses (or there is a single word) is the last word looked
    /// up in the bigram table.
    pub fn suggest(&self, context: &str, top_k: usize) -> Vec<String> {
        let folded = context.to_lowercase();
        let tokens: Vec<&str> = folded.split_whitespace().collect();

        let ranked = match tokens.as_slice() {
            [] => None,
            [.., prev, last] => self
                .trigram
                .get(&(prev.to_string(), last.to_string()))
                .or_else(|| self.bigram.get(&last.to_string())),
            [last] => self.bigram.get(&last.to_string()),
        };

        ranked
            .unwrap_or_default()
            .iter()
            .take(top_k)
            .map(|c| c.word.clone())
            .collect()
    }
}

/// Bigram `the -> {cat: 5, dog: 2}` and trigram `(the, cat) -> {sat: 3}`.
#[cfg(test)]
pub(crate) fn scenario_predictor() -> Predictor {
    let bigram = BigramTable::from_counts([(
        "the".to_string(),
        vec![("cat".to_string(), 5), ("dog".to_string(), 2)],
    )]);
    let trigram = TrigramTable::from_counts([(
        ("the".to_string(), "cat".to_string()),
        vec![("sat".to_string(), 3)],
    )]);
    Predictor::from_tables(bigram, trigram)
}
