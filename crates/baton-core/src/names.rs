//! Human-readable participant names (`adjective-surname`).

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::IndexedRandom;

/// Source of candidate participant identifiers. Uniqueness is checked by the caller.
pub trait NameSource: Send + Sync {
    fn generate(&self) -> String;
}

const ADJECTIVES: &[&str] = &[
    "agile", "bold", "brave", "bright", "calm", "clever", "cosmic", "crisp", "daring", "eager",
    "fancy", "fierce", "gentle", "happy", "jolly", "keen", "lively", "lucky", "merry", "nimble",
    "patient", "proud", "quick", "quiet", "rapid", "shiny", "silent", "snappy", "steady", "swift",
    "tidy", "witty",
];

const SURNAMES: &[&str] = &[
    "archimedes", "babbage", "bohr", "curie", "darwin", "dijkstra", "einstein", "euler",
    "faraday", "feynman", "gauss", "goodall", "hamilton", "hopper", "hypatia", "kepler",
    "knuth", "lamarr", "lovelace", "mendel", "newton", "noether", "pascal", "planck", "ritchie",
    "sagan", "shannon", "tesla", "thompson", "turing", "wozniak", "yalow",
];

/// Random `adjective-surname` names.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNames;

impl NameSource for RandomNames {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("anonymous");
        let surname = SURNAMES.choose(&mut rng).copied().unwrap_or("participant");
        format!("{adjective}-{surname}")
    }
}

/// Cycles through a fixed list. Deterministic names for tests.
#[derive(Debug, Default)]
pub struct FixedNames {
    names: Vec<String>,
    next: AtomicUsize,
}

impl FixedNames {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl NameSource for FixedNames {
    fn generate(&self) -> String {
        if self.names.is_empty() {
            return "participant".into();
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.names[i % self.names.len()].clone()
    }
}
