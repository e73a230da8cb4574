// src/engine/exact.rs
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use crate::types::Score;
use super::MatchEngine;

/// Matches tuples that are equal. The value itself is the only bin key and
/// every accepted pair scores 0.
#[derive(Debug, Clone)]
pub struct ExactEngine<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ExactEngine<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for ExactEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MatchEngine for ExactEngine<T>
where
    T: Hash + Eq + Clone + Debug + Send + Sync,
{
    type Tuple = T;
    type Key = T;

    fn bin_keys(&self, tuple: &T) -> std::result::Result<Vec<T>, String> {
        Ok(vec![tuple.clone()])
    }

    fn score(&self, a: &T, b: &T) -> Option<Score> {
        if a == b {
            Some(0.0)
        } else {
            None
        }
    }

    fn description(&self) -> String {
        "Exact value".to_string()
    }
}
