//! Per-key results for multi-symbol operations.

use std::collections::HashMap;

use crate::errors::MarketDataError;
use crate::models::ProviderId;

/// Outcome for one key of a batch.
///
/// Exactly one of `value` and `error` is set; `success` mirrors `value`.
#[derive(Debug)]
pub struct KeyedResult<T> {
    pub key: String,
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<MarketDataError>,
    /// Provider that produced `value`
    pub source: Option<ProviderId>,
}

impl<T> KeyedResult<T> {
    /// A key nobody has answered yet.
    pub fn pending(key: impl Into<String>) -> Self {
        Self::failed(key, MarketDataError::NotYetResolved)
    }

    pub fn ok(key: impl Into<String>, value: T, source: impl Into<ProviderId>) -> Self {
        Self {
            key: key.into(),
            success: true,
            value: Some(value),
            error: None,
            source: Some(source.into()),
        }
    }

    pub fn failed(key: impl Into<String>, error: MarketDataError) -> Self {
        Self {
            key: key.into(),
            success: false,
            value: None,
            error: Some(error),
            source: None,
        }
    }

    /// Consume into a plain `Result`.
    pub fn into_result(self) -> Result<T, MarketDataError> {
        match (self.value, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(error)) => Err(error),
            (None, None) => Err(MarketDataError::NotYetResolved),
        }
    }
}

/// Result map of a batch operation, one entry per requested key.
///
/// Iteration follows the order in which keys were first requested.
#[derive(Debug)]
pub struct BatchResult<T> {
    order: Vec<String>,
    entries: HashMap<String, KeyedResult<T>>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<T> BatchResult<T> {
    /// A map with every distinct key pending. Duplicates keep their first position.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result = Self::default();
        for key in keys {
            let key = key.into();
            if !result.entries.contains_key(&key) {
                result.insert(KeyedResult::pending(key));
            }
        }
        result
    }

    /// Insert or replace the entry for `entry.key`.
    pub fn insert(&mut self, entry: KeyedResult<T>) {
        if !self.entries.contains_key(&entry.key) {
            self.order.push(entry.key.clone());
        }
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&KeyedResult<T>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut KeyedResult<T>> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyedResult<T>> {
        self.order.iter().filter_map(|k| self.entries.get(k))
    }

    /// Keys that have not succeeded yet, in request order.
    pub fn pending_keys(&self) -> Vec<String> {
        self.iter()
            .filter(|r| !r.success)
            .map(|r| r.key.clone())
            .collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &KeyedResult<T>> {
        self.iter().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &KeyedResult<T>> {
        self.iter().filter(|r| !r.success)
    }

    /// Whether every key has a value.
    pub fn is_complete(&self) -> bool {
        self.entries.values().all(|r| r.success)
    }

    /// Successful values keyed by request key.
    pub fn into_values(self) -> HashMap<String, T> {
        self.entries
            .into_iter()
            .filter_map(|(k, r)| r.value.map(|v| (k, v)))
            .collect()
    }
}

impl<T> IntoIterator for BatchResult<T> {
    type Item = KeyedResult<T>;
    type IntoIter = std::vec::IntoIter<KeyedResult<T>>;

    /// Entries in request order.
    fn into_iter(mut self) -> Self::IntoIter {
        self.order
            .iter()
            .filter_map(|k| self.entries.remove(k))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dedupes_and_marks_pending() {
        let batch: BatchResult<u32> = BatchResult::new(["B", "A", "B", "C"]);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.keys().collect::<Vec<_>>(), vec!["B", "A", "C"]);
        for entry in batch.iter() {
            assert!(!entry.success);
            assert!(matches!(entry.error, Some(MarketDataError::NotYetResolved)));
        }
        assert!(!batch.is_complete());
    }

    #[test]
    fn test_insert_replaces_without_reordering() {
        let mut batch: BatchResult<u32> = BatchResult::new(["A", "B"]);
        batch.insert(KeyedResult::ok("A", 1, "YAHOO"));

        assert_eq!(batch.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(batch.successes().count(), 1);
        assert_eq!(batch.failures().count(), 1);
        assert_eq!(batch.pending_keys(), vec!["B".to_string()]);

        batch.insert(KeyedResult::ok("B", 2, "FINNHUB"));
        assert!(batch.is_complete());

        let values = batch.into_values();
        assert_eq!(values.get("A"), Some(&1));
        assert_eq!(values.get("B"), Some(&2));
    }

    #[test]
    fn test_into_result() {
        let ok: KeyedResult<u32> = KeyedResult::ok("A", 7, "YAHOO");
        assert_eq!(ok.into_result().unwrap(), 7);

        let failed: KeyedResult<u32> =
            KeyedResult::failed("B", MarketDataError::SymbolNotFound("B".to_string()));
        assert!(matches!(
            failed.into_result(),
            Err(MarketDataError::SymbolNotFound(_))
        ));
    }
}
