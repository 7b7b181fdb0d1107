//! Per-run transaction cache with LRU eviction.
//!
//! Owned by a single tracker; nothing is shared or persisted.

use serde_json::Value;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct TransactionCache {
    capacity: usize,
    data: HashMap<String, Value>,
    access_order: VecDeque<String>,
    metrics: CacheMetrics,
}

impl TransactionCache {
    /// Capacity 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        TransactionCache {
            capacity,
            data: HashMap::new(),
            access_order: VecDeque::new(),
            metrics: CacheMetrics::default(),
        }
    }

    pub fn get(&mut self, signature: &str) -> Option<Value> {
        match self.data.get(signature) {
            Some(tx) => {
                let tx = tx.clone();
                self.touch(signature);
                self.metrics.hits += 1;
                Some(tx)
            }
            None => {
                self.metrics.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, signature: String, tx: Value) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() >= self.capacity && !self.data.contains_key(&signature) {
            if let Some(lru) = self.access_order.pop_front() {
                self.data.remove(&lru);
                self.metrics.evictions += 1;
            }
        }
        self.touch(&signature);
        self.data.insert(signature, tx);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    fn touch(&mut self, signature: &str) {
        self.access_order.retain(|s| s != signature);
        self.access_order.push_back(signature.to_string());
    }
}
