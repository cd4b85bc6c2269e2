//! TTL-bounded memoization for classifier results.
//!
//! The teacher has no cache of its own; `moka` is pulled in from the
//! `enhanced_agent_bus_rust` example for this, since it's the ecosystem's
//! standard async TTL cache and the teacher never needed one.

use std::time::Duration;

use moka::future::Cache;

use crate::classifier::Classification;

#[derive(Clone)]
pub struct ClassifierCache {
    inner: Cache<String, Classification>,
}

impl ClassifierCache {
    pub fn new(ttl_secs: u64, max_entries: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .max_capacity(max_entries)
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &str) -> Option<Classification> {
        self.inner.get(key).await
    }

    pub async fn put(&self, key: &str, value: Classification) {
        self.inner.insert(key.to_string(), value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationMethod;
    use std::collections::HashMap;

    fn sample() -> Classification {
        Classification {
            primary_category: "billing_question".to_string(),
            confidence: 0.8,
            all_categories: HashMap::new(),
            secondary_categories: Vec::new(),
            reasoning: "test".to_string(),
            method: ClassificationMethod::Ai,
        }
    }

    #[tokio::test]
    async fn stores_and_retrieves_by_key() {
        let cache = ClassifierCache::new(60, 100);
        cache.put("key1", sample()).await;
        let hit = cache.get("key1").await.unwrap();
        assert_eq!(hit.primary_category, "billing_question");
    }

    #[tokio::test]
    async fn misses_on_unknown_key() {
        let cache = ClassifierCache::new(60, 100);
        assert!(cache.get("missing").await.is_none());
    }
}
