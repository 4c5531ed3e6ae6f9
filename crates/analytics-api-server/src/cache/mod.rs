//! TTL response cache keyed by the normalized query descriptor. Entries are
//! expired lazily on lookup; there is no background sweeper.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::filters::FilterDescriptor;
use crate::security::Role;

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    inserted: Instant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Deterministic key over everything that can change a response: the
    /// endpoint, the normalized filters and the caller's role. Tenant id is
    /// part of the filters, so tenants can never share an entry.
    pub fn key(endpoint: &str, filters: &FilterDescriptor, role: Role) -> String {
        #[derive(Serialize)]
        struct KeyMaterial<'a> {
            endpoint: &'a str,
            filters: &'a FilterDescriptor,
            role: &'a str,
        }
        let material = serde_json::to_vec(&KeyMaterial {
            endpoint,
            filters,
            role: role.as_str(),
        })
        .unwrap_or_default();
        hex::encode(Sha256::digest(&material))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            drop(entry);
            self.entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: String, value: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every entry; used after a dataset refresh so stale aggregates
    /// never outlive the snapshot they were computed from.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn descriptor(tenant: &str) -> FilterDescriptor {
        let mut params = HashMap::new();
        params.insert("tenant_id".to_string(), tenant.to_string());
        params.insert("from".to_string(), "2024-01-01".to_string());
        params.insert("to".to_string(), "2024-01-31".to_string());
        FilterDescriptor::parse(&params).unwrap()
    }

    #[test]
    fn second_identical_lookup_is_a_hit() {
        let cache = ResponseCache::new(Duration::from_secs(600));
        let key = ResponseCache::key("summary", &descriptor("muni-centro"), Role::Visor);
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), json!({"ok": true}));
        assert_eq!(cache.get(&key), Some(json!({"ok": true})));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn expired_entries_are_removed_on_lookup() {
        let cache = ResponseCache::new(Duration::from_millis(0));
        cache.put("k".into(), json!(1));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn key_separates_tenant_role_and_endpoint() {
        let a = ResponseCache::key("summary", &descriptor("muni-centro"), Role::Visor);
        let b = ResponseCache::key("summary", &descriptor("pyme-tienda"), Role::Visor);
        let c = ResponseCache::key("summary", &descriptor("muni-centro"), Role::Admin);
        let d = ResponseCache::key("timeseries", &descriptor("muni-centro"), Role::Visor);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        // Same inputs, same key.
        assert_eq!(
            a,
            ResponseCache::key("summary", &descriptor("muni-centro"), Role::Visor)
        );
    }

    #[test]
    fn key_is_stable_across_date_representations() {
        let mut plain = HashMap::new();
        plain.insert("tenant_id".to_string(), "muni-centro".to_string());
        plain.insert("from".to_string(), "2024-01-01".to_string());
        plain.insert("to".to_string(), "2024-01-31".to_string());
        let mut timestamped = plain.clone();
        timestamped.insert("from".to_string(), "2024-01-01T15:30:00Z".to_string());
        timestamped.insert("to".to_string(), "2024-01-31T02:00:00+00:00".to_string());
        let a = FilterDescriptor::parse(&plain).unwrap();
        let b = FilterDescriptor::parse(&timestamped).unwrap();
        assert_eq!(
            ResponseCache::key("summary", &a, Role::Visor),
            ResponseCache::key("summary", &b, Role::Visor)
        );
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ResponseCache::new(Duration::from_secs(600));
        cache.put("k".into(), json!(1));
        cache.clear();
        assert!(cache.get("k").is_none());
    }
}
