//! Injected collaborator: client address lookups, plus the TTL cache that
//! wraps them (spec.md §5, §6).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::DomainResult;

#[derive(Debug, Clone)]
pub struct ClientAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub geofence_radius_meters: Option<u32>,
}

#[async_trait]
pub trait ClientAddressProvider: Send + Sync {
    async fn get_client_address(&self, client_id: Uuid) -> DomainResult<ClientAddress>;
}

#[derive(Debug, Clone, Default)]
pub struct MockClientAddressProvider {
    pub addresses: HashMap<Uuid, ClientAddress>,
}

#[async_trait]
impl ClientAddressProvider for MockClientAddressProvider {
    async fn get_client_address(&self, client_id: Uuid) -> DomainResult<ClientAddress> {
        self.addresses
            .get(&client_id)
            .cloned()
            .ok_or_else(|| crate::error::DomainError::not_found("ClientAddress", client_id.to_string()))
    }
}

struct CacheEntry {
    address: ClientAddress,
    cached_at: Instant,
}

/// TTL cache wrapping any `ClientAddressProvider`, default 5-minute TTL
/// (spec.md §5 "Caching"). Exposes per-id and global invalidation and
/// reports its size/TTL for monitoring.
pub struct CachedClientAddressProvider<P: ClientAddressProvider> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, CacheEntry>>,
}

impl<P: ClientAddressProvider> CachedClientAddressProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, Duration::from_secs(300))
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn invalidate(&self, client_id: Uuid) {
        self.entries.lock().unwrap().remove(&client_id);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn size(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl<P: ClientAddressProvider + Sync> ClientAddressProvider for CachedClientAddressProvider<P> {
    async fn get_client_address(&self, client_id: Uuid) -> DomainResult<ClientAddress> {
        {
            let entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get(&client_id) {
                if entry.cached_at.elapsed() < self.ttl {
                    return Ok(entry.address.clone());
                }
            }
        }
        let address = self.inner.get_client_address(client_id).await?;
        self.entries.lock().unwrap().insert(
            client_id,
            CacheEntry {
                address: address.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address() -> ClientAddress {
        ClientAddress {
            line1: "1 Main St".into(),
            line2: None,
            city: "Austin".into(),
            state: "TX".into(),
            postal_code: "78701".into(),
            latitude: 30.2672,
            longitude: -97.7431,
            geofence_radius_meters: Some(100),
        }
    }

    #[tokio::test]
    async fn cache_returns_inner_result_and_tracks_size() {
        let client_id = Uuid::new_v4();
        let mut addresses = HashMap::new();
        addresses.insert(client_id, sample_address());
        let cached = CachedClientAddressProvider::new(MockClientAddressProvider { addresses });

        let address = cached.get_client_address(client_id).await.unwrap();
        assert_eq!(address.city, "Austin");
        assert_eq!(cached.size(), 1);
    }

    #[tokio::test]
    async fn invalidate_removes_single_entry() {
        let client_id = Uuid::new_v4();
        let mut addresses = HashMap::new();
        addresses.insert(client_id, sample_address());
        let cached = CachedClientAddressProvider::new(MockClientAddressProvider { addresses });

        cached.get_client_address(client_id).await.unwrap();
        assert_eq!(cached.size(), 1);
        cached.invalidate(client_id);
        assert_eq!(cached.size(), 0);
    }

    #[tokio::test]
    async fn invalidate_all_clears_cache() {
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let mut addresses = HashMap::new();
        addresses.insert(id_a, sample_address());
        addresses.insert(id_b, sample_address());
        let cached = CachedClientAddressProvider::new(MockClientAddressProvider { addresses });

        cached.get_client_address(id_a).await.unwrap();
        cached.get_client_address(id_b).await.unwrap();
        assert_eq!(cached.size(), 2);
        cached.invalidate_all();
        assert_eq!(cached.size(), 0);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let client_id = Uuid::new_v4();
        let mut addresses = HashMap::new();
        addresses.insert(client_id, sample_address());
        let cached = CachedClientAddressProvider::with_ttl(
            MockClientAddressProvider { addresses },
            Duration::from_millis(1),
        );

        cached.get_client_address(client_id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let address = cached.get_client_address(client_id).await.unwrap();
        assert_eq!(address.city, "Austin");
    }
}
