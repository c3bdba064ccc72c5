//! Runtime-mutable zone manager
//!
//! Owns the current set of monitored bounding boxes. Reads go through a
//! lock-free `ArcSwap` handle shared with the vessel store, so the ingest
//! hot path never takes a lock to resolve membership. Mutations are
//! serialized, persisted, applied to the vessel table as part of the same
//! operation, and then signalled to the feed loop over a watch channel so
//! it resubscribes with the new bounding boxes.

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::info;

use crate::storage::{StorageError, ZoneStore};
use crate::store::VesselStore;
use crate::types::{BoundingBox, Zone};

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct ZoneManager {
    zones: Arc<ArcSwap<Vec<Zone>>>,
    /// Serializes mutations so persist + vessel eviction stay atomic with
    /// respect to each other.
    mutation: Mutex<()>,
    changed: watch::Sender<u64>,
    store: Box<dyn ZoneStore>,
}

impl ZoneManager {
    /// Build the manager, preferring the persisted zone set over the
    /// configured one when one exists.
    pub async fn open(
        configured: Vec<Zone>,
        store: Box<dyn ZoneStore>,
    ) -> Result<Self, ZoneError> {
        let initial = match store.load().await? {
            Some(persisted) => {
                info!(count = persisted.len(), "loaded persisted zone set");
                persisted
            }
            None => {
                store.save(&configured).await?;
                configured
            }
        };
        let (changed, _) = watch::channel(0);
        Ok(Self {
            zones: Arc::new(ArcSwap::from_pointee(initial)),
            mutation: Mutex::new(()),
            changed,
            store,
        })
    }

    /// Shared read handle, also held by the vessel store for membership
    /// resolution.
    pub fn handle(&self) -> Arc<ArcSwap<Vec<Zone>>> {
        Arc::clone(&self.zones)
    }

    /// Current zone set.
    pub fn zones(&self) -> Vec<Zone> {
        self.zones.load().as_ref().clone()
    }

    /// Bounding boxes for feed subscription.
    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        self.zones.load().iter().map(|z| z.bounds).collect()
    }

    /// Receiver that observes a version bump on every zone mutation.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    /// Add a zone, or replace the one with the same name.
    pub async fn add_or_replace(
        &self,
        zone: Zone,
        vessels: &VesselStore,
    ) -> Result<(), ZoneError> {
        let _guard = self.mutation.lock().await;
        let mut next = self.zones.load().as_ref().clone();
        match next.iter_mut().find(|z| z.name == zone.name) {
            Some(existing) => *existing = zone.clone(),
            None => next.push(zone.clone()),
        }
        self.store.save(&next).await?;
        self.zones.store(Arc::new(next));
        // A reshaped box can gain or lose members; recompute before the
        // next sweep observes the new set.
        vessels.recompute_memberships().await;
        info!(zone = %zone.name, "zone added or replaced");
        self.notify_change();
        Ok(())
    }

    /// Remove a zone by name, evicting its member vessels as part of the
    /// same operation.
    pub async fn remove(&self, name: &str, vessels: &VesselStore) -> Result<(), ZoneError> {
        let _guard = self.mutation.lock().await;
        let mut next = self.zones.load().as_ref().clone();
        let before = next.len();
        next.retain(|z| z.name != name);
        if next.len() == before {
            return Err(ZoneError::NotFound(name.to_owned()));
        }
        self.store.save(&next).await?;
        let evicted = vessels.evict_zone_members(name).await;
        self.zones.store(Arc::new(next));
        vessels.recompute_memberships().await;
        info!(zone = name, evicted = evicted.len(), "zone removed");
        self.notify_change();
        Ok(())
    }

    /// Replace the whole zone set at once (operator mode switch).
    pub async fn replace_all(
        &self,
        zones: Vec<Zone>,
        vessels: &VesselStore,
    ) -> Result<(), ZoneError> {
        let _guard = self.mutation.lock().await;
        let current = self.zones.load();
        let removed: Vec<String> = current
            .iter()
            .filter(|z| !zones.iter().any(|n| n.name == z.name))
            .map(|z| z.name.clone())
            .collect();
        self.store.save(&zones).await?;
        for name in &removed {
            vessels.evict_zone_members(name).await;
        }
        self.zones.store(Arc::new(zones));
        vessels.recompute_memberships().await;
        info!(removed = removed.len(), "zone set replaced");
        self.notify_change();
        Ok(())
    }

    fn notify_change(&self) {
        // send_modify never blocks and tolerates zero receivers
        self.changed.send_modify(|v| *v = v.wrapping_add(1));
    }
}
