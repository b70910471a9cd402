// THEORY:
// The GPS store is the only state shared between the HTTP ingestion side and the
// video side of the controller. It is a plain identifier -> position map behind a
// lock; cloning the store clones the handle, not the data.
//
// Entries are overwritten on every update for the same identifier and are never
// expired or removed. There is no history and no persistence across runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// `lat,lng`, the form mapping web services accept.
impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Shared, lock-guarded map of ambulance id to last reported position.
#[derive(Debug, Clone, Default)]
pub struct GpsStore {
    inner: Arc<RwLock<HashMap<String, GeoPoint>>>,
}

impl GpsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `location` for `ambulance_id`, returning the position it replaced.
    pub fn update(&self, ambulance_id: impl Into<String>, location: GeoPoint) -> Option<GeoPoint> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(ambulance_id.into(), location)
    }

    pub fn get(&self, ambulance_id: &str) -> Option<GeoPoint> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(ambulance_id).copied()
    }

    /// A copy of every entry, sorted by id.
    pub fn snapshot(&self) -> Vec<(String, GeoPoint)> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = map.iter().map(|(id, loc)| (id.clone(), *loc)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
