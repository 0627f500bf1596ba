//! Room registry
//!
//! Owned by the application root and handed to the controller, so separate
//! controllers (and tests) never share rooms by accident.

use crate::room::RoomState;
use crate::sync::PanelSlot;
use discodj_core::RoomId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// Shared handle to one room
#[derive(Clone)]
pub struct RoomHandle {
    pub id: RoomId,
    pub state: Arc<AsyncMutex<RoomState>>,
    pub panel: Arc<PanelSlot>,
}

pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    history_size: usize,
}

impl RoomRegistry {
    pub fn new(history_size: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            history_size,
        }
    }

    /// The room for `id`, created empty on first use
    pub fn get_or_create(&self, id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms
            .entry(id.clone())
            .or_insert_with(|| RoomHandle {
                id: id.clone(),
                state: Arc::new(AsyncMutex::new(RoomState::new(id.clone(), self.history_size))),
                panel: Arc::new(PanelSlot::default()),
            })
            .clone()
    }

    pub fn get(&self, id: &RoomId) -> Option<RoomHandle> {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Every known room, in no particular order
    pub fn all(&self) -> Vec<RoomHandle> {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rooms_are_created_once() {
        let registry = RoomRegistry::default();
        let a = registry.get_or_create(&RoomId::new("a"));
        let again = registry.get_or_create(&RoomId::new("a"));
        assert!(Arc::ptr_eq(&a.state, &again.state));
        assert!(Arc::ptr_eq(&a.panel, &again.panel));

        registry.get_or_create(&RoomId::new("b"));
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&RoomId::new("c")).is_none());
    }

    #[tokio::test]
    async fn separate_registries_are_independent() {
        let first = RoomRegistry::new(5);
        let second = RoomRegistry::new(5);
        first.get_or_create(&RoomId::new("a")).state.lock().await.settings.volume = 10;

        let other = second.get_or_create(&RoomId::new("a"));
        assert_eq!(other.state.lock().await.settings.volume, 100);
        assert_eq!(other.state.lock().await.history.max_size(), 5);
    }
}
