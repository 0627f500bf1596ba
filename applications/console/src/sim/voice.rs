//! In-process voice transport

use super::sink::SimSink;
use async_trait::async_trait;
use discodj_core::types::ConnectionId;
use discodj_core::{AudioSink, DjError, RoomId, VoiceConnection, VoiceContext, VoiceProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

pub struct SimConnection {
    id: ConnectionId,
    channel: String,
    destroyed: AtomicBool,
}

impl SimConnection {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl VoiceConnection for SimConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn subscribe(&self, _sink: Arc<dyn AudioSink>) {
        info!(connection = ?self.id, channel = %self.channel, "sink subscribed");
    }

    fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            info!(connection = ?self.id, channel = %self.channel, "left voice channel");
        }
    }
}

/// Hands out one connection and one [`SimSink`] per room
#[derive(Default)]
pub struct SimVoice {
    connections: Mutex<HashMap<RoomId, Arc<SimConnection>>>,
    sinks: Mutex<HashMap<RoomId, Arc<SimSink>>>,
    next_id: AtomicU64,
}

impl SimVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sink created for `room`, if any
    pub fn sink(&self, room: &RoomId) -> Option<Arc<SimSink>> {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room)
            .cloned()
    }

    pub fn connection(&self, room: &RoomId) -> Option<Arc<SimConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room)
            .filter(|c| !c.is_destroyed())
            .cloned()
    }
}

#[async_trait]
impl VoiceProvider for SimVoice {
    async fn join(&self, room: &RoomId, context: &VoiceContext) -> discodj_core::Result<Arc<dyn VoiceConnection>> {
        let channel = context
            .channel
            .clone()
            .ok_or_else(|| DjError::voice("no voice channel to join"))?;
        let connection = Arc::new(SimConnection {
            id: ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            channel,
            destroyed: AtomicBool::new(false),
        });
        info!(room = %room, channel = %connection.channel, connection = ?connection.id, "joined voice channel");
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room.clone(), Arc::clone(&connection));
        Ok(connection)
    }

    fn get_existing(&self, room: &RoomId) -> Option<Arc<dyn VoiceConnection>> {
        self.connection(room).map(|c| c as Arc<dyn VoiceConnection>)
    }

    fn create_sink(&self, room: &RoomId) -> Arc<dyn AudioSink> {
        let sink = Arc::new(SimSink::new());
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room.clone(), Arc::clone(&sink));
        sink
    }
}
