use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::Session;
use crate::forecast::DisplayZone;
use crate::map::{MapSettings, MarkerAssets};

struct SessionEntry {
    session: Arc<Session>,
    last_seen: Instant,
}

/// Live sessions, dropped after a period without requests.
///
/// At most `max_sessions` are kept; creating one more evicts the least recently seen.
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
    idle_ttl: Duration,
    max_sessions: usize,
    map_settings: MapSettings,
    marker_assets: MarkerAssets,
}

impl SessionStore {
    pub fn new(
        idle_ttl: Duration,
        max_sessions: usize,
        map_settings: MapSettings,
        marker_assets: MarkerAssets,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            max_sessions: max_sessions.max(1),
            map_settings,
            marker_assets,
        }
    }

    /// Start a session with a freshly mounted map, labelling forecasts in `zone`
    pub fn create(&self, zone: Option<DisplayZone>) -> Arc<Session> {
        while self.sessions.len() >= self.max_sessions {
            if !self.evict_least_recent() {
                break;
            }
        }

        let session = Arc::new(Session::new(
            self.map_settings.clone(),
            self.marker_assets.clone(),
            zone,
        ));
        self.sessions.insert(
            session.id(),
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(session = %session.id(), "Session created");
        session
    }

    /// Look up a live session and mark it as seen
    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        let mut entry = self.sessions.get_mut(id)?;
        if entry.last_seen.elapsed() < self.idle_ttl {
            entry.last_seen = Instant::now();
            Some(Arc::clone(&entry.session))
        } else {
            drop(entry);
            self.remove(id);
            None
        }
    }

    /// Remove a session and release its map
    pub fn remove(&self, id: &Uuid) -> Option<Arc<Session>> {
        let (_, entry) = self.sessions.remove(id)?;
        entry.session.teardown();
        tracing::debug!(session = %id, "Session removed");
        Some(entry.session)
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.last_seen)
            .map(|entry| *entry.key());

        match oldest {
            Some(id) => {
                tracing::warn!(session = %id, limit = self.max_sessions, "Session limit reached, evicting");
                self.remove(&id).is_some()
            }
            None => false,
        }
    }

    /// Drop idle sessions. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            let live = entry.last_seen.elapsed() < self.idle_ttl;
            if !live {
                entry.session.teardown();
            }
            live
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Start a background task that drops idle sessions every `every`
pub fn start_session_cleanup_task(store: Arc<SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = store.cleanup();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = store.len(),
                    "Session cleanup completed"
                );
            }
        }
    });
}
