//! Session registry: the only place live sessions are stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{SessionHandler, SessionId};
use crate::error::ProfviewError;
use crate::Result;

/// Longest inactivity window a session can have. Longer TTLs are clamped.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Deadline `ttl` after `now`, with `ttl` clamped to [`MAX_SESSION_TTL`].
fn deadline(now: Instant, ttl: Duration) -> Instant {
    now + ttl.min(MAX_SESSION_TTL)
}

/// Outcome of [`SessionRegistry::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new session was inserted.
    Created,
    /// A live session already held this ID; nothing was changed.
    AlreadyLive,
}

/// A registered session: a handler bundle plus its expiry deadline.
struct LiveSession {
    handler: Arc<dyn SessionHandler>,
    ttl: Duration,
    created_at: Instant,
    expires_at: Mutex<Instant>,
}

impl LiveSession {
    fn new(handler: Arc<dyn SessionHandler>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            handler,
            ttl,
            created_at: now,
            expires_at: Mutex::new(deadline(now, ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> Result<bool> {
        let expires_at = self
            .expires_at
            .lock()
            .map_err(|_| ProfviewError::LockPoisoned)?;
        Ok(*expires_at > now)
    }

    /// Push the deadline forward if the session has not expired yet.
    fn renew(&self, now: Instant) -> Result<bool> {
        let mut expires_at = self
            .expires_at
            .lock()
            .map_err(|_| ProfviewError::LockPoisoned)?;
        if *expires_at <= now {
            return Ok(false);
        }
        *expires_at = deadline(now, self.ttl);
        Ok(true)
    }
}

/// Thread-safe registry mapping session IDs to handler bundles.
///
/// Every session carries a deadline. A successful [`lookup`](Self::lookup)
/// pushes the deadline forward by the session's TTL; sessions whose deadline
/// has passed are invisible to lookups and are dropped by
/// [`evict_expired`](Self::evict_expired), usually driven by
/// [`spawn_reaper`](Self::spawn_reaper).
///
/// Lookups hold the read lock and renew through a per-session mutex, so
/// unrelated sessions never contend. Creation and eviction hold the write
/// lock, which orders them against every renewal: a renewal that loses the
/// race to an eviction sees the ID as absent.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, LiveSession>>,
    closed: AtomicBool,
    reaper: Mutex<Option<AbortHandle>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            reaper: Mutex::new(None),
        }
    }

    /// Register `handler` under `id`, expiring `ttl` after the last access.
    /// A `ttl` above [`MAX_SESSION_TTL`] is treated as the maximum.
    ///
    /// Registration is idempotent: if `id` already denotes a live session the
    /// call succeeds with [`Registration::AlreadyLive`] and the existing
    /// handler stays in place. An expired entry under the same ID is replaced.
    pub fn create(
        &self,
        id: SessionId,
        handler: Arc<dyn SessionHandler>,
        ttl: Duration,
    ) -> Result<Registration> {
        let session = LiveSession::new(handler, ttl);

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ProfviewError::LockPoisoned)?;

        // Checked under the lock so nothing slips in behind `shutdown`.
        if self.is_closed() {
            return Err(ProfviewError::RegistryClosed);
        }

        if let Some(existing) = sessions.get(&id) {
            if existing.is_live(Instant::now())? {
                debug!(session = %id, "session already registered");
                return Ok(Registration::AlreadyLive);
            }
        }

        sessions.insert(id, session);
        info!(session = %id, ttl_secs = ttl.as_secs(), "session registered");
        Ok(Registration::Created)
    }

    /// Get the handler for a live session, renewing its expiry.
    ///
    /// Returns `None` if the session does not exist or has expired.
    pub fn lookup(&self, id: &SessionId) -> Result<Option<Arc<dyn SessionHandler>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ProfviewError::LockPoisoned)?;

        let Some(session) = sessions.get(id) else {
            return Ok(None);
        };

        if session.renew(Instant::now())? {
            Ok(Some(Arc::clone(&session.handler)))
        } else {
            Ok(None)
        }
    }

    /// Check if a live session exists, without renewing it.
    pub fn contains(&self, id: &SessionId) -> Result<bool> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ProfviewError::LockPoisoned)?;

        match sessions.get(id) {
            Some(session) => session.is_live(Instant::now()),
            None => Ok(false),
        }
    }

    /// Remove a session immediately.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn evict(&self, id: &SessionId) -> Result<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ProfviewError::LockPoisoned)?;

        let removed = sessions.remove(id);
        if let Some(session) = &removed {
            info!(
                session = %id,
                age_secs = session.created_at.elapsed().as_secs(),
                "session evicted"
            );
        }
        Ok(removed.is_some())
    }

    /// Remove every session whose deadline has passed.
    ///
    /// Returns the number of sessions removed.
    pub fn evict_expired(&self) -> Result<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ProfviewError::LockPoisoned)?;

        let now = Instant::now();
        let before = sessions.len();
        let mut poisoned = false;
        sessions.retain(|id, session| match session.is_live(now) {
            Ok(true) => true,
            Ok(false) => {
                info!(session = %id, "removing expired session");
                false
            }
            Err(_) => {
                poisoned = true;
                false
            }
        });

        if poisoned {
            warn!("dropped sessions with poisoned expiry locks");
        }
        Ok(before - sessions.len())
    }

    /// Get the number of stored sessions, including expired ones not yet swept.
    pub fn count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ProfviewError::LockPoisoned)?;
        Ok(sessions.len())
    }

    /// List all stored session IDs.
    pub fn list_ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ProfviewError::LockPoisoned)?;
        Ok(sessions.keys().copied().collect())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Spawn a background task sweeping expired sessions every `period`.
    ///
    /// The task only holds a weak reference and ends once the registry is
    /// dropped or shut down. Spawning a new reaper replaces the previous one.
    pub fn spawn_reaper(registry: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(registry);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = weak.upgrade() else {
                    break;
                };
                if registry.is_closed() {
                    break;
                }
                match registry.evict_expired() {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "reaper swept expired sessions"),
                    Err(e) => warn!("reaper failed to sweep sessions: {}", e),
                }
            }
        });

        if let Ok(mut reaper) = registry.reaper.lock() {
            if let Some(previous) = reaper.replace(handle.abort_handle()) {
                previous.abort();
            }
        }
        handle
    }

    /// Close the registry: stop the reaper and drop every session.
    ///
    /// Subsequent [`create`](Self::create) calls fail with
    /// [`ProfviewError::RegistryClosed`]. Returns the number of sessions dropped.
    pub fn shutdown(&self) -> Result<usize> {
        self.closed.store(true, Ordering::Release);

        if let Some(reaper) = self
            .reaper
            .lock()
            .map_err(|_| ProfviewError::LockPoisoned)?
            .take()
        {
            reaper.abort();
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ProfviewError::LockPoisoned)?;
        let dropped = sessions.len();
        sessions.clear();
        info!(dropped, "session registry shut down");
        Ok(dropped)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
