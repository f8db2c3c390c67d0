use crate::domain::conversation::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

type Slot = Arc<AsyncMutex<Session>>;

/// Reaper period when no idle timeout is configured, and its upper bound otherwise.
pub const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Keyed holder of every user's dialogue session.
///
/// Each user gets their own async mutex, so events from one user are applied
/// one at a time while different users proceed independently. The map itself
/// sits behind a plain mutex that is only held to look up or insert a slot.
#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<i64, Slot>>,
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    /// Creates a store. Sessions untouched for longer than `idle_timeout`
    /// are dropped back to idle; `None` keeps them until cleared.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            slots: Mutex::default(),
            idle_timeout,
        }
    }

    /// Locks the session of `user_id`, creating an idle one if needed.
    ///
    /// Waits while another event of the same user is being handled.
    pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<Session> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(user_id).or_default())
        };

        let mut session = slot.lock_owned().await;
        let now = Instant::now();
        if let Some(timeout) = self.idle_timeout
            && !session.is_idle()
            && session.is_expired(now, timeout)
        {
            debug!(user_id, state = ?session.state(), "session expired");
            session.clear();
        }
        session.touch(now);
        session
    }

    /// A copy of the user's session, if one exists.
    pub async fn snapshot(&self, user_id: i64) -> Option<Session> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(&user_id).cloned()?
        };
        let session = slot.lock().await;
        Some(session.clone())
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops slots that are idle or past the idle timeout and not in use.
    ///
    /// Returns the number of evicted sessions.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let idle_timeout = self.idle_timeout;
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();

        slots.retain(|_, slot| {
            // Someone is handling or waiting on this user.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => {
                    let expired = idle_timeout.is_some_and(|t| session.is_expired(now, t));
                    !(session.is_idle() || expired)
                }
                Err(_) => true,
            }
        });

        before - slots.len()
    }

    /// How often the reaper should run: the idle timeout, kept within one
    /// second and [`REAP_INTERVAL`].
    pub fn reap_interval(&self) -> Duration {
        self.idle_timeout.map_or(REAP_INTERVAL, |timeout| {
            timeout.clamp(Duration::from_secs(1), REAP_INTERVAL)
        })
    }

    /// Runs [`evict_idle`](Self::evict_idle) every `every` until the store is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_idle(Instant::now());
                if evicted > 0 {
                    debug!(evicted, remaining = store.len(), "evicted idle sessions");
                }
            }
        })
    }
}
