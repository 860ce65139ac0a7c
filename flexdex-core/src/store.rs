//! Live snapshot ownership and atomic refresh
//!
//! Readers clone an `Arc<Snapshot>` under a short read lock and then query
//! without holding anything. A refresh takes a ticket, builds a new snapshot
//! off to the side and swaps it in only if no newer build has already been
//! published, so builds that finish out of order never regress the index.

use crate::error::LoadResult;
use crate::snapshot::Snapshot;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic refresh ticket. Becomes the snapshot generation when published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// What happened to a finished build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The build is now the live snapshot
    Published { generation: u64 },
    /// A newer build was already live; this one was discarded
    Superseded { ticket: u64, current: u64 },
}

struct Published {
    ticket: u64,
    snapshot: Arc<Snapshot>,
}

/// Owner of the live snapshot
pub struct SnapshotStore {
    published: RwLock<Published>,
    next_ticket: AtomicU64,
}

impl SnapshotStore {
    /// Serve `snapshot` until the first refresh.
    pub fn new(snapshot: Snapshot) -> Self {
        let ticket = snapshot.generation();
        Self {
            published: RwLock::new(Published {
                ticket,
                snapshot: Arc::new(snapshot),
            }),
            next_ticket: AtomicU64::new(ticket),
        }
    }

    /// Store serving an empty snapshot
    pub fn empty() -> Self {
        Self::new(Snapshot::empty())
    }

    /// The live snapshot. Holding the `Arc` keeps it alive across refreshes.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.published.read().snapshot)
    }

    /// Generation of the live snapshot
    pub fn generation(&self) -> u64 {
        self.published.read().ticket
    }

    /// Reserve the next ticket before starting a build.
    pub fn begin_refresh(&self) -> RefreshTicket {
        RefreshTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Publish a finished build if its ticket is newer than the live one.
    pub fn publish(&self, ticket: RefreshTicket, snapshot: Snapshot) -> RefreshOutcome {
        let mut published = self.published.write();
        if ticket.0 <= published.ticket {
            log::info!(
                "Discarding snapshot build #{} (generation {} is already live)",
                ticket.0,
                published.ticket
            );
            return RefreshOutcome::Superseded {
                ticket: ticket.0,
                current: published.ticket,
            };
        }

        published.snapshot = Arc::new(snapshot.with_generation(ticket.0));
        published.ticket = ticket.0;
        log::info!("Published snapshot generation {}", ticket.0);
        RefreshOutcome::Published {
            generation: ticket.0,
        }
    }

    /// Build and publish in one step. A failed build leaves the live snapshot
    /// untouched and returns the error.
    pub fn refresh<F>(&self, build: F) -> LoadResult<RefreshOutcome>
    where
        F: FnOnce() -> LoadResult<Snapshot>,
    {
        let ticket = self.begin_refresh();
        match build() {
            Ok(snapshot) => Ok(self.publish(ticket, snapshot)),
            Err(e) => {
                log::warn!(
                    "Snapshot build #{} failed, keeping generation {}: {}",
                    ticket.0,
                    self.generation(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Reload every document under `dir`.
    pub fn refresh_from_dir(&self, dir: &Path) -> LoadResult<RefreshOutcome> {
        self.refresh(|| Snapshot::load_dir(dir))
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::empty()
    }
}
