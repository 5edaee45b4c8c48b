//! Shared server state
//!
//! One `ServerContext` per process, handed to every connection handler
//! through an `Arc`. Holds the active category flag, the cycle table,
//! the catalog, counters and the shutdown coordinator.

use crate::core::{Category, ContentStore, CycleTable};
use crate::infrastructure::metrics::ServerMetrics;
use crate::server::shutdown::ShutdownCoordinator;
use crate::server::Role;
use std::sync::atomic::{AtomicU8, Ordering};

pub struct ServerContext {
    role: Role,
    /// `Category` as its discriminant; toggled with xor
    mode: AtomicU8,
    store: ContentStore,
    cycles: CycleTable,
    metrics: ServerMetrics,
    shutdown: ShutdownCoordinator,
}

impl ServerContext {
    pub fn new(role: Role, cycles: CycleTable) -> Self {
        Self {
            role,
            mode: AtomicU8::new(Category::default() as u8),
            store: ContentStore::new(),
            cycles,
            metrics: ServerMetrics::new(),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Category used by content requests arriving now
    #[inline]
    pub fn active_category(&self) -> Category {
        Category::from_raw(self.mode.load(Ordering::Acquire))
    }

    /// Flip between jokes and proverbs, returning the new category
    pub fn toggle_category(&self) -> Category {
        let previous = self.mode.fetch_xor(1, Ordering::AcqRel);
        Category::from_raw(previous).toggled()
    }

    pub fn set_active_category(&self, category: Category) {
        self.mode.store(category as u8, Ordering::Release);
    }

    /// Apply the role's marker to an outgoing line
    pub fn decorate(&self, line: &str) -> String {
        match self.role.marker() {
            Some(marker) => format!("{} {}", marker, line),
            None => line.to_string(),
        }
    }

    #[inline]
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    #[inline]
    pub fn cycles(&self) -> &CycleTable {
        &self.cycles
    }

    #[inline]
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    #[inline]
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("role", &self.role)
            .field("mode", &self.active_category())
            .field("cycles", &self.cycles)
            .field("phase", &self.shutdown.phase())
            .finish()
    }
}
