//! Shared helpers for unit and end-to-end tests.

use std::cell::Cell;

use tracing_subscriber::EnvFilter;

use crate::store::MemoryStore;
use crate::time::Clock;
use crate::types::{Term, Triple};

/// A simulated clock for deterministic timeout tests.
///
/// Time only advances when told to.
#[derive(Debug)]
pub struct SimulatedClock {
    current_ms: Cell<u64>,
}

impl SimulatedClock {
    #[must_use]
    pub const fn new(initial_ms: u64) -> Self {
        Self {
            current_ms: Cell::new(initial_ms),
        }
    }

    /// Advance time by the given number of milliseconds (saturating).
    pub fn advance(&self, ms: u64) {
        self.current_ms.set(self.current_ms.get().saturating_add(ms));
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.get()
    }
}

/// Install a test subscriber so engine logs show up under `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "engine=warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Shorthand for an IRI term in tests.
#[must_use]
pub fn iri(name: &str) -> Term {
    Term::iri(format!("http://example.org/{name}"))
}

/// Build a triple of example IRIs.
#[must_use]
pub fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(iri(s), iri(p), iri(o))
}

/// Build a store of example IRI triples.
#[must_use]
pub fn store_of(triples: &[(&str, &str, &str)]) -> MemoryStore {
    triples
        .iter()
        .map(|(s, p, o)| triple(s, p, o))
        .collect()
}
