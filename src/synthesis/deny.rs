//! Deny variable slugs.
//!
//! Whitelisted locations get a `geo` variable whose name must stay short
//! (nginx hashes variable names into a fixed-size bucket), so each label is
//! mapped to a random slug instead of being embedded verbatim.

use std::sync::{Arc, Mutex};

use dashmap::{DashMap, DashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::observability::metrics;

const SLUG_LEN: usize = 32;
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Append-only label → slug map shared by every render of a session.
#[derive(Clone)]
pub struct DenySlugCache {
    slugs: Arc<DashMap<String, String>>,
    taken: Arc<DashSet<String>>,
    rng: Arc<Mutex<StdRng>>,
}

impl DenySlugCache {
    /// Create a cache seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a cache whose slugs are reproducible for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            slugs: Arc::new(DashMap::new()),
            taken: Arc::new(DashSet::new()),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// The `$deny_<slug>` variable for `label`, minting the slug on first use.
    pub fn variable(&self, label: &str) -> String {
        format!("$deny_{}", self.slug(label))
    }

    /// Slug for `label`. The entry lock makes check-and-insert atomic, so
    /// concurrent callers always agree on one slug. No two labels share a slug.
    pub fn slug(&self, label: &str) -> String {
        if let Some(slug) = self.slugs.get(label) {
            return slug.value().clone();
        }

        self.slugs
            .entry(label.to_string())
            .or_insert_with(|| {
                metrics::record_deny_slug_minted();
                self.mint()
            })
            .value()
            .clone()
    }

    /// Number of labels seen so far.
    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    /// Draw slugs until one is not already taken.
    fn mint(&self) -> String {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            let slug: String = (0..SLUG_LEN)
                .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
                .collect();
            if self.taken.insert(slug.clone()) {
                return slug;
            }
            tracing::warn!(slug = %slug, "Deny slug collision; drawing again");
        }
    }
}

impl Default for DenySlugCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DenySlugCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenySlugCache")
            .field("labels", &self.slugs.len())
            .finish()
    }
}
