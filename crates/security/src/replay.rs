use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::envelope::{EnvelopeError, NONCE_LEN};

/// Nonces accepted within the freshness window.
///
/// Tokens older than the TTL are already rejected as expired, so a nonce
/// only has to be remembered for `ttl_secs` (plus clock skew) after its
/// timestamp.
#[derive(Debug)]
pub struct ReplayWindow {
    ttl_secs: u64,
    seen: HashSet<[u8; NONCE_LEN]>,
    // Earliest expiry on top. Tokens stamped ahead of the clock expire later
    // than ones admitted after them, so admission order is not enough.
    expiries: BinaryHeap<Reverse<(u64, [u8; NONCE_LEN])>>,
}

impl ReplayWindow {
    /// Create an empty window for tokens with the given TTL.
    pub fn new(ttl_secs: u64) -> Self {
        ReplayWindow {
            ttl_secs,
            seen: HashSet::new(),
            expiries: BinaryHeap::new(),
        }
    }

    /// Record a nonce, failing if it was already admitted.
    pub fn admit(
        &mut self,
        nonce: [u8; NONCE_LEN],
        timestamp: u64,
        now: u64,
    ) -> Result<(), EnvelopeError> {
        self.evict(now);
        if !self.seen.insert(nonce) {
            return Err(EnvelopeError::Replayed);
        }
        let expiry = timestamp
            .max(now)
            .saturating_add(self.ttl_secs)
            .saturating_add(crate::envelope::MAX_CLOCK_SKEW_SECS);
        self.expiries.push(Reverse((expiry, nonce)));
        Ok(())
    }

    /// Number of nonces currently remembered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True if no nonce is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn evict(&mut self, now: u64) {
        while let Some(&Reverse((expiry, nonce))) = self.expiries.peek() {
            if expiry >= now {
                break;
            }
            self.expiries.pop();
            self.seen.remove(&nonce);
        }
    }
}
