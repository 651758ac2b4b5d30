//! Request tokens for discarding stale responses.
//!
//! Each logical slot has a monotonically increasing sequence. Issuing a
//! request bumps the sequence; a response is applied only if its token is
//! still the latest issued for its slot. Responses therefore apply in
//! completion order, but an older one never overwrites a newer one.

/// Logical request slot. Requests in the same slot supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Source image upload.
    Upload,
    /// Anything that produces the rendered result (process, reprocess,
    /// rotate).
    Render,
}

impl Slot {
    const COUNT: usize = 2;

    const fn index(self) -> usize {
        match self {
            Self::Upload => 0,
            Self::Render => 1,
        }
    }
}

/// Identity of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    slot: Slot,
    seq: u64,
}

impl RequestToken {
    /// Slot the request belongs to.
    #[must_use]
    pub const fn slot(self) -> Slot {
        self.slot
    }

    /// Sequence number within the slot.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotState {
    latest: u64,
    in_flight: bool,
}

/// Latest issued token and busy flag per slot.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    slots: [SlotState; Slot::COUNT],
}

impl TokenLedger {
    /// A ledger with nothing issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token for `slot`, superseding any outstanding one.
    pub const fn issue(&mut self, slot: Slot) -> RequestToken {
        let state = &mut self.slots[slot.index()];
        state.latest += 1;
        state.in_flight = true;
        RequestToken {
            slot,
            seq: state.latest,
        }
    }

    /// Whether `token` is the latest issued for its slot.
    #[must_use]
    pub const fn is_current(&self, token: RequestToken) -> bool {
        self.slots[token.slot.index()].latest == token.seq
    }

    /// Mark `token`'s response as received.
    ///
    /// Returns `true` if the response should be applied. A stale token
    /// returns `false` and leaves the slot untouched.
    pub fn settle(&mut self, token: RequestToken) -> bool {
        if !self.is_current(token) {
            log::debug!(
                "discarding stale {:?} response #{} (latest #{})",
                token.slot,
                token.seq,
                self.slots[token.slot.index()].latest
            );
            return false;
        }
        self.slots[token.slot.index()].in_flight = false;
        true
    }

    /// Whether the latest request in `slot` has not yet settled.
    #[must_use]
    pub const fn is_busy(&self, slot: Slot) -> bool {
        self.slots[slot.index()].in_flight
    }

    /// Make every outstanding token in `slot` stale.
    pub const fn invalidate(&mut self, slot: Slot) {
        let state = &mut self.slots[slot.index()];
        state.latest += 1;
        state.in_flight = false;
    }

    /// Make every outstanding token stale.
    pub const fn invalidate_all(&mut self) {
        self.invalidate(Slot::Upload);
        self.invalidate(Slot::Render);
    }
}
