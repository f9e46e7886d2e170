//! In-memory credit ledger.
//!
//! One [`CreditRecord`] per payment channel, reachable through two sharded
//! indices: channel id and bearer token. Both indices hold the same `Arc`, so
//! there is a single set of counters per channel. Counters sit behind a
//! per-record mutex; records for different channels never contend.
//!
//! Nothing is persisted. A restart forgets every record and every issued token;
//! clients recover by resubmitting a voucher.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::credits::Credits;
use crate::token::generate_bearer_token;

#[derive(Debug, Clone, Copy)]
struct Counters {
    total: Credits,
    used: Credits,
}

struct CreditRecord {
    channel_id: String,
    token: String,
    counters: Mutex<Counters>,
}

impl CreditRecord {
    fn counters(&self) -> MutexGuard<'_, Counters> {
        match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Counters are two plain integers, always left consistent
                tracing::error!(channel = %self.channel_id, "credit record mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn snapshot_of(&self, counters: &Counters) -> CreditSnapshot {
        CreditSnapshot {
            token: self.token.clone(),
            channel_id: self.channel_id.clone(),
            total: counters.total,
            used: counters.used,
            remaining: counters.total.saturating_sub(counters.used),
        }
    }

    fn snapshot(&self) -> CreditSnapshot {
        let counters = *self.counters();
        self.snapshot_of(&counters)
    }
}

/// Point-in-time view of one channel's credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSnapshot {
    pub token: String,
    pub channel_id: String,
    pub total: Credits,
    pub used: Credits,
    pub remaining: Credits,
}

/// Result of [`TokenLedger::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert {
    pub snapshot: CreditSnapshot,
    /// `true` when this call created the record and issued its token.
    pub created: bool,
}

/// Result of [`TokenLedger::consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Credit was spent; snapshot is after the spend.
    Consumed(CreditSnapshot),
    /// No record for this bearer token.
    NotFound,
    /// Not enough credit left; nothing was spent.
    Exhausted(CreditSnapshot),
}

#[derive(Default)]
pub struct TokenLedger {
    by_channel: DashMap<String, Arc<CreditRecord>>,
    by_token: DashMap<String, Arc<CreditRecord>>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verified cumulative total for `channel_id`.
    ///
    /// Creates the record (and its bearer token) on first sight. Afterwards the
    /// stored total only moves up: a lower `verified_total` is a stale or
    /// reordered verification and is ignored.
    pub fn upsert(&self, channel_id: &str, verified_total: Credits) -> Upsert {
        let record = match self.by_channel.entry(channel_id.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                // Lock order is always channel shard, then token shard. The channel
                // entry stays locked until both indices point at the new record.
                let record = self.issue_record(channel_id, verified_total);
                entry.insert(Arc::clone(&record));
                tracing::info!(channel = %channel_id, total = %verified_total, "issued bearer token for new channel");
                return Upsert {
                    snapshot: record.snapshot(),
                    created: true,
                };
            }
        };

        let mut counters = record.counters();
        if verified_total > counters.total {
            counters.total = verified_total;
        } else if verified_total < counters.total {
            tracing::debug!(
                channel = %channel_id,
                stored = %counters.total,
                verified = %verified_total,
                "ignoring stale verified total"
            );
        }

        Upsert {
            snapshot: record.snapshot_of(&counters),
            created: false,
        }
    }

    fn issue_record(&self, channel_id: &str, total: Credits) -> Arc<CreditRecord> {
        loop {
            let token = generate_bearer_token();
            if let Entry::Vacant(slot) = self.by_token.entry(token.clone()) {
                let record = Arc::new(CreditRecord {
                    channel_id: channel_id.to_string(),
                    token,
                    counters: Mutex::new(Counters {
                        total,
                        used: Credits::ZERO,
                    }),
                });
                slot.insert(Arc::clone(&record));
                return record;
            }
        }
    }

    /// Atomically spend `amount` credits for `token`.
    ///
    /// Either the full amount is spent or nothing is. Unknown tokens are
    /// reported as [`ConsumeOutcome::NotFound`] and never create a record.
    pub fn consume(&self, token: &str, amount: Credits) -> ConsumeOutcome {
        let Some(record) = self.by_token.get(token).map(|r| Arc::clone(r.value())) else {
            return ConsumeOutcome::NotFound;
        };

        let mut counters = record.counters();
        match counters.used.checked_add(amount) {
            Some(next) if next <= counters.total => {
                counters.used = next;
                ConsumeOutcome::Consumed(record.snapshot_of(&counters))
            }
            _ => ConsumeOutcome::Exhausted(record.snapshot_of(&counters)),
        }
    }

    pub fn get_by_token(&self, token: &str) -> Option<CreditSnapshot> {
        let record = self.by_token.get(token).map(|r| Arc::clone(r.value()))?;
        Some(record.snapshot())
    }

    pub fn get_by_channel(&self, channel_id: &str) -> Option<CreditSnapshot> {
        let record = self
            .by_channel
            .get(channel_id)
            .map(|r| Arc::clone(r.value()))?;
        Some(record.snapshot())
    }

    /// Number of channels with a credit record.
    pub fn len(&self) -> usize {
        self.by_channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty()
    }
}
