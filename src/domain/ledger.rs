//! Sealed-bid ledger and settlement.
//!
//! The ledger holds the last accepted amount per participant for one
//! round. Amounts never leave the ledger before [`BidLedger::settle`].

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::ParticipantId;
use super::lobby::LobbyRegistry;
use crate::error::AuctionError;

#[derive(Debug, Clone)]
struct LedgerEntry {
    amount: f64,
    /// Processing order of the accepted bid currently in force.
    seq: u64,
    /// Name at submission time, used if the bidder has left by settlement.
    name_at_bid: String,
}

/// Per-round map of participant to last submitted amount.
#[derive(Debug, Default)]
pub struct BidLedger {
    entries: HashMap<ParticipantId, LedgerEntry>,
    next_seq: u64,
}

/// One revealed bid in a settlement.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Bidder's connection id.
    pub participant_id: ParticipantId,
    /// Bidder's display name.
    pub name: String,
    /// Revealed amount.
    pub amount: f64,
}

/// Outcome of settling a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// Offers sorted by amount, highest first, ties by earliest bid.
    pub offers: Vec<Offer>,
    /// The head of `offers`, or `None` for a round with no bids.
    pub winner: Option<Offer>,
}

impl BidLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `amount` for `id`, overwriting any earlier bid.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::InvalidAmount`] if `amount` is not a finite,
    /// non-negative number.
    pub fn record(
        &mut self,
        id: ParticipantId,
        name: &str,
        amount: f64,
    ) -> Result<(), AuctionError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AuctionError::InvalidAmount(amount));
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.entries.insert(
            id,
            LedgerEntry {
                amount,
                seq,
                name_at_bid: name.to_string(),
            },
        );
        Ok(())
    }

    /// Drops the entry for `id`. Returns `true` if one existed.
    pub fn withdraw(&mut self, id: ParticipantId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Returns the ids that have bid, in bid processing order.
    #[must_use]
    pub fn bidders(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.entries.iter().map(|(id, e)| (e.seq, *id)).collect();
        ids.sort_unstable_by_key(|(seq, _)| *seq);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Reveals and ranks all bids.
    ///
    /// Names are resolved against `lobby`; bidders who have since left
    /// keep the name they had when they bid.
    #[must_use]
    pub fn settle(self, lobby: &LobbyRegistry) -> Settlement {
        let mut ranked: Vec<(u64, Offer)> = self
            .entries
            .into_iter()
            .map(|(id, entry)| {
                let name = lobby
                    .name_of(id)
                    .map_or(entry.name_at_bid, str::to_string);
                (
                    entry.seq,
                    Offer {
                        participant_id: id,
                        name,
                        amount: entry.amount,
                    },
                )
            })
            .collect();

        ranked.sort_by(|(seq_a, a), (seq_b, b)| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| seq_a.cmp(seq_b))
        });

        let offers: Vec<Offer> = ranked.into_iter().map(|(_, offer)| offer).collect();
        let winner = offers.first().cloned();
        Settlement { offers, winner }
    }
}
