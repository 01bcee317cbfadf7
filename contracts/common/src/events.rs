//! Protocol Events for Glue
//!
//! Events are emitted during engine execution and can be indexed
//! off-chain. The log is part of the engine state, so an operation that
//! fails leaves no events behind.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, AssetClassId, AssetKind, Payout};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Asset Class Events (0x01 - 0x1F)
    AssetClassCreated = 0x01,
    ReserveRegistered = 0x02,
    HooksConfigured = 0x03,
    StickyMinted = 0x04,

    // Reserve Events (0x20 - 0x3F)
    Glued = 0x20,
    ReserveSynced = 0x21,

    // Redemption Events (0x40 - 0x5F)
    Unglued = 0x40,
    BatchUnglued = 0x41,

    // Loan Events (0x60 - 0x7F)
    FlashLoan = 0x60,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum GlueEvent {
    // ============ Asset Class Events ============

    /// Emitted when a sticky asset family is created
    AssetClassCreated {
        asset_class: AssetClassId,
        owner: Address,
        kind: AssetKind,
    },

    /// Emitted when a reserve token starts being tracked
    ReserveRegistered {
        asset_class: AssetClassId,
        token: Address,
    },

    /// Emitted when the owner installs hooks
    HooksConfigured {
        asset_class: AssetClassId,
        owner: Address,
    },

    /// Emitted when sticky tokens are minted
    StickyMinted {
        asset_class: AssetClassId,
        to: Address,
        amount: u64,
        new_total_supply: u64,
    },

    // ============ Reserve Events ============

    /// Emitted when reserves are deposited
    Glued {
        asset_class: AssetClassId,
        depositor: Address,
        token: Address,
        amount: u64,
        new_reserve: u64,
    },

    /// Emitted when untracked holdings are absorbed into the ledger
    ReserveSynced {
        asset_class: AssetClassId,
        token: Address,
        absorbed: u64,
        new_reserve: u64,
    },

    // ============ Redemption Events ============

    /// Emitted for every completed redemption
    Unglued {
        asset_class: AssetClassId,
        redeemer: Address,
        recipient: Address,
        burned: u64,
        supply_before: u64,
        payouts: Vec<Payout>,
    },

    /// Emitted once a batch has fully executed
    BatchUnglued {
        redeemer: Address,
        recipient: Address,
        entries: u32,
    },

    // ============ Loan Events ============

    /// Emitted per repaid loan leg
    FlashLoan {
        asset_class: AssetClassId,
        borrower: Address,
        token: Address,
        amount: u64,
        fee: u64,
    },
}

impl GlueEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::AssetClassCreated { .. } => EventType::AssetClassCreated,
            Self::ReserveRegistered { .. } => EventType::ReserveRegistered,
            Self::HooksConfigured { .. } => EventType::HooksConfigured,
            Self::StickyMinted { .. } => EventType::StickyMinted,
            Self::Glued { .. } => EventType::Glued,
            Self::ReserveSynced { .. } => EventType::ReserveSynced,
            Self::Unglued { .. } => EventType::Unglued,
            Self::BatchUnglued { .. } => EventType::BatchUnglued,
            Self::FlashLoan { .. } => EventType::FlashLoan,
        }
    }

    /// Asset class the event concerns, if it concerns exactly one
    pub fn asset_class(&self) -> Option<&AssetClassId> {
        match self {
            Self::AssetClassCreated { asset_class, .. }
            | Self::ReserveRegistered { asset_class, .. }
            | Self::HooksConfigured { asset_class, .. }
            | Self::StickyMinted { asset_class, .. }
            | Self::Glued { asset_class, .. }
            | Self::ReserveSynced { asset_class, .. }
            | Self::Unglued { asset_class, .. }
            | Self::FlashLoan { asset_class, .. } => Some(asset_class),
            Self::BatchUnglued { .. } => None,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting multiple events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<GlueEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: GlueEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[GlueEvent] {
        &self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&GlueEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = GlueEvent::Glued {
            asset_class: [1u8; 32],
            depositor: [2u8; 32],
            token: [3u8; 32],
            amount: 1_000,
            new_reserve: 1_000,
        };

        assert_eq!(event.event_type(), EventType::Glued);
        assert_eq!(event.asset_class(), Some(&[1u8; 32]));
    }

    #[test]
    fn test_event_serialization() {
        let event = GlueEvent::Unglued {
            asset_class: [1u8; 32],
            redeemer: [2u8; 32],
            recipient: [2u8; 32],
            burned: 25,
            supply_before: 100,
            payouts: vec![Payout { token: [9u8; 32], amount: 250 }],
        };

        let restored = GlueEvent::from_bytes(&event.to_bytes()).unwrap();
        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();

        log.emit(GlueEvent::ReserveRegistered {
            asset_class: [1u8; 32],
            token: [3u8; 32],
        });
        log.emit(GlueEvent::BatchUnglued {
            redeemer: [2u8; 32],
            recipient: [2u8; 32],
            entries: 2,
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_by_type(EventType::BatchUnglued).len(), 1);
    }
}
