//! Reserve Ledger
//!
//! Per-asset-class record of the reserve tokens a class tracks and the
//! balance it tracks for each. This is the only persisted state of the
//! engine: an ordered list of `(token, balance)` pairs.
//!
//! The ledger never moves tokens itself. Callers pair every `credit` /
//! `debit` with the matching transfer inside one atomic operation,
//! validating first, then mutating the ledger, then transferring.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{GlueError, GlueResult};
use crate::types::Address;

/// Tracked balance of one reserve token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ReserveEntry {
    /// Reserve token address
    pub token: Address,
    /// Tracked amount
    pub balance: u64,
}

/// Reserve balances of one asset class, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(try_from = "StoredLedger")]
pub struct ReserveLedger {
    reserves: Vec<ReserveEntry>,
}

/// Serde form of a ledger, checked before it becomes a `ReserveLedger`
#[derive(Deserialize)]
struct StoredLedger {
    reserves: Vec<ReserveEntry>,
}

impl TryFrom<StoredLedger> for ReserveLedger {
    type Error = GlueError;

    fn try_from(stored: StoredLedger) -> GlueResult<Self> {
        ensure_unique(&stored.reserves)?;
        Ok(Self { reserves: stored.reserves })
    }
}

/// A repeated token would double-count payouts
fn ensure_unique(reserves: &[ReserveEntry]) -> GlueResult<()> {
    for (index, entry) in reserves.iter().enumerate() {
        if reserves[..index].iter().any(|r| r.token == entry.token) {
            return Err(GlueError::DuplicateReserve { token: entry.token });
        }
    }
    Ok(())
}

impl ReserveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a reserve token with a zero balance
    pub fn register(&mut self, token: Address) -> GlueResult<()> {
        if self.is_registered(&token) {
            return Err(GlueError::DuplicateReserve { token });
        }
        self.reserves.push(ReserveEntry { token, balance: 0 });
        Ok(())
    }

    pub fn is_registered(&self, token: &Address) -> bool {
        self.reserves.iter().any(|r| &r.token == token)
    }

    /// Tracked amount of `token`; zero when not registered
    pub fn balance_of(&self, token: &Address) -> u64 {
        self.reserves
            .iter()
            .find(|r| &r.token == token)
            .map(|r| r.balance)
            .unwrap_or(0)
    }

    /// Increase the tracked balance of a registered reserve
    pub fn credit(&mut self, token: &Address, amount: u64) -> GlueResult<u64> {
        let entry = self.entry_mut(token)?;
        entry.balance = entry.balance.checked_add(amount).ok_or(GlueError::Overflow)?;
        Ok(entry.balance)
    }

    /// Decrease the tracked balance of a registered reserve
    pub fn debit(&mut self, token: &Address, amount: u64) -> GlueResult<u64> {
        let entry = self.entry_mut(token)?;
        entry.balance = entry
            .balance
            .checked_sub(amount)
            .ok_or(GlueError::InsufficientReserve {
                token: *token,
                available: entry.balance,
                requested: amount,
            })?;
        Ok(entry.balance)
    }

    /// All registered reserves in registration order
    pub fn entries(&self) -> &[ReserveEntry] {
        &self.reserves
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Address> {
        self.reserves.iter().map(|r| &r.token)
    }

    pub fn len(&self) -> usize {
        self.reserves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty()
    }

    /// Serialize the ledger for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Restore a ledger from storage
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let ledger: Self = borsh::from_slice(bytes).ok()?;
        ensure_unique(&ledger.reserves).ok()?;
        Some(ledger)
    }

    fn entry_mut(&mut self, token: &Address) -> GlueResult<&mut ReserveEntry> {
        self.reserves
            .iter_mut()
            .find(|r| &r.token == token)
            .ok_or(GlueError::ReserveNotRegistered { token: *token })
    }
}
