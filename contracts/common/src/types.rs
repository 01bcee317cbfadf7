//! Core Types for Glue Protocol
//!
//! Fundamental data structures shared by the ledger, the engine and its
//! extension points.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::domains;

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for asset class identifiers.
///
/// An asset class id doubles as the address holding the class's reserves.
pub type AssetClassId = [u8; 32];

/// Identifier of a single non-fungible sticky token
pub type TokenId = u64;

// ============ Asset Class Types ============

/// Token standard wrapped by an asset class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AssetKind {
    /// Divisible token; unglue burns an amount
    Fungible,
    /// Non-fungible token; unglue burns a set of token ids, one unit each
    NonFungible,
}

/// What a redeemer burns in one unglue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum RedeemAmount {
    /// Amount of a fungible sticky asset
    Units(u64),
    /// Specific non-fungible token ids
    TokenIds(Vec<TokenId>),
}

impl RedeemAmount {
    /// Number of supply units this redemption burns
    pub fn units(&self) -> u64 {
        match self {
            Self::Units(amount) => *amount,
            Self::TokenIds(ids) => ids.len() as u64,
        }
    }
}

/// One entry of a batch unglue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BatchEntry {
    /// Asset class to redeem from
    pub asset_class: AssetClassId,
    /// What to burn
    pub amount: RedeemAmount,
}

impl BatchEntry {
    pub fn units(asset_class: AssetClassId, amount: u64) -> Self {
        Self { asset_class, amount: RedeemAmount::Units(amount) }
    }

    pub fn tokens(asset_class: AssetClassId, ids: Vec<TokenId>) -> Self {
        Self { asset_class, amount: RedeemAmount::TokenIds(ids) }
    }
}

/// Amount of one reserve token paid out by an unglue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Payout {
    /// Reserve token
    pub token: Address,
    /// Amount transferred to the recipient (may be zero when skipped)
    pub amount: u64,
}

// ============ Hook Types ============

/// Checkpoint at which an external callback runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum HookStage {
    BeforeGlue,
    AfterGlue,
    BeforeUnglue,
    AfterUnglue,
    /// Borrower callback of a flash loan
    LoanCallback,
}

// ============ Helper Functions ============

/// Generate a deterministic asset class id
pub fn derive_asset_class_id(owner: &Address, nonce: u64) -> AssetClassId {
    let mut hasher = Sha256::new();
    hasher.update(domains::ASSET_CLASS);
    hasher.update(owner);
    hasher.update(nonce.to_le_bytes());
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}
