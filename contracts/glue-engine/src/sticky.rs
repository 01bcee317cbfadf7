//! Sticky Supply
//!
//! The wrapped token of an asset class, reduced to what the engine needs:
//! a total supply, holder balances, mint and burn. Transfer and approval
//! bookkeeping of the token standards lives outside the engine.

use std::collections::{BTreeMap, BTreeSet};

use glue_common::{
    errors::AmountErrorReason, Address, AssetKind, GlueError, GlueResult, RedeemAmount, TokenId,
};

#[derive(Debug, Clone)]
pub enum StickySupply {
    Fungible {
        balances: BTreeMap<Address, u64>,
        total_supply: u64,
    },
    NonFungible {
        owners: BTreeMap<TokenId, Address>,
    },
}

impl StickySupply {
    pub fn new(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Fungible => Self::Fungible {
                balances: BTreeMap::new(),
                total_supply: 0,
            },
            AssetKind::NonFungible => Self::NonFungible { owners: BTreeMap::new() },
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Fungible { .. } => AssetKind::Fungible,
            Self::NonFungible { .. } => AssetKind::NonFungible,
        }
    }

    pub fn total_supply(&self) -> u64 {
        match self {
            Self::Fungible { total_supply, .. } => *total_supply,
            Self::NonFungible { owners } => owners.len() as u64,
        }
    }

    /// Units held by `holder` (token count for non-fungible classes)
    pub fn balance_of(&self, holder: &Address) -> u64 {
        match self {
            Self::Fungible { balances, .. } => balances.get(holder).copied().unwrap_or(0),
            Self::NonFungible { owners } => {
                owners.values().filter(|owner| *owner == holder).count() as u64
            }
        }
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<&Address> {
        match self {
            Self::Fungible { .. } => None,
            Self::NonFungible { owners } => owners.get(&token_id),
        }
    }

    /// Mint fungible units; returns the new total supply
    pub fn mint(&mut self, to: &Address, amount: u64) -> GlueResult<u64> {
        let Self::Fungible { balances, total_supply } = self else {
            return Err(GlueError::WrongAssetKind);
        };
        if amount == 0 {
            return Err(GlueError::InvalidAmount { amount, reason: AmountErrorReason::Zero });
        }

        let new_supply = total_supply.checked_add(amount).ok_or(GlueError::Overflow)?;
        let balance = balances.entry(*to).or_insert(0);
        // Cannot overflow: balance <= total_supply
        *balance += amount;
        *total_supply = new_supply;
        Ok(new_supply)
    }

    /// Mint one non-fungible token; returns the new total supply
    pub fn mint_token(&mut self, to: &Address, token_id: TokenId) -> GlueResult<u64> {
        let Self::NonFungible { owners } = self else {
            return Err(GlueError::WrongAssetKind);
        };
        if owners.contains_key(&token_id) {
            return Err(GlueError::TokenExists { token_id });
        }
        owners.insert(token_id, *to);
        Ok(owners.len() as u64)
    }

    /// Check that `holder` can burn `amount` without mutating anything
    pub fn check_burn(&self, holder: &Address, amount: &RedeemAmount) -> GlueResult<()> {
        match (self, amount) {
            (Self::Fungible { balances, .. }, RedeemAmount::Units(units)) => {
                if *units == 0 {
                    return Err(GlueError::InvalidAmount {
                        amount: 0,
                        reason: AmountErrorReason::Zero,
                    });
                }
                let available = balances.get(holder).copied().unwrap_or(0);
                if available < *units {
                    return Err(GlueError::InsufficientBalance { available, requested: *units });
                }
                Ok(())
            }
            (Self::NonFungible { owners }, RedeemAmount::TokenIds(ids)) => {
                if ids.is_empty() {
                    return Err(GlueError::InvalidAmount {
                        amount: 0,
                        reason: AmountErrorReason::Zero,
                    });
                }
                let mut seen = BTreeSet::new();
                for id in ids {
                    if !seen.insert(*id) {
                        return Err(GlueError::DuplicateEntry { id: token_id_key(*id) });
                    }
                    if owners.get(id) != Some(holder) {
                        return Err(GlueError::NotTokenOwner { token_id: *id });
                    }
                }
                Ok(())
            }
            _ => Err(GlueError::WrongAssetKind),
        }
    }

    /// Burn after `check_burn`; returns the new total supply
    pub fn burn(&mut self, holder: &Address, amount: &RedeemAmount) -> GlueResult<u64> {
        self.check_burn(holder, amount)?;
        match (self, amount) {
            (Self::Fungible { balances, total_supply }, RedeemAmount::Units(units)) => {
                let balance = balances.entry(*holder).or_insert(0);
                *balance -= *units;
                if *balance == 0 {
                    balances.remove(holder);
                }
                *total_supply -= *units;
                Ok(*total_supply)
            }
            (Self::NonFungible { owners }, RedeemAmount::TokenIds(ids)) => {
                for id in ids {
                    owners.remove(id);
                }
                Ok(owners.len() as u64)
            }
            _ => Err(GlueError::WrongAssetKind),
        }
    }
}

/// Widen a token id to the 32-byte key carried by `DuplicateEntry`
pub fn token_id_key(token_id: TokenId) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[24..].copy_from_slice(&token_id.to_be_bytes());
    key
}
