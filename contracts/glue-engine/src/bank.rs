//! Token Bank
//!
//! Holdings of external reserve tokens, keyed by `(token, holder)`.
//! An asset class holds its reserves at its own id. The ledger tracks what
//! the engine has accounted for; the bank is what is actually held, and
//! the gap between the two is untracked slack.

use std::collections::BTreeMap;

use glue_common::{Address, GlueError, GlueResult};

#[derive(Debug, Clone, Default)]
pub struct TokenBank {
    balances: BTreeMap<(Address, Address), u64>,
}

impl TokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> u64 {
        self.balances.get(&(*token, *holder)).copied().unwrap_or(0)
    }

    /// Create tokens out of thin air (issuer side of an external token)
    pub fn mint(&mut self, token: &Address, to: &Address, amount: u64) -> GlueResult<()> {
        let balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(GlueError::Overflow)?;
        self.set(token, to, balance);
        Ok(())
    }

    /// Move tokens between holders
    pub fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> GlueResult<()> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(GlueError::InsufficientBalance { available, requested: amount });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let received = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(GlueError::Overflow)?;

        self.set(token, from, available - amount);
        self.set(token, to, received);
        Ok(())
    }

    fn set(&mut self, token: &Address, holder: &Address, amount: u64) {
        if amount == 0 {
            self.balances.remove(&(*token, *holder));
        } else {
            self.balances.insert((*token, *holder), amount);
        }
    }
}
