//! Flash Loans
//!
//! Lends tracked reserves within one operation. The borrower's receiver is
//! called with the engine itself, so it can act on the funds and must put
//! principal plus fee back before it returns.
//!
//! ## Guarding
//!
//! A loan holds the guard of every class it draws from until repayment is
//! verified. From inside the callback, unglue, glue, register or another
//! loan on those classes fails with `ReentrantCall`; other classes remain
//! usable.
//!
//! ## Fees
//!
//! `fee = ceil(principal * flash_fee_bps / 10_000)` per leg, so the
//! protocol never under-collects.

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use glue_common::{
    fee_from_bps, safe_add, Address, AssetClassId, GlueError, GlueEvent, GlueResult, HookStage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{require_nonzero, Glue};

// ============ Loan Types ============

/// Portion of a loan drawn from one asset class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LoanLeg {
    pub asset_class: AssetClassId,
    pub principal: u64,
    pub fee: u64,
    /// Held balance of the class before the principal left
    pub pre_loan_balance: u64,
}

impl LoanLeg {
    /// Amount the class must get back
    pub fn repayment(&self) -> GlueResult<u64> {
        safe_add(self.principal, self.fee)
    }
}

fn sum_legs(legs: &[LoanLeg], field: impl Fn(&LoanLeg) -> u64) -> u64 {
    legs.iter().fold(0u64, |sum, leg| sum.saturating_add(field(leg)))
}

/// Verified loan, returned once repayment has been checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LoanReceipt {
    pub borrower: Address,
    pub token: Address,
    pub legs: Vec<LoanLeg>,
}

impl LoanReceipt {
    pub fn total_principal(&self) -> u64 {
        sum_legs(&self.legs, |leg| leg.principal)
    }

    pub fn total_fee(&self) -> u64 {
        sum_legs(&self.legs, |leg| leg.fee)
    }
}

/// What the receiver is told about an outstanding loan
#[derive(Debug, Clone, Copy)]
pub struct LoanCallback<'a> {
    pub borrower: Address,
    pub token: Address,
    pub legs: &'a [LoanLeg],
    /// Opaque payload forwarded from the borrower
    pub data: &'a [u8],
}

impl LoanCallback<'_> {
    /// Total principal lent
    pub fn amount(&self) -> u64 {
        sum_legs(self.legs, |leg| leg.principal)
    }

    /// Total fee owed
    pub fn fee(&self) -> u64 {
        sum_legs(self.legs, |leg| leg.fee)
    }
}

/// Borrower-side callback of a flash loan
///
/// Returning an error aborts the loan and the whole enclosing operation.
pub trait GluedLoanReceiver {
    fn on_glued_loan(&mut self, glue: &mut Glue, loan: &LoanCallback<'_>) -> GlueResult<()>;
}

impl<F> GluedLoanReceiver for F
where
    F: FnMut(&mut Glue, &LoanCallback<'_>) -> GlueResult<()>,
{
    fn on_glued_loan(&mut self, glue: &mut Glue, loan: &LoanCallback<'_>) -> GlueResult<()> {
        self(glue, loan)
    }
}

// ============ Loan Operations ============

impl Glue {
    /// Fee charged on a loan of `amount`
    pub fn flash_fee(&self, amount: u64) -> GlueResult<u64> {
        fee_from_bps(amount, self.config().flash_fee_bps)
    }

    /// Largest loan of `token` the class can make right now
    pub fn max_flash_loan(&self, asset_class: &AssetClassId, token: &Address) -> GlueResult<u64> {
        let class = self.class(asset_class)?;
        if class.is_guarded() {
            return Ok(0);
        }
        Ok(class.ledger.balance_of(token))
    }

    /// Lend `amount` of `token` from one asset class
    pub fn flash_loan(
        &mut self,
        asset_class: &AssetClassId,
        borrower: Address,
        receiver: &mut dyn GluedLoanReceiver,
        token: Address,
        amount: u64,
        data: &[u8],
    ) -> GlueResult<LoanReceipt> {
        self.atomic("flash_loan", |g| {
            g.guarded(&[*asset_class], |g| {
                require_nonzero(amount)?;
                let ledger = &g.class(asset_class)?.ledger;
                if !ledger.is_registered(&token) {
                    return Err(GlueError::ReserveNotRegistered { token });
                }
                let available = ledger.balance_of(&token);
                if amount > available {
                    return Err(GlueError::InsufficientReserve { token, available, requested: amount });
                }

                let leg = LoanLeg {
                    asset_class: *asset_class,
                    principal: amount,
                    fee: g.flash_fee(amount)?,
                    pre_loan_balance: 0,
                };
                execute_loan(g, borrower, receiver, token, vec![leg], data)
            })
        })
    }

    /// Lend `amount` of `token` drawn from several classes in order
    ///
    /// Each class lends as much as it tracks until `amount` is covered. One
    /// callback covers every leg; each leg is charged and verified on its own.
    pub fn glued_loan(
        &mut self,
        borrower: Address,
        receiver: &mut dyn GluedLoanReceiver,
        classes: &[AssetClassId],
        token: Address,
        amount: u64,
        data: &[u8],
    ) -> GlueResult<LoanReceipt> {
        require_nonzero(amount)?;
        let mut seen = BTreeSet::new();
        for asset_class in classes {
            if !seen.insert(*asset_class) {
                return Err(GlueError::DuplicateEntry { id: *asset_class });
            }
        }

        self.atomic("glued_loan", |g| {
            g.guarded(classes, |g| {
                let mut legs = Vec::new();
                let mut remaining = amount;
                let mut available: u64 = 0;
                for asset_class in classes {
                    if remaining == 0 {
                        break;
                    }
                    let tracked = g.class(asset_class)?.ledger.balance_of(&token);
                    available = available.saturating_add(tracked);
                    let principal = tracked.min(remaining);
                    if principal == 0 {
                        continue;
                    }
                    remaining -= principal;
                    legs.push(LoanLeg {
                        asset_class: *asset_class,
                        principal,
                        fee: g.flash_fee(principal)?,
                        pre_loan_balance: 0,
                    });
                }
                if remaining > 0 {
                    return Err(GlueError::InsufficientReserve { token, available, requested: amount });
                }

                execute_loan(g, borrower, receiver, token, legs, data)
            })
        })
    }
}

/// Lend, call back, verify; the caller holds the guard of every leg
fn execute_loan(
    glue: &mut Glue,
    borrower: Address,
    receiver: &mut dyn GluedLoanReceiver,
    token: Address,
    mut legs: Vec<LoanLeg>,
    data: &[u8],
) -> GlueResult<LoanReceipt> {
    // 1. Record pre-loan holdings and send the principal
    for leg in legs.iter_mut() {
        leg.pre_loan_balance = glue.bank().balance_of(&token, &leg.asset_class);
        glue.pay_reserve(&leg.asset_class, &token, &borrower, leg.principal)?;
        debug!(principal = leg.principal, fee = leg.fee, "loan leg issued");
    }

    // 2. Hand control to the borrower
    let callback = LoanCallback { borrower, token, legs: &legs, data };
    receiver
        .on_glued_loan(glue, &callback)
        .map_err(|cause| GlueError::HookAborted {
            stage: HookStage::LoanCallback,
            cause: Box::new(cause),
        })?;

    // 3. Verify each class got principal plus fee back, then book it
    for leg in &legs {
        let expected = safe_add(leg.pre_loan_balance, leg.fee)?;
        let actual = glue.bank().balance_of(&token, &leg.asset_class);
        if actual < expected {
            return Err(GlueError::LoanNotRepaid { token, expected, actual });
        }

        glue.class_mut(&leg.asset_class)?.ledger.credit(&token, leg.repayment()?)?;
        glue.verify_backing(&leg.asset_class)?;
        glue.emit(GlueEvent::FlashLoan {
            asset_class: leg.asset_class,
            borrower,
            token,
            amount: leg.principal,
            fee: leg.fee,
        });
    }

    let receipt = LoanReceipt { borrower, token, legs };
    info!(
        principal = receipt.total_principal(),
        fee = receipt.total_fee(),
        legs = receipt.legs.len(),
        "flash loan repaid"
    );
    Ok(receipt)
}
