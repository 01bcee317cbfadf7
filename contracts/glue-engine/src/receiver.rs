//! Repaying Loan Receiver
//!
//! Most borrowers want the same shape: do something with the funds, then
//! hand back principal plus fee to every class that lent. `RepayingReceiver`
//! wraps the first part and performs the second.

use glue_common::GlueResult;
use tracing::trace;

use crate::flash::{GluedLoanReceiver, LoanCallback};
use crate::Glue;

/// Borrower logic run while the loan is outstanding
pub trait LoanLogic {
    fn execute(&mut self, glue: &mut Glue, loan: &LoanCallback<'_>) -> GlueResult<()>;
}

impl<F> LoanLogic for F
where
    F: FnMut(&mut Glue, &LoanCallback<'_>) -> GlueResult<()>,
{
    fn execute(&mut self, glue: &mut Glue, loan: &LoanCallback<'_>) -> GlueResult<()> {
        self(glue, loan)
    }
}

/// Runs `logic`, then returns principal plus fee for every leg
///
/// Repayment is sent from the borrower's own balance, so the logic has to
/// leave at least the fee on top of the principal there.
#[derive(Debug, Clone, Default)]
pub struct RepayingReceiver<L> {
    logic: L,
}

impl<L: LoanLogic> RepayingReceiver<L> {
    pub fn new(logic: L) -> Self {
        Self { logic }
    }

    pub fn into_inner(self) -> L {
        self.logic
    }
}

impl<F> RepayingReceiver<F>
where
    F: FnMut(&mut Glue, &LoanCallback<'_>) -> GlueResult<()>,
{
    /// Build from a closure
    pub fn from_fn(logic: F) -> Self {
        Self { logic }
    }
}

impl<L: LoanLogic> GluedLoanReceiver for RepayingReceiver<L> {
    fn on_glued_loan(&mut self, glue: &mut Glue, loan: &LoanCallback<'_>) -> GlueResult<()> {
        self.logic.execute(glue, loan)?;
        for leg in loan.legs {
            let repayment = leg.repayment()?;
            trace!(repayment, "repaying leg");
            glue.transfer(&loan.token, &loan.borrower, &leg.asset_class, repayment)?;
        }
        Ok(())
    }
}
