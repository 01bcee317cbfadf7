//! Hook Dispatcher
//!
//! Optional extension point invoked around glue and unglue. A hook is a
//! capability object installed once by the class owner. It may re-enter
//! the engine through the `&mut Glue` it receives, and it aborts the
//! triggering operation by returning an error.
//!
//! Hooks only ever return `Ok(())` or an error: they cannot report
//! amounts back to the engine. After every hook call the engine re-reads
//! actual holdings and checks them against the ledger.

use std::fmt;
use std::rc::Rc;

use glue_common::{
    Address, AssetClassId, GlueError, GlueResult, HookStage, Payout, RedeemAmount,
};
use tracing::debug;

use crate::Glue;

/// Arguments passed around a glue (deposit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueHookArgs {
    pub asset_class: AssetClassId,
    pub depositor: Address,
    pub token: Address,
    pub amount: u64,
}

/// Arguments passed around an unglue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnglueHookArgs {
    pub asset_class: AssetClassId,
    pub redeemer: Address,
    pub recipient: Address,
    pub amount: RedeemAmount,
    /// Total supply before the burn
    pub supply_snapshot: u64,
    /// Amounts owed per reserve; already transferred when seen by `after_unglue`
    pub payouts: Vec<Payout>,
}

/// Callbacks a sticky asset author may implement
///
/// Every method defaults to a no-op.
pub trait GluedHooks {
    fn before_glue(&self, glue: &mut Glue, args: &GlueHookArgs) -> GlueResult<()> {
        let _ = (glue, args);
        Ok(())
    }

    fn after_glue(&self, glue: &mut Glue, args: &GlueHookArgs) -> GlueResult<()> {
        let _ = (glue, args);
        Ok(())
    }

    fn before_unglue(&self, glue: &mut Glue, args: &UnglueHookArgs) -> GlueResult<()> {
        let _ = (glue, args);
        Ok(())
    }

    fn after_unglue(&self, glue: &mut Glue, args: &UnglueHookArgs) -> GlueResult<()> {
        let _ = (glue, args);
        Ok(())
    }
}

/// Hook installed on an asset class, if any
#[derive(Clone, Default)]
pub struct HookRegistration(Option<Rc<dyn GluedHooks>>);

impl HookRegistration {
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) fn install(&mut self, hooks: Rc<dyn GluedHooks>) {
        self.0 = Some(hooks);
    }

    fn get(&self) -> Option<Rc<dyn GluedHooks>> {
        self.0.clone()
    }
}

impl fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookRegistration")
            .field(&if self.is_set() { "set" } else { "none" })
            .finish()
    }
}

/// One checkpoint call
pub(crate) enum HookCall<'a> {
    BeforeGlue(&'a GlueHookArgs),
    AfterGlue(&'a GlueHookArgs),
    BeforeUnglue(&'a UnglueHookArgs),
    AfterUnglue(&'a UnglueHookArgs),
}

impl HookCall<'_> {
    fn stage(&self) -> HookStage {
        match self {
            Self::BeforeGlue(_) => HookStage::BeforeGlue,
            Self::AfterGlue(_) => HookStage::AfterGlue,
            Self::BeforeUnglue(_) => HookStage::BeforeUnglue,
            Self::AfterUnglue(_) => HookStage::AfterUnglue,
        }
    }
}

/// Invoke the hook of `asset_class` for `call`, if one is installed
pub(crate) fn dispatch(glue: &mut Glue, asset_class: &AssetClassId, call: HookCall<'_>) -> GlueResult<()> {
    let Some(hooks) = glue.class(asset_class)?.hooks.get() else {
        return Ok(());
    };

    let stage = call.stage();
    debug!(?stage, "dispatching hook");

    let result = match call {
        HookCall::BeforeGlue(args) => hooks.before_glue(glue, args),
        HookCall::AfterGlue(args) => hooks.after_glue(glue, args),
        HookCall::BeforeUnglue(args) => hooks.before_unglue(glue, args),
        HookCall::AfterUnglue(args) => hooks.after_unglue(glue, args),
    };
    result.map_err(|cause| GlueError::HookAborted { stage, cause: Box::new(cause) })?;

    glue.verify_backing(asset_class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glue_common::AssetKind;
    use std::cell::RefCell;

    const OWNER: Address = [1u8; 32];

    #[derive(Default)]
    struct Recorder {
        stages: RefCell<Vec<HookStage>>,
    }

    impl GluedHooks for Recorder {
        fn before_glue(&self, _glue: &mut Glue, _args: &GlueHookArgs) -> GlueResult<()> {
            self.stages.borrow_mut().push(HookStage::BeforeGlue);
            Ok(())
        }

        fn after_glue(&self, _glue: &mut Glue, _args: &GlueHookArgs) -> GlueResult<()> {
            self.stages.borrow_mut().push(HookStage::AfterGlue);
            Ok(())
        }
    }

    struct Veto;

    impl GluedHooks for Veto {
        fn before_glue(&self, _glue: &mut Glue, _args: &GlueHookArgs) -> GlueResult<()> {
            Err(GlueError::Rejected { reason: "deposits closed" })
        }
    }

    /// Moves the fresh deposit out behind the ledger's back
    struct Drain;

    impl GluedHooks for Drain {
        fn after_glue(&self, glue: &mut Glue, args: &GlueHookArgs) -> GlueResult<()> {
            glue.bank_mut().transfer(&args.token, &args.asset_class, &OWNER, args.amount)
        }
    }

    fn args(asset_class: AssetClassId) -> GlueHookArgs {
        GlueHookArgs { asset_class, depositor: OWNER, token: [2u8; 32], amount: 1 }
    }

    #[test]
    fn test_absent_hook_is_noop() {
        let mut glue = Glue::default();
        let class = glue.create_asset_class(OWNER, AssetKind::Fungible).unwrap();
        assert!(dispatch(&mut glue, &class, HookCall::BeforeGlue(&args(class))).is_ok());
    }

    #[test]
    fn test_dispatch_reaches_installed_hook() {
        let mut glue = Glue::default();
        let class = glue.create_asset_class(OWNER, AssetKind::Fungible).unwrap();
        let recorder = Rc::new(Recorder::default());
        glue.set_hooks(&class, OWNER, recorder.clone()).unwrap();

        dispatch(&mut glue, &class, HookCall::BeforeGlue(&args(class))).unwrap();
        dispatch(&mut glue, &class, HookCall::AfterGlue(&args(class))).unwrap();
        // Default methods stay silent
        dispatch(&mut glue, &class, HookCall::BeforeUnglue(&UnglueHookArgs {
            asset_class: class,
            redeemer: OWNER,
            recipient: OWNER,
            amount: RedeemAmount::Units(1),
            supply_snapshot: 1,
            payouts: Vec::new(),
        }))
        .unwrap();

        assert_eq!(*recorder.stages.borrow(), vec![HookStage::BeforeGlue, HookStage::AfterGlue]);
    }

    #[test]
    fn test_hook_error_is_wrapped_with_stage() {
        let mut glue = Glue::default();
        let class = glue.create_asset_class(OWNER, AssetKind::Fungible).unwrap();
        glue.set_hooks(&class, OWNER, Rc::new(Veto)).unwrap();

        let result = dispatch(&mut glue, &class, HookCall::BeforeGlue(&args(class)));
        assert_eq!(
            result,
            Err(GlueError::HookAborted {
                stage: HookStage::BeforeGlue,
                cause: Box::new(GlueError::Rejected { reason: "deposits closed" }),
            })
        );
    }

    #[test]
    fn test_backing_rechecked_after_hook() {
        let token = [2u8; 32];
        let mut glue = Glue::default();
        let class = glue.create_asset_class(OWNER, AssetKind::Fungible).unwrap();
        glue.register(&class, OWNER, token).unwrap();
        glue.fund(&token, &OWNER, 100).unwrap();
        glue.set_hooks(&class, OWNER, Rc::new(Drain)).unwrap();

        assert_eq!(
            glue.glue(&class, OWNER, token, 100),
            Err(GlueError::BackingDeficit { token, tracked: 100, held: 0 })
        );
        assert_eq!(glue.reserve_of(&class, &token).unwrap(), 0);
        assert_eq!(glue.token_balance(&token, &OWNER), 100);
    }
}
