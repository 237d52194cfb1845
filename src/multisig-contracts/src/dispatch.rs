//! Action dispatch for an executing batch.
//!
//! Actions run in key order against the live authorization context. The
//! loop stops at the first failing action; transfers queued before it stay
//! queued, since the environment cannot retract them.

use multisig_types::{Action, AuthorizationContext, AuthorizationUpdate, Cell, PartyList};
use tracing::trace;

use crate::{
    chain::TxContext,
    decoder::decode_action,
    errors::{DecodeError, WalletError},
};

/// The action at `index` failed; everything before it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchHalt {
    pub index: usize,
    pub error: WalletError,
}

/// Dispatch `actions` in order, mutating `auth` in place.
pub fn dispatch_actions(
    ctx: &mut TxContext<'_>,
    auth: &mut AuthorizationContext,
    actions: &[Cell],
) -> Result<(), DispatchHalt> {
    for (index, cell) in actions.iter().enumerate() {
        let halt = |error: WalletError| DispatchHalt { index, error };
        let action = decode_action(cell).map_err(|e| match e {
            DecodeError::UnknownAction(op) => halt(WalletError::UnknownOp(op)),
            other => halt(WalletError::Decode(other)),
        })?;
        match action {
            Action::Transfer { send_mode, message } => {
                trace!(index, send_mode, "transfer");
                ctx.send_raw_message(message, send_mode);
            }
            Action::UpdateAuthorization(update) => {
                trace!(index, threshold = update.threshold, "update authorization");
                *auth = apply_update(update).map_err(halt)?;
            }
        }
    }
    Ok(())
}

/// New context from `update`. Nothing is assigned unless every check passes.
fn apply_update(update: AuthorizationUpdate) -> Result<AuthorizationContext, WalletError> {
    let signers = PartyList::from_dict(update.signers.as_ref())?;
    let proposers = PartyList::from_dict(update.proposers.as_ref())?;
    let next = AuthorizationContext {
        threshold: update.threshold,
        signers,
        proposers,
        modules: update.modules,
        guard: update.guard,
    };
    next.validate()?;
    trace!(
        signers = next.signers.len(),
        proposers = next.proposers.len(),
        "authorization replaced"
    );
    Ok(next)
}
