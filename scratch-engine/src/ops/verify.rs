//! Public ticket lookup
//!
//! Anyone holding a security code may look the ticket up, so the answer is
//! a [`TicketView`]: unscratched tickets carry no prize information.

use scratch_core::{security_code, TicketView};
use scratch_store::LotteryStore;

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};

use super::ScratchEngine;

pub async fn verify_by_code<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    code: &str,
) -> EngineResult<TicketView> {
    let code = security_code::normalize(code)?;

    let view = engine.store().transaction(|tx| {
        tx.ticket_by_code(&code)?
            .map(|t| TicketView::of(&t))
            .ok_or_else(|| EngineError::not_found("ticket", security_code::log_prefix(&code)))
    })?;

    tracing::debug!(
        code = security_code::log_prefix(&code),
        status = %view.status(),
        "ticket verified"
    );
    Ok(view)
}

pub async fn tickets_for_user<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
) -> EngineResult<Vec<TicketView>> {
    engine.store().transaction(|tx| {
        Ok(tx
            .tickets_for_user(caller.user_id)?
            .iter()
            .map(TicketView::of)
            .collect())
    })
}
