use super::GuardContext;
use crate::core::hook::{Decision, HookInput};
use crate::core::run_once;
use crate::core::session;

pub const RUN_ONCE_NAME: &str = "session-start";

pub fn evaluate(ctx: &GuardContext, input: &HookInput) -> Decision {
    if !run_once::try_claim(&ctx.store, RUN_ONCE_NAME, ctx.config.run_once_ttl()) {
        return Decision::Empty;
    }
    if let Some(session_id) = input.session_id.as_deref().filter(|id| !id.is_empty()) {
        session::detect_session_boundary(&ctx.store, &ctx.flags, session_id);
    }
    Decision::Empty
}
