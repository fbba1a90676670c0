use super::GuardContext;
use super::context_tracker::ACTIVE_CONTEXTS_KEY;
use crate::core::hook::{Decision, HookInput};
use crate::core::membership;

pub fn evaluate(ctx: &GuardContext, _input: &HookInput) -> Decision {
    let contexts = membership::members(&ctx.store, ACTIVE_CONTEXTS_KEY);
    if contexts.is_empty() {
        return Decision::Continue { message: None };
    }
    Decision::Continue {
        message: Some(format!(
            "Active contexts this session: {}. Include all of them when searching.",
            contexts.join(", ")
        )),
    }
}
