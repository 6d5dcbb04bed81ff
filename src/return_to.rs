//! Post-login return target.
//!
//! After a successful login the application has to decide which state to
//! reactivate. [`compute_return_target`] makes that decision from the
//! login transition alone:
//!
//! 1. The login transition replaced a guarded attempt: go where the user
//!    originally tried to go (the superseded transition's target).
//! 2. Login was entered directly from another state: go back there.
//! 3. Login was the very first state of the session: go to [`HOME_STATE`].
//!
//! The order matters. A user who was bounced to login and then reaches it
//! again through a direct link still has a superseded attempt on record,
//! and that attempt wins over the immediate predecessor.

use crate::transition::{TargetState, TransitionContext};
use crate::warn_log;

/// State activated when there is nothing better to return to.
pub const HOME_STATE: &str = "home";

/// Compute the state to activate once the user has authenticated.
///
/// Total and side-effect free apart from a warning when a redirect chain is
/// malformed.
///
/// # Example
///
/// ```
/// use state_router::{compute_return_target, TargetState, TransitionContext};
///
/// let guarded = TransitionContext::initial(TargetState::new("contacts"));
/// let login = guarded.redirect(TargetState::new("login"));
/// assert_eq!(compute_return_target(&login).name(), "contacts");
///
/// let direct = TransitionContext::new(TargetState::new("prefs"), TargetState::new("login"));
/// assert_eq!(compute_return_target(&direct).name(), "prefs");
///
/// let first = TransitionContext::initial(TargetState::new("login"));
/// assert_eq!(compute_return_target(&first), TargetState::new("home"));
/// ```
pub fn compute_return_target(ctx: &TransitionContext) -> TargetState {
    if let Some(superseded) = ctx.redirected_from() {
        let target = superseded.to();
        if target.is_empty() {
            warn_log!(
                "Transition {} was redirected from a transition without a target; returning to '{}'",
                ctx,
                HOME_STATE
            );
            return TargetState::new(HOME_STATE);
        }
        return target.clone();
    }

    if !ctx.from().is_empty() {
        return ctx.from().clone();
    }

    TargetState::new(HOME_STATE)
}
