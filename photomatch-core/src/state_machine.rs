//! Item lifecycle transitions.
//!
//! ```text
//! Unresolved --confirm(r)--> Matched(r)      (r may be None: "confirmed no match")
//! Unresolved --skip-------> Skipped          (terminal, no unskip)
//! Matched    --rematch(reset)--> Unresolved
//! any        --rematch-------> same state, precomputed candidates cleared
//! ```
//!
//! Every store applies transitions through [`plan_transition`], so the rules
//! live in one place and stores only provide atomicity.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::model::{Item, MatchState};

/// A requested state change for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Record a match, or with `None` an explicit "no match exists" decision.
    ConfirmMatch { reference_id: Option<i64> },
    /// Drop the precomputed candidate set so live retrieval is used next time.
    RequestRematch { reset_state: bool },
    Skip,
}

/// Whether a rematch request also reopens a matched item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RematchPolicy {
    #[default]
    PreserveState,
    ResetState,
}

impl RematchPolicy {
    pub fn transition(self) -> Transition {
        Transition::RequestRematch {
            reset_state: self == RematchPolicy::ResetState,
        }
    }
}

/// Result of planning a transition against the current item.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Persist this item.
    Apply(Item),
    /// The item is already in the requested state.
    NoOp,
}

/// Decide what `transition` does to `item`, without side effects.
pub fn plan_transition(item: &Item, transition: &Transition) -> Result<Plan> {
    let conflict = || MatchError::ConflictingTransition {
        item_id: item.id,
        current: item.match_state,
    };

    let planned = match *transition {
        Transition::ConfirmMatch { reference_id } => match item.match_state {
            MatchState::Unresolved => {
                let mut next = item.clone();
                next.match_state = MatchState::Matched;
                next.matched_reference_id = reference_id;
                next
            }
            MatchState::Matched if item.matched_reference_id == reference_id => {
                return Ok(Plan::NoOp)
            }
            MatchState::Matched | MatchState::Skipped => return Err(conflict()),
        },
        Transition::RequestRematch { reset_state } => {
            if reset_state && item.match_state == MatchState::Skipped {
                return Err(conflict());
            }
            let reopen = reset_state && item.match_state == MatchState::Matched;
            if item.precomputed_candidate_ids.is_none() && !reopen {
                return Ok(Plan::NoOp);
            }
            let mut next = item.clone();
            next.precomputed_candidate_ids = None;
            if reopen {
                next.match_state = MatchState::Unresolved;
                next.matched_reference_id = None;
            }
            next
        }
        Transition::Skip => match item.match_state {
            MatchState::Unresolved => {
                let mut next = item.clone();
                next.match_state = MatchState::Skipped;
                next
            }
            MatchState::Skipped => return Ok(Plan::NoOp),
            MatchState::Matched => return Err(conflict()),
        },
    };

    debug_assert!(planned.check_invariants());
    Ok(Plan::Apply(planned))
}
