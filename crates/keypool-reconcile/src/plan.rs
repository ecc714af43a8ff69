//! Set reconciliation: verdicts + current membership → a minimal write plan.

use std::collections::{BTreeMap, BTreeSet};

use keypool_store::Token;

use crate::verdict::Verdict;

/// The three-way partition computed by one reconciliation pass.
///
/// `to_add` and `to_remove` are the minimal write sets: no token is proposed
/// for an operation that would be a no-op against the membership snapshot.
/// `unchanged` is informational only and never written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciliationPlan {
    /// Active tokens not yet in the store set.
    pub to_add: BTreeSet<Token>,
    /// Invalid tokens currently in the store set.
    pub to_remove: BTreeSet<Token>,
    /// Everything else: active-and-already-present, or not probed.
    pub unchanged: BTreeSet<Token>,
}

impl ReconciliationPlan {
    /// The membership expected after a successful apply:
    /// `(members ∪ to_add) − to_remove`. This is the value to back up.
    pub fn expected_members(&self, members: &BTreeSet<Token>) -> BTreeSet<Token> {
        members
            .union(&self.to_add)
            .filter(|t| !self.to_remove.contains(*t))
            .cloned()
            .collect()
    }

    /// True when applying the plan would not write anything.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Classify verdicts against the membership snapshot.
///
/// Pure set algebra — no network or store calls. Every token in
/// `members ∪ staged` lands in exactly one of the three output sets:
///
/// 1. `to_add` — verdict Active and not already a member;
/// 2. `to_remove` — verdict Invalid and currently a member;
/// 3. `unchanged` — everything else (including tokens with no verdict).
pub fn reconcile(
    members: &BTreeSet<Token>,
    staged: &BTreeSet<Token>,
    verdicts: &BTreeMap<Token, Verdict>,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();

    for token in members.union(staged) {
        let is_member = members.contains(token);
        match verdicts.get(token) {
            Some(Verdict::Active) if !is_member => {
                plan.to_add.insert(token.clone());
            }
            Some(Verdict::Invalid) if is_member => {
                plan.to_remove.insert(token.clone());
            }
            _ => {
                plan.unchanged.insert(token.clone());
            }
        }
    }

    plan
}
