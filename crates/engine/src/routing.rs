//! Edge settlement and join evaluation — the failure/routing policy.
//!
//! Both functions here are pure: `settle_edges` converts one parent outcome
//! into a single per-parent edge outcome for a child, and `evaluate_join`
//! decides readiness from the settled parents alone. The scheduler applies
//! them; nothing here touches run state.

use relay_core::{ActionRef, FailureMetadata, FailureReason, SELF_HANDLE};
use relay_execution::{ActionOutcome, ActionStatus, EdgeOutcome};
use relay_workflow::{Edge, EdgeKind, JoinStrategy};

/// The result of evaluating a child's join predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
    /// Not enough parents have settled.
    Wait,
    /// The child is ready to run.
    Ready {
        /// The satisfier that triggered readiness, for any/first joins.
        triggered_by: Option<ActionRef>,
    },
    /// The join can no longer be satisfied; the child is skipped.
    Skip,
}

/// Whether a success edge attached to `source_handle` fires given the
/// component's activated output ports.
fn handle_fires(source_handle: Option<&str>, active_ports: Option<&[String]>) -> bool {
    match source_handle {
        None => true,
        Some(handle) if handle == SELF_HANDLE => true,
        Some(handle) => active_ports.is_none_or(|ports| ports.iter().any(|p| p == handle)),
    }
}

/// Convert a parent's terminal outcome into this child's edge settlement.
///
/// All edges between the parent and the child collapse into one per-parent
/// outcome:
/// - completed parent — satisfied if any success edge fires (handle unset,
///   `__self__`, or among the activated ports), else cancelled; error edges
///   never fire on completion;
/// - failed parent — satisfied if an error edge exists, carrying the failure
///   metadata downstream, else a hard failed settlement;
/// - skipped parent — cancelled.
#[must_use]
pub fn settle_edges(
    parent: &ActionRef,
    outcome: &ActionOutcome,
    edges: &[&Edge],
) -> (EdgeOutcome, Option<FailureMetadata>) {
    match outcome.status {
        ActionStatus::Completed => {
            let active = outcome.active_output_ports.as_deref();
            let fired = edges.iter().any(|edge| {
                edge.kind == EdgeKind::Success
                    && handle_fires(edge.source_handle.as_deref(), active)
            });
            (
                if fired {
                    EdgeOutcome::Satisfied
                } else {
                    EdgeOutcome::Cancelled
                },
                None,
            )
        }
        ActionStatus::Failed => {
            let has_error_edge = edges.iter().any(|edge| edge.kind == EdgeKind::Error);
            if has_error_edge {
                let reason = outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| FailureReason::new("action failed", "Error"));
                (
                    EdgeOutcome::Satisfied,
                    Some(FailureMetadata::new(parent.clone(), reason)),
                )
            } else {
                (EdgeOutcome::Failed, None)
            }
        }
        // Skipped parents cancel everything; pending/running parents never
        // reach fanout.
        _ => (EdgeOutcome::Cancelled, None),
    }
}

/// Decide a child's readiness from its join strategy and settled parents.
///
/// Pure over `(strategy, indegree, parents)`: identical inputs yield an
/// identical decision and `triggered_by`.
#[must_use]
pub fn evaluate_join(
    strategy: JoinStrategy,
    indegree: usize,
    parents: &[(ActionRef, EdgeOutcome)],
) -> JoinDecision {
    if indegree == 0 {
        return JoinDecision::Ready { triggered_by: None };
    }

    let settled = parents.len();
    let satisfied = parents
        .iter()
        .filter(|(_, o)| *o == EdgeOutcome::Satisfied)
        .count();
    let failed = parents
        .iter()
        .filter(|(_, o)| *o == EdgeOutcome::Failed)
        .count();
    let first_satisfier = parents
        .iter()
        .find(|(_, o)| *o == EdgeOutcome::Satisfied)
        .map(|(p, _)| p.clone());

    match strategy {
        JoinStrategy::All => {
            if failed > 0 {
                JoinDecision::Skip
            } else if settled < indegree {
                JoinDecision::Wait
            } else if satisfied > 0 {
                // All parents settled, none failed: every non-cancelled
                // parent satisfied the join.
                JoinDecision::Ready { triggered_by: None }
            } else {
                JoinDecision::Skip
            }
        }
        JoinStrategy::Any => {
            if satisfied > 0 {
                JoinDecision::Ready {
                    triggered_by: first_satisfier,
                }
            } else if settled < indegree {
                JoinDecision::Wait
            } else {
                JoinDecision::Skip
            }
        }
        JoinStrategy::First => match parents.first() {
            None => JoinDecision::Wait,
            Some((parent, EdgeOutcome::Satisfied)) => JoinDecision::Ready {
                triggered_by: Some(parent.clone()),
            },
            Some(_) => JoinDecision::Skip,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn edge(kind: EdgeKind, source_handle: Option<&str>) -> Edge {
        Edge {
            id: "e".into(),
            source_ref: ActionRef::new("parent"),
            target_ref: ActionRef::new("child"),
            source_handle: source_handle.map(str::to_owned),
            target_handle: None,
            kind,
        }
    }

    fn settled(pairs: &[(&str, EdgeOutcome)]) -> Vec<(ActionRef, EdgeOutcome)> {
        pairs
            .iter()
            .map(|(name, outcome)| (ActionRef::new(*name), *outcome))
            .collect()
    }

    // ── settle_edges ────────────────────────────────────────────────

    #[test]
    fn completed_parent_satisfies_plain_success_edge() {
        let parent = ActionRef::new("parent");
        let success = edge(EdgeKind::Success, None);
        let (outcome, failure) =
            settle_edges(&parent, &ActionOutcome::completed(json!({})), &[&success]);
        assert_eq!(outcome, EdgeOutcome::Satisfied);
        assert!(failure.is_none());
    }

    #[test]
    fn completed_parent_cancels_error_edges() {
        let parent = ActionRef::new("parent");
        let error = edge(EdgeKind::Error, None);
        let (outcome, _) =
            settle_edges(&parent, &ActionOutcome::completed(json!({})), &[&error]);
        assert_eq!(outcome, EdgeOutcome::Cancelled);
    }

    #[test]
    fn active_ports_select_which_success_edges_fire() {
        let parent = ActionRef::new("parent");
        let approved = edge(EdgeKind::Success, Some("approved"));
        let rejected = edge(EdgeKind::Success, Some("rejected"));
        let outcome =
            ActionOutcome::completed_with_ports(json!({}), vec!["approved".into()]);

        let (fired, _) = settle_edges(&parent, &outcome, &[&approved]);
        assert_eq!(fired, EdgeOutcome::Satisfied);

        let (cancelled, _) = settle_edges(&parent, &outcome, &[&rejected]);
        assert_eq!(cancelled, EdgeOutcome::Cancelled);
    }

    #[test]
    fn self_handle_fires_regardless_of_active_ports() {
        let parent = ActionRef::new("parent");
        let self_edge = edge(EdgeKind::Success, Some(SELF_HANDLE));
        let outcome = ActionOutcome::completed_with_ports(json!({}), vec!["other".into()]);
        let (fired, _) = settle_edges(&parent, &outcome, &[&self_edge]);
        assert_eq!(fired, EdgeOutcome::Satisfied);
    }

    #[test]
    fn failed_parent_with_error_edge_satisfies_and_carries_failure() {
        let parent = ActionRef::new("fail");
        let success = edge(EdgeKind::Success, None);
        let error = edge(EdgeKind::Error, None);
        let outcome = ActionOutcome::failed(FailureReason::new("boom", "Error"));

        let (settled, failure) = settle_edges(&parent, &outcome, &[&success, &error]);
        assert_eq!(settled, EdgeOutcome::Satisfied);
        let failure = failure.unwrap();
        assert_eq!(failure.at, parent);
        assert_eq!(failure.reason.message, "boom");
    }

    #[test]
    fn failed_parent_without_error_edge_fails_the_settlement() {
        let parent = ActionRef::new("fail");
        let success = edge(EdgeKind::Success, None);
        let outcome = ActionOutcome::failed(FailureReason::new("boom", "Error"));
        let (settled, failure) = settle_edges(&parent, &outcome, &[&success]);
        assert_eq!(settled, EdgeOutcome::Failed);
        assert!(failure.is_none());
    }

    #[test]
    fn skipped_parent_cancels() {
        let parent = ActionRef::new("skip");
        let success = edge(EdgeKind::Success, None);
        let (settled, _) = settle_edges(&parent, &ActionOutcome::skipped(), &[&success]);
        assert_eq!(settled, EdgeOutcome::Cancelled);
    }

    // ── evaluate_join ───────────────────────────────────────────────

    #[test]
    fn all_waits_until_every_parent_settles() {
        let parents = settled(&[("a", EdgeOutcome::Satisfied)]);
        assert_eq!(evaluate_join(JoinStrategy::All, 2, &parents), JoinDecision::Wait);
    }

    #[test]
    fn all_ready_with_no_triggered_by() {
        let parents = settled(&[
            ("a", EdgeOutcome::Satisfied),
            ("b", EdgeOutcome::Satisfied),
        ]);
        assert_eq!(
            evaluate_join(JoinStrategy::All, 2, &parents),
            JoinDecision::Ready { triggered_by: None }
        );
    }

    #[test]
    fn all_tolerates_cancelled_parents() {
        let parents = settled(&[
            ("a", EdgeOutcome::Satisfied),
            ("b", EdgeOutcome::Cancelled),
        ]);
        assert_eq!(
            evaluate_join(JoinStrategy::All, 2, &parents),
            JoinDecision::Ready { triggered_by: None }
        );
    }

    #[test]
    fn all_skips_on_any_failed_parent() {
        let parents = settled(&[("a", EdgeOutcome::Failed)]);
        assert_eq!(evaluate_join(JoinStrategy::All, 2, &parents), JoinDecision::Skip);
    }

    #[test]
    fn all_skips_when_everything_cancelled() {
        let parents = settled(&[
            ("a", EdgeOutcome::Cancelled),
            ("b", EdgeOutcome::Cancelled),
        ]);
        assert_eq!(evaluate_join(JoinStrategy::All, 2, &parents), JoinDecision::Skip);
    }

    #[test]
    fn any_fires_on_first_satisfier() {
        let parents = settled(&[
            ("slow", EdgeOutcome::Cancelled),
            ("fast", EdgeOutcome::Satisfied),
        ]);
        assert_eq!(
            evaluate_join(JoinStrategy::Any, 2, &parents),
            JoinDecision::Ready {
                triggered_by: Some(ActionRef::new("fast"))
            }
        );
    }

    #[test]
    fn any_waits_while_unsatisfied_parents_remain() {
        let parents = settled(&[("a", EdgeOutcome::Cancelled)]);
        assert_eq!(evaluate_join(JoinStrategy::Any, 2, &parents), JoinDecision::Wait);
    }

    #[test]
    fn any_skips_when_all_settled_unsatisfied() {
        let parents = settled(&[
            ("a", EdgeOutcome::Cancelled),
            ("b", EdgeOutcome::Failed),
        ]);
        assert_eq!(evaluate_join(JoinStrategy::Any, 2, &parents), JoinDecision::Skip);
    }

    #[test]
    fn first_decides_on_the_first_settler() {
        let ready = settled(&[("fast", EdgeOutcome::Satisfied)]);
        assert_eq!(
            evaluate_join(JoinStrategy::First, 2, &ready),
            JoinDecision::Ready {
                triggered_by: Some(ActionRef::new("fast"))
            }
        );

        let skipped = settled(&[("fast", EdgeOutcome::Cancelled)]);
        assert_eq!(
            evaluate_join(JoinStrategy::First, 2, &skipped),
            JoinDecision::Skip
        );
    }

    #[test]
    fn zero_indegree_is_always_ready() {
        assert_eq!(
            evaluate_join(JoinStrategy::All, 0, &[]),
            JoinDecision::Ready { triggered_by: None }
        );
    }

    #[test]
    fn evaluation_is_pure() {
        let parents = settled(&[
            ("slow", EdgeOutcome::Cancelled),
            ("fast", EdgeOutcome::Satisfied),
        ]);
        let first = evaluate_join(JoinStrategy::Any, 2, &parents);
        let second = evaluate_join(JoinStrategy::Any, 2, &parents);
        assert_eq!(first, second);
    }
}
