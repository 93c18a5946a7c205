//! Dynamic oracle for the arc-eager system.
//!
//! The cost of a transition is the number of gold arcs that are still reachable from
//! the configuration but become unreachable once the transition is applied. A
//! transition has cost `0` exactly when the best tree reachable after it is as good as
//! the best tree reachable before it.

use super::{ArcEager, ArcEagerAction, Index, TransitionState};
use crate::syntax::graph::ROOT;

/// Cost reported for transitions that are not legal in the configuration.
pub const ILLEGAL_COST: u32 = 1000;

/// Transitions costing more than this are never considered as decisions.
pub const MAX_PREDICTABLE_COST: u32 = 500;

/// Gold head position of `index`, with ROOT mapped onto the trailing sentinel.
#[inline]
fn gold_head<S: TransitionState>(state: &S, gold_heads: &[Index], index: Index) -> Index {
    match gold_heads.get(index as usize) {
        Some(&ROOT) => state.root_position(),
        Some(&head) => head,
        None => state.root_position(),
    }
}

#[inline]
fn gold_label(gold_labels: &[Index], index: Index) -> Option<Index> {
    gold_labels.get(index as usize).cloned()
}

/// Number of gold dependents of `head` still waiting in the buffer.
fn dependents_in_buffer<S: TransitionState>(state: &S, gold_heads: &[Index], head: Index) -> u32 {
    (state.buffer_pointer()..=state.num_tokens() as Index)
        .filter(|&k| gold_head(state, gold_heads, k) == head)
        .count() as u32
}

/// Number of headless stack items whose gold head is `head`.
fn headless_dependents_on_stack<S: TransitionState>(
    state: &S,
    gold_heads: &[Index],
    head: Index,
) -> u32 {
    state
        .stack_items()
        .iter()
        .filter(|&&k| state.head(k).is_none() && gold_head(state, gold_heads, k) == head)
        .count() as u32
}

fn shift_cost<S: TransitionState>(state: &S, gold_heads: &[Index], b0: Index) -> u32 {
    let g_b0 = gold_head(state, gold_heads, b0);
    let head_on_stack = state.stack_items().iter().filter(|&&x| x == g_b0).count() as u32;
    head_on_stack + headless_dependents_on_stack(state, gold_heads, b0)
}

fn reduce_cost<S: TransitionState>(state: &S, gold_heads: &[Index], s0: Index) -> u32 {
    dependents_in_buffer(state, gold_heads, s0)
}

fn left_arc_cost<S: TransitionState>(
    state: &S,
    gold_heads: &[Index],
    gold_labels: &[Index],
    s0: Index,
    label: Index,
) -> u32 {
    let b0 = state.buffer_pointer();
    let g_s0 = gold_head(state, gold_heads, s0);
    let mut cost = dependents_in_buffer(state, gold_heads, s0);
    if g_s0 > b0 {
        cost += 1;
    } else if g_s0 == b0 && gold_label(gold_labels, s0) != Some(label) {
        cost += 1;
    }
    cost
}

fn right_arc_cost<S: TransitionState>(
    state: &S,
    gold_heads: &[Index],
    gold_labels: &[Index],
    s0: Index,
    b0: Index,
    label: Index,
) -> u32 {
    let g_b0 = gold_head(state, gold_heads, b0);
    let mut cost = 0;
    if g_b0 == s0 {
        if gold_label(gold_labels, b0) != Some(label) {
            cost += 1;
        }
    } else if g_b0 > b0 || state.stack_items().contains(&g_b0) {
        cost += 1;
    }
    cost + headless_dependents_on_stack(state, gold_heads, b0)
}

/// Cost of `action` in `state` against the gold tree given by `gold_heads` and
/// `gold_labels`, both indexed by token id with slot `0` unused.
pub fn action_cost<S: TransitionState>(
    state: &S,
    action: ArcEagerAction,
    gold_heads: &[Index],
    gold_labels: &[Index],
) -> u32 {
    if !ArcEager::is_allowed_kind(action.kind(), state) {
        return ILLEGAL_COST;
    }
    let s0 = state.stack_top();
    let b0 = state.buffer_head();
    match (action, s0, b0) {
        (ArcEagerAction::Shift, _, Some(b0)) => shift_cost(state, gold_heads, b0),
        (ArcEagerAction::Reduce, Some(s0), _) => reduce_cost(state, gold_heads, s0),
        (ArcEagerAction::LeftArc(label), Some(s0), _) => {
            left_arc_cost(state, gold_heads, gold_labels, s0, label)
        }
        (ArcEagerAction::RightArc(label), Some(s0), Some(b0)) => {
            right_arc_cost(state, gold_heads, gold_labels, s0, b0, label)
        }
        _ => ILLEGAL_COST,
    }
}
