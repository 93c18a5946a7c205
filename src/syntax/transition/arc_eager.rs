use std::fmt;

use super::oracle;
use super::{Action, Index, TransitionMutableState, TransitionState, TransitionSystem};
use crate::error::{Error, Result};

/// Transition kinds without their labels.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransitionKind {
    Shift,
    LeftArc,
    RightArc,
    Reduce,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 4] = [
        TransitionKind::Shift,
        TransitionKind::LeftArc,
        TransitionKind::RightArc,
        TransitionKind::Reduce,
    ];

    #[inline]
    fn bit(self) -> u8 {
        match self {
            TransitionKind::Shift => 1,
            TransitionKind::LeftArc => 1 << 1,
            TransitionKind::RightArc => 1 << 2,
            TransitionKind::Reduce => 1 << 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionKind::Shift => "SHIFT",
            TransitionKind::LeftArc => "LEFTARC",
            TransitionKind::RightArc => "RIGHTARC",
            TransitionKind::Reduce => "REDUCE",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of transition kinds legal in a configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ValidTransitions(u8);

impl ValidTransitions {
    pub fn empty() -> Self {
        ValidTransitions(0)
    }

    pub fn insert(&mut self, kind: TransitionKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: TransitionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = TransitionKind> + '_ {
        TransitionKind::ALL
            .iter()
            .cloned()
            .filter(move |kind| self.contains(*kind))
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArcEagerAction {
    Shift,
    Reduce,
    LeftArc(Index),
    RightArc(Index),
}

impl ArcEagerAction {
    pub fn from_action(action: Action) -> Self {
        match action {
            0 => ArcEagerAction::Shift,
            1 => ArcEagerAction::Reduce,
            _ => {
                let label = (action - 2) >> 1;
                if action & 1 == 0 {
                    ArcEagerAction::LeftArc(label)
                } else {
                    ArcEagerAction::RightArc(label)
                }
            }
        }
    }

    pub fn into_action(self) -> Action {
        match self {
            ArcEagerAction::Shift => 0,
            ArcEagerAction::Reduce => 1,
            ArcEagerAction::LeftArc(label) => 2 + (label << 1),
            ArcEagerAction::RightArc(label) => 3 + (label << 1),
        }
    }

    pub fn kind(&self) -> TransitionKind {
        match *self {
            ArcEagerAction::Shift => TransitionKind::Shift,
            ArcEagerAction::Reduce => TransitionKind::Reduce,
            ArcEagerAction::LeftArc(_) => TransitionKind::LeftArc,
            ArcEagerAction::RightArc(_) => TransitionKind::RightArc,
        }
    }

    pub fn label(&self) -> Option<Index> {
        match *self {
            ArcEagerAction::LeftArc(label) | ArcEagerAction::RightArc(label) => Some(label),
            _ => None,
        }
    }

    pub fn num_action_types() -> usize {
        4
    }

    pub fn num_defined_actions(num_labels: usize) -> usize {
        2 + 2 * num_labels
    }
}

impl fmt::Display for ArcEagerAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ArcEagerAction::Shift => write!(f, "Shift"),
            ArcEagerAction::Reduce => write!(f, "Reduce"),
            ArcEagerAction::LeftArc(label) => write!(f, "LeftArc({})", label),
            ArcEagerAction::RightArc(label) => write!(f, "RightArc({})", label),
        }
    }
}

#[derive(Debug)]
pub struct ArcEager;

impl ArcEager {
    /// Shift: (s, i|b, A) => (s|i, b, A)
    pub fn apply_shift<S: TransitionMutableState>(state: &mut S) -> Result<()> {
        let b0 = state
            .buffer_head()
            .ok_or(Error::InvalidOperation("buffer is exhausted"))?;
        state.push(b0)?;
        state.advance()
    }

    /// Left Arc: (s|i, j|b, A) => (s, j|b, A + (j,l,i))
    pub fn apply_left_arc<S: TransitionMutableState>(state: &mut S, label: Index) -> Result<()> {
        let b0 = state.buffer_pointer();
        let s0 = state.pop()?;
        state.add_arc(s0, b0, label)
    }

    /// Right Arc: (s|i, j|b, A) => (s|i|j, b, A + (i,l,j))
    pub fn apply_right_arc<S: TransitionMutableState>(state: &mut S, label: Index) -> Result<()> {
        let s0 = state
            .stack_top()
            .ok_or(Error::InvalidOperation("stack is empty"))?;
        let b0 = state
            .buffer_head()
            .ok_or(Error::InvalidOperation("buffer is exhausted"))?;
        state.add_arc(b0, s0, label)?;
        state.push(b0)?;
        state.advance()
    }

    /// Reduce: (s|i, b, A) => (s, b, A)
    pub fn apply_reduce<S: TransitionMutableState>(state: &mut S) -> Result<()> {
        state.pop().map(|_| ())
    }

    pub fn is_allowed_shift<S: TransitionState>(state: &S) -> bool {
        !state.is_buffer_exhausted()
    }

    pub fn is_allowed_left_arc<S: TransitionState>(state: &S) -> bool {
        match state.stack_top() {
            Some(s0) => state.head(s0).is_none(),
            None => false,
        }
    }

    pub fn is_allowed_right_arc<S: TransitionState>(state: &S) -> bool {
        !state.is_stack_empty() && !state.is_buffer_exhausted()
    }

    pub fn is_allowed_reduce<S: TransitionState>(state: &S) -> bool {
        match state.stack_top() {
            Some(s0) => state.head(s0).is_some(),
            None => false,
        }
    }

    pub fn is_allowed_kind<S: TransitionState>(kind: TransitionKind, state: &S) -> bool {
        match kind {
            TransitionKind::Shift => ArcEager::is_allowed_shift(state),
            TransitionKind::LeftArc => ArcEager::is_allowed_left_arc(state),
            TransitionKind::RightArc => ArcEager::is_allowed_right_arc(state),
            TransitionKind::Reduce => ArcEager::is_allowed_reduce(state),
        }
    }

    pub fn valid_transitions<S: TransitionState>(state: &S) -> ValidTransitions {
        let mut valid = ValidTransitions::empty();
        for &kind in TransitionKind::ALL.iter() {
            if ArcEager::is_allowed_kind(kind, state) {
                valid.insert(kind);
            }
        }
        valid
    }
}

impl TransitionSystem for ArcEager {
    fn num_action_types() -> usize {
        ArcEagerAction::num_action_types()
    }

    fn num_defined_actions(num_labels: usize) -> usize {
        ArcEagerAction::num_defined_actions(num_labels)
    }

    fn estimate_num_actions(num_tokens: usize) -> usize {
        2 * num_tokens
    }

    fn apply<S: TransitionMutableState>(action: Action, state: &mut S) -> Result<()> {
        let transition = ArcEagerAction::from_action(action);
        if !ArcEager::is_allowed_kind(transition.kind(), state) {
            return Err(Error::IllegalTransition {
                action: transition.to_string(),
                step: state.step(),
            });
        }
        match transition {
            ArcEagerAction::Shift => ArcEager::apply_shift(state)?,
            ArcEagerAction::Reduce => ArcEager::apply_reduce(state)?,
            ArcEagerAction::LeftArc(label) => ArcEager::apply_left_arc(state, label)?,
            ArcEagerAction::RightArc(label) => ArcEager::apply_right_arc(state, label)?,
        }
        state.record(action)
    }

    fn is_allowed<S: TransitionState>(action: Action, state: &S) -> bool {
        ArcEager::is_allowed_kind(ArcEagerAction::from_action(action).kind(), state)
    }

    fn is_terminal<S: TransitionState>(state: &S) -> bool {
        state.is_buffer_exhausted() && state.is_stack_empty()
    }

    fn cost<S: TransitionState>(
        action: Action,
        state: &S,
        gold_heads: &[Index],
        gold_labels: &[Index],
    ) -> u32 {
        oracle::action_cost(
            state,
            ArcEagerAction::from_action(action),
            gold_heads,
            gold_labels,
        )
    }

    fn get_oracle<S: TransitionState>(
        state: &S,
        gold_heads: &[Index],
        gold_labels: &[Index],
    ) -> Option<Action> {
        if ArcEager::is_terminal(state) {
            return None;
        }
        let s0_label = state
            .stack_top()
            .map(|s0| gold_labels[s0 as usize])
            .unwrap_or(0);
        let b0_label = state
            .buffer_head()
            .map(|b0| gold_labels[b0 as usize])
            .unwrap_or(0);
        let candidates = [
            ArcEagerAction::LeftArc(s0_label),
            ArcEagerAction::RightArc(b0_label),
            ArcEagerAction::Reduce,
            ArcEagerAction::Shift,
        ];
        candidates
            .iter()
            .find(|&&action| oracle::action_cost(state, action, gold_heads, gold_labels) == 0)
            .map(|action| action.into_action())
    }
}
