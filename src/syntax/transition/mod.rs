pub use self::arc_eager::*;
pub use self::state::*;

use crate::error::Result;

mod arc_eager;
pub mod oracle;
pub mod prelude;
mod state;

pub type Index = u32;
pub type Action = u32;

/// Read access to a parser configuration.
///
/// Token positions run from `1` to `num_tokens()`; position `num_tokens() + 1` is the
/// trailing ROOT sentinel that closes the buffer. Arcs attached to the sentinel are
/// reported with head `0`.
pub trait TransitionState {
    fn step(&self) -> usize {
        self.actions().len()
    }

    fn num_tokens(&self) -> usize;

    fn root_position(&self) -> Index {
        self.num_tokens() as Index + 1
    }

    fn stack_top(&self) -> Option<Index>;

    /// Stack item at `position`, counted from the top.
    fn stack(&self, position: Index) -> Option<Index>;

    /// Stack items from bottom to top.
    fn stack_items(&self) -> &[Index];

    fn stack_size(&self) -> usize {
        self.stack_items().len()
    }

    fn is_stack_empty(&self) -> bool {
        self.stack_size() == 0
    }

    /// Next unconsumed buffer position, the sentinel once all tokens are consumed.
    fn buffer_pointer(&self) -> Index;

    /// Head of the buffer if it is a real token.
    fn buffer_head(&self) -> Option<Index> {
        self.buffer(0)
    }

    fn buffer(&self, position: Index) -> Option<Index> {
        let index = self.buffer_pointer() + position;
        if (index as usize) <= self.num_tokens() {
            Some(index)
        } else {
            None
        }
    }

    /// Number of real tokens left in the buffer.
    fn buffer_size(&self) -> usize {
        (self.root_position() - self.buffer_pointer()) as usize
    }

    fn is_buffer_exhausted(&self) -> bool {
        self.buffer_size() == 0
    }

    fn head(&self, index: Index) -> Option<Index>;

    fn heads(&self) -> &[Option<Index>];

    fn label(&self, index: Index) -> Option<Index>;

    fn labels(&self) -> &[Option<Index>];

    fn left_children(&self, index: Index) -> &[Index];

    fn right_children(&self, index: Index) -> &[Index];

    fn leftmost(&self, index: Index) -> Option<Index> {
        self.left_children(index).first().cloned()
    }

    fn rightmost(&self, index: Index) -> Option<Index> {
        self.right_children(index).last().cloned()
    }

    fn actions(&self) -> &[Action];
}

pub trait TransitionMutableState: TransitionState {
    fn advance(&mut self) -> Result<()>;

    fn push(&mut self, index: Index) -> Result<()>;

    fn pop(&mut self) -> Result<Index>;

    /// Attaches `index` to the token (or sentinel) at position `head`.
    fn add_arc(&mut self, index: Index, head: Index, label: Index) -> Result<()>;

    fn record(&mut self, action: Action) -> Result<()>;
}

pub trait TransitionSystem {
    fn num_action_types() -> usize;

    fn num_defined_actions(num_labels: usize) -> usize;

    fn estimate_num_actions(num_tokens: usize) -> usize;

    fn apply<S: TransitionMutableState>(action: Action, state: &mut S) -> Result<()>;

    fn is_allowed<S: TransitionState>(action: Action, state: &S) -> bool;

    fn is_terminal<S: TransitionState>(state: &S) -> bool;

    /// Number of gold arcs that become unreachable when `action` is taken.
    fn cost<S: TransitionState>(
        action: Action,
        state: &S,
        gold_heads: &[Index],
        gold_labels: &[Index],
    ) -> u32;

    fn get_oracle<S: TransitionState>(
        state: &S,
        gold_heads: &[Index],
        gold_labels: &[Index],
    ) -> Option<Action>;
}
