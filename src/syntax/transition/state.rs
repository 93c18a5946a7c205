use std::u32::MAX as U32_MAX;

use super::{Action, Index, TransitionMutableState, TransitionState, TransitionSystem};
use crate::error::{Error, Result};
use crate::syntax::graph::ROOT;

#[inline]
fn default_capacity(num_tokens: usize) -> usize {
    2 * num_tokens
}

/// The parser configuration: stack, buffer pointer and the arcs built so far.
#[derive(Clone, Debug)]
pub struct State {
    num_tokens: Index,
    stack: Vec<Index>,
    buffer: Index,
    heads: Vec<Option<Index>>,
    labels: Vec<Option<Index>>,
    left_children: Vec<Vec<Index>>,
    right_children: Vec<Vec<Index>>,
    actions: Vec<Action>,
}

impl State {
    pub fn new(num_tokens: u32) -> Self {
        State::with_capacity(num_tokens, default_capacity(num_tokens as usize))
    }

    pub fn with_capacity(num_tokens: u32, capacity: usize) -> Self {
        let n = num_tokens as usize + 1;
        State {
            num_tokens,
            stack: Vec::with_capacity(n),
            buffer: 1,
            heads: vec![None; n],
            labels: vec![None; n],
            left_children: vec![vec![]; n],
            right_children: vec![vec![]; n],
            actions: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn is_token(&self, index: Index) -> bool {
        index >= 1 && index <= self.num_tokens
    }
}

impl TransitionState for State {
    fn step(&self) -> usize {
        self.actions.len()
    }

    fn num_tokens(&self) -> usize {
        self.num_tokens as usize
    }

    fn stack_top(&self) -> Option<Index> {
        self.stack.last().cloned()
    }

    fn stack(&self, position: Index) -> Option<Index> {
        let position = position as usize;
        let stack_size = self.stack.len();
        if position < stack_size {
            self.stack.get(stack_size - 1 - position).cloned()
        } else {
            None
        }
    }

    fn stack_items(&self) -> &[Index] {
        &self.stack
    }

    fn buffer_pointer(&self) -> Index {
        self.buffer
    }

    fn head(&self, index: Index) -> Option<Index> {
        if self.is_token(index) {
            return self.heads[index as usize];
        }
        None
    }

    fn heads(&self) -> &[Option<Index>] {
        &self.heads
    }

    fn label(&self, index: Index) -> Option<Index> {
        if self.is_token(index) {
            return self.labels[index as usize];
        }
        None
    }

    fn labels(&self) -> &[Option<Index>] {
        &self.labels
    }

    fn left_children(&self, index: Index) -> &[Index] {
        match self.left_children.get(index as usize) {
            Some(children) => children,
            None => &[],
        }
    }

    fn right_children(&self, index: Index) -> &[Index] {
        match self.right_children.get(index as usize) {
            Some(children) => children,
            None => &[],
        }
    }

    fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl TransitionMutableState for State {
    fn advance(&mut self) -> Result<()> {
        if self.buffer > self.num_tokens {
            return Err(Error::InvalidOperation("buffer is exhausted"));
        }
        self.buffer += 1;
        Ok(())
    }

    fn push(&mut self, index: Index) -> Result<()> {
        if !self.is_token(index) {
            return Err(Error::InvalidOperation("only tokens can be pushed"));
        }
        self.stack.push(index);
        Ok(())
    }

    fn pop(&mut self) -> Result<Index> {
        self.stack
            .pop()
            .ok_or(Error::InvalidOperation("stack is empty"))
    }

    fn add_arc(&mut self, index: Index, head: Index, label: Index) -> Result<()> {
        let head = if head == self.root_position() { ROOT } else { head };
        if !self.is_token(index) {
            Err(Error::InvalidOperation("dependent is not a token"))
        } else if head > self.num_tokens {
            Err(Error::InvalidOperation("head is out of range"))
        } else if index == head {
            Err(Error::InvalidOperation("a token cannot depend on itself"))
        } else {
            let val = &mut self.heads[index as usize];
            match *val {
                Some(_) => Err(Error::InvalidOperation("dependent already has a head")),
                None => {
                    *val = Some(head);
                    self.labels[index as usize] = Some(label);
                    let children = if index < head {
                        &mut self.left_children[head as usize]
                    } else {
                        &mut self.right_children[head as usize]
                    };
                    let pos = children.binary_search(&index).unwrap_or_else(|pos| pos);
                    children.insert(pos, index);
                    Ok(())
                }
            }
        }
    }

    fn record(&mut self, action: Action) -> Result<()> {
        self.actions.push(action);
        Ok(())
    }
}

/// A state driven to completion by the static oracle of `T`.
#[derive(Debug)]
pub struct GoldState {
    internal: State,
}

impl GoldState {
    pub fn new<T: TransitionSystem>(heads: &[Index], labels: &[Index]) -> Result<Self> {
        GoldState::with_feature_extract::<T, _, _>(heads, labels, |_| ()).map(|(state, _)| state)
    }

    pub fn with_feature_extract<T: TransitionSystem, FO, F: FnMut(&State) -> FO>(
        heads: &[Index],
        labels: &[Index],
        mut extract: F,
    ) -> Result<(Self, Vec<FO>)> {
        let n = heads.len();
        if n == 0 || n > (U32_MAX as usize) {
            Err(Error::invalid_argument(format!("invalid sentence length: {}", n)))
        } else if n != labels.len() {
            Err(Error::invalid_argument(format!(
                "length mismatch: {} heads and {} labels",
                n,
                labels.len()
            )))
        } else {
            let num_tokens = n - 1;
            let capacity = T::estimate_num_actions(num_tokens);
            let mut internal = State::with_capacity(num_tokens as u32, capacity);
            let mut features = Vec::with_capacity(capacity);
            while !T::is_terminal(&internal) {
                let action = T::get_oracle(&internal, heads, labels).ok_or(
                    Error::OracleExhausted {
                        step: internal.step(),
                    },
                )?;
                features.push(extract(&internal));
                T::apply(action, &mut internal)?;
            }
            Ok((GoldState { internal }, features))
        }
    }

    pub fn into_inner(self) -> State {
        self.internal
    }
}

impl TransitionState for GoldState {
    fn step(&self) -> usize {
        self.internal.step()
    }

    fn num_tokens(&self) -> usize {
        self.internal.num_tokens()
    }

    fn stack_top(&self) -> Option<Index> {
        self.internal.stack_top()
    }

    fn stack(&self, position: Index) -> Option<Index> {
        self.internal.stack(position)
    }

    fn stack_items(&self) -> &[Index] {
        self.internal.stack_items()
    }

    fn buffer_pointer(&self) -> Index {
        self.internal.buffer_pointer()
    }

    fn head(&self, index: Index) -> Option<Index> {
        self.internal.head(index)
    }

    fn heads(&self) -> &[Option<Index>] {
        self.internal.heads()
    }

    fn label(&self, index: Index) -> Option<Index> {
        self.internal.label(index)
    }

    fn labels(&self) -> &[Option<Index>] {
        self.internal.labels()
    }

    fn left_children(&self, index: Index) -> &[Index] {
        self.internal.left_children(index)
    }

    fn right_children(&self, index: Index) -> &[Index] {
        self.internal.right_children(index)
    }

    fn actions(&self) -> &[Action] {
        self.internal.actions()
    }
}
