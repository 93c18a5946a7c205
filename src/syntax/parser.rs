use std::cmp::Ordering;
use std::collections::VecDeque;

use rand::Rng;

use crate::config::{Config, ExplorationConfig};
use crate::error::{Error, Result};
use crate::preprocessing::TransitionVocab;
use crate::syntax::graph::Graph;
use crate::syntax::transition::oracle::MAX_PREDICTABLE_COST;
use crate::syntax::transition::prelude::*;
use crate::syntax::transition::{ArcEager, ArcEagerAction, Index, State};
use crate::utils::rand::{derive_seed, resolve_seed, seeded_rng};

/// Produces one score per entry of the transition vocabulary.
pub trait Scorer {
    fn score(&mut self, state: &State, graph: &Graph) -> Result<Vec<f32>>;
}

impl<F> Scorer for F
where
    F: FnMut(&State, &Graph) -> Result<Vec<f32>>,
{
    fn score(&mut self, state: &State, graph: &Graph) -> Result<Vec<f32>> {
        self(state, graph)
    }
}

/// Indices of `scores` from best to worst. NaN ranks last and ties keep index order.
pub fn rank(scores: &[f32]) -> Vec<usize> {
    let mut indices = (0..scores.len()).collect::<Vec<_>>();
    indices.sort_by(|&a, &b| {
        let (x, y) = (scores[a], scores[b]);
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        }
    });
    indices
}

/// Decides whether a training step follows the scorer instead of the oracle. Epochs
/// count from 1; `sentence` is the fingerprint of the graph being trained on.
pub trait Exploration {
    fn explore(&mut self, epoch: u32, sentence: u64, step: usize) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoExploration;

impl Exploration for NoExploration {
    fn explore(&mut self, _epoch: u32, _sentence: u64, _step: usize) -> bool {
        false
    }
}

/// Explores with a fixed probability once the warm-up epochs are over. Each decision is
/// drawn from a stream seeded by `(seed, epoch, sentence, step)`, so it does not depend
/// on the order sentences are visited in.
#[derive(Clone, Copy, Debug)]
pub struct SeededExploration {
    warmup_epochs: u32,
    probability: f64,
    seed: u64,
}

impl SeededExploration {
    pub fn new(warmup_epochs: u32, probability: f64, seed: u64) -> Self {
        SeededExploration {
            warmup_epochs,
            probability,
            seed,
        }
    }

    pub fn from_config(config: &ExplorationConfig) -> Result<Self> {
        let seed = resolve_seed(config.seed)?;
        Ok(SeededExploration::new(
            config.warmup_epochs,
            config.probability,
            seed,
        ))
    }
}

impl Exploration for SeededExploration {
    fn explore(&mut self, epoch: u32, sentence: u64, step: usize) -> bool {
        if epoch <= self.warmup_epochs {
            return false;
        }
        let mut rng = seeded_rng(derive_seed(self.seed, (epoch, sentence, step)));
        rng.gen::<f64>() < self.probability
    }
}

/// Replays a fixed sequence of decisions, then stops exploring.
#[derive(Clone, Debug, Default)]
pub struct ScriptedExploration(VecDeque<bool>);

impl ScriptedExploration {
    pub fn new<I: IntoIterator<Item = bool>>(decisions: I) -> Self {
        ScriptedExploration(decisions.into_iter().collect())
    }
}

impl Exploration for ScriptedExploration {
    fn explore(&mut self, _epoch: u32, _sentence: u64, _step: usize) -> bool {
        self.0.pop_front().unwrap_or(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainStep {
    /// Highest-ranked zero-cost pair, the training target.
    pub gold: ArcEagerAction,
    pub gold_index: usize,
    /// Highest-ranked pair within the predictable cost.
    pub predicted: ArcEagerAction,
    pub predicted_index: usize,
    pub applied: ArcEagerAction,
    pub need_update: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainOutcome {
    pub steps: Vec<TrainStep>,
    pub errors: usize,
}

impl TrainOutcome {
    /// Vocabulary indices of the gold pair at each step.
    pub fn targets(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.gold_index).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Drives the arc-eager system with a scorer, for training (with the dynamic oracle)
/// and for inference.
#[derive(Debug)]
pub struct Parser<'a> {
    vocab: &'a TransitionVocab,
    max_predictable_cost: u32,
}

impl<'a> Parser<'a> {
    pub fn new(vocab: &'a TransitionVocab) -> Self {
        Parser {
            vocab,
            max_predictable_cost: MAX_PREDICTABLE_COST,
        }
    }

    pub fn from_config(vocab: &'a TransitionVocab, config: &Config) -> Self {
        Parser {
            vocab,
            max_predictable_cost: config.max_predictable_cost,
        }
    }

    pub fn vocab(&self) -> &'a TransitionVocab {
        self.vocab
    }

    fn rank_actions<S: Scorer>(
        &self,
        scorer: &mut S,
        state: &State,
        graph: &Graph,
    ) -> Result<Vec<usize>> {
        let scores = scorer.score(state, graph)?;
        if scores.len() != self.vocab.len() {
            return Err(Error::ScoreDimension {
                expected: self.vocab.len(),
                actual: scores.len(),
            });
        }
        Ok(rank(&scores))
    }

    #[inline]
    fn action(&self, index: usize) -> Result<ArcEagerAction> {
        self.vocab
            .action(index)
            .ok_or_else(|| Error::invalid_argument(format!("no transition at index {}", index)))
    }

    /// Performs one training step against the gold tree given by `gold_heads` and
    /// `gold_labels` (indexed by id).
    pub fn train_step<S: Scorer, E: Exploration>(
        &self,
        state: &mut State,
        graph: &Graph,
        gold_heads: &[Index],
        gold_labels: &[Index],
        scorer: &mut S,
        exploration: &mut E,
        epoch: u32,
    ) -> Result<TrainStep> {
        let ranked = self.rank_actions(scorer, state, graph)?;
        let mut predicted = None;
        let mut gold = None;
        for &index in &ranked {
            let action = self.action(index)?;
            let cost = ArcEager::cost(action.into_action(), state, gold_heads, gold_labels);
            if cost > self.max_predictable_cost {
                continue;
            }
            if predicted.is_none() {
                predicted = Some((index, action));
            }
            if cost == 0 {
                gold = Some((index, action));
                break;
            }
        }
        let step = state.step();
        let (gold_index, gold) = gold.ok_or(Error::OracleExhausted { step })?;
        let (predicted_index, predicted) = predicted.unwrap_or((gold_index, gold));
        let applied = if exploration.explore(epoch, graph.fingerprint(), step) {
            predicted
        } else {
            gold
        };
        debug_assert!(ArcEager::is_allowed(applied.into_action(), state));
        ArcEager::apply(applied.into_action(), state)?;
        Ok(TrainStep {
            gold,
            gold_index,
            predicted,
            predicted_index,
            applied,
            need_update: gold_index != predicted_index,
        })
    }

    /// Runs training steps over `graph` until the configuration is terminal.
    pub fn train_sentence<S: Scorer, E: Exploration>(
        &self,
        graph: &Graph,
        scorer: &mut S,
        exploration: &mut E,
        epoch: u32,
    ) -> Result<TrainOutcome> {
        let (heads, labels) = self.vocab.gold_arcs(graph)?;
        let num_tokens = graph.len();
        let mut state =
            State::with_capacity(num_tokens as u32, ArcEager::estimate_num_actions(num_tokens));
        let mut outcome = TrainOutcome::default();
        while !ArcEager::is_terminal(&state) {
            let step = self.train_step(
                &mut state,
                graph,
                &heads,
                &labels,
                scorer,
                exploration,
                epoch,
            )?;
            if step.need_update {
                outcome.errors += 1;
            }
            outcome.steps.push(step);
        }
        Ok(outcome)
    }

    /// Applies the highest-ranked legal pair.
    pub fn parse_step<S: Scorer>(
        &self,
        state: &mut State,
        graph: &Graph,
        scorer: &mut S,
    ) -> Result<ArcEagerAction> {
        let ranked = self.rank_actions(scorer, state, graph)?;
        for index in ranked {
            let action = self.action(index)?;
            if ArcEager::is_allowed(action.into_action(), state) {
                ArcEager::apply(action.into_action(), state)?;
                return Ok(action);
            }
        }
        Err(Error::NoLegalTransition { step: state.step() })
    }

    /// Parses `graph` and stores the predicted arcs on its nodes.
    pub fn parse<S: Scorer>(&self, graph: &mut Graph, scorer: &mut S) -> Result<State> {
        let num_tokens = graph.len();
        let mut state =
            State::with_capacity(num_tokens as u32, ArcEager::estimate_num_actions(num_tokens));
        while !ArcEager::is_terminal(&state) {
            self.parse_step(&mut state, graph, scorer)?;
        }
        graph.apply_state(&state, self.vocab.labels())?;
        Ok(state)
    }
}

/// Scores zero-cost pairs with `1.0` and everything else with `0.0`, using the gold
/// arcs of the graph being parsed.
#[derive(Debug)]
pub struct OracleScorer<'a> {
    vocab: &'a TransitionVocab,
}

impl<'a> OracleScorer<'a> {
    pub fn new(vocab: &'a TransitionVocab) -> Self {
        OracleScorer { vocab }
    }
}

impl<'a> Scorer for OracleScorer<'a> {
    fn score(&mut self, state: &State, graph: &Graph) -> Result<Vec<f32>> {
        let (heads, labels) = self.vocab.gold_arcs(graph)?;
        Ok(self
            .vocab
            .actions()
            .iter()
            .map(|a| {
                if ArcEager::cost(a.into_action(), state, &heads, &labels) == 0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::graph::Node;
    use crate::syntax::transition::TransitionKind;

    fn sample() -> Graph {
        Graph::new(vec![
            Node::with_gold(1, "John", 2, "nsubj"),
            Node::with_gold(2, "loves", 0, "root"),
            Node::with_gold(3, "Mary", 2, "obj"),
        ])
        .unwrap()
    }

    fn uniform(n: usize) -> impl FnMut(&State, &Graph) -> Result<Vec<f32>> {
        move |_: &State, _: &Graph| Ok(vec![0.0; n])
    }

    #[test]
    fn test_rank() {
        assert_eq!(rank(&[0.1, 0.5, std::f32::NAN, 0.5, -1.0]), vec![1, 3, 0, 4, 2]);
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn test_oracle_scorer_reproduces_gold() {
        let mut graph = sample();
        let vocab = TransitionVocab::fit(vec![&graph]).unwrap();
        let parser = Parser::new(&vocab);
        let mut scorer = OracleScorer::new(&vocab);
        let state = parser.parse(&mut graph, &mut scorer).unwrap();
        assert_eq!(state.step(), 6);
        for node in graph.tokens() {
            assert_eq!(node.predicted_parent(), node.gold_parent());
            assert_eq!(node.predicted_label(), node.gold_label());
        }
        assert_eq!(graph.node(2).unwrap().left_children(), &[1]);
        assert_eq!(graph.node(2).unwrap().right_children(), &[3]);
    }

    #[test]
    fn test_train_sentence_without_exploration() {
        let graph = sample();
        let vocab = TransitionVocab::fit(vec![&graph]).unwrap();
        let parser = Parser::new(&vocab);
        let mut scorer = uniform(vocab.len());
        let outcome = parser
            .train_sentence(&graph, &mut scorer, &mut NoExploration, 1)
            .unwrap();
        assert_eq!(outcome.len(), 6);
        assert!(outcome.steps.iter().all(|s| s.applied == s.gold));
        // uniform scores predict the legal pair with the lowest index
        let kinds = outcome
            .steps
            .iter()
            .map(|s| s.gold.kind())
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                TransitionKind::Shift,
                TransitionKind::LeftArc,
                TransitionKind::Shift,
                TransitionKind::RightArc,
                TransitionKind::Reduce,
                TransitionKind::LeftArc,
            ]
        );
        assert_eq!(outcome.errors, 3);
        assert_eq!(outcome.targets(), vec![0, 2, 0, 4, 1, 3]);
    }

    #[test]
    fn test_exploration_follows_scorer() {
        let graph = sample();
        let vocab = TransitionVocab::fit(vec![&graph]).unwrap();
        let parser = Parser::new(&vocab);
        let mut scorer = uniform(vocab.len());
        let mut state = State::new(3);
        let (heads, labels) = vocab.gold_arcs(&graph).unwrap();
        let mut exploration = ScriptedExploration::new(vec![false, true]);
        let first = parser
            .train_step(&mut state, &graph, &heads, &labels, &mut scorer, &mut exploration, 3)
            .unwrap();
        assert_eq!(first.applied, ArcEagerAction::Shift);
        assert!(!first.need_update);
        // John on the stack: SHIFT is predictable but the target is LEFTARC(nsubj)
        let second = parser
            .train_step(&mut state, &graph, &heads, &labels, &mut scorer, &mut exploration, 3)
            .unwrap();
        assert_eq!(second.predicted, ArcEagerAction::Shift);
        assert_eq!(second.gold, ArcEagerAction::LeftArc(vocab.label_id("nsubj")));
        assert_eq!(second.applied, ArcEagerAction::Shift);
        assert!(second.need_update);
        assert_eq!(state.stack_items(), &[1, 2]);
    }

    #[test]
    fn test_score_dimension_is_checked() {
        let mut graph = sample();
        let vocab = TransitionVocab::fit(vec![&graph]).unwrap();
        let parser = Parser::new(&vocab);
        let mut scorer = uniform(vocab.len() + 1);
        match parser.parse(&mut graph, &mut scorer) {
            Err(Error::ScoreDimension { expected, actual }) => {
                assert_eq!(expected, vocab.len());
                assert_eq!(actual, vocab.len() + 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_seeded_exploration_respects_warmup() {
        let mut exploration = SeededExploration::new(2, 1.0, 7);
        assert!(!exploration.explore(1, 11, 0));
        assert!(!exploration.explore(2, 11, 0));
        assert!(exploration.explore(3, 11, 0));
        let mut never = SeededExploration::new(0, 0.0, 7);
        assert!(!never.explore(5, 11, 0));
    }

    #[test]
    fn test_seeded_exploration_ignores_call_order() {
        let mut exploration = SeededExploration::new(0, 0.5, 7);
        let forward = (0..64)
            .map(|step| exploration.explore(2, 11, step))
            .collect::<Vec<_>>();
        for step in 0..64 {
            exploration.explore(2, 12, step);
        }
        let mut backward = (0..64)
            .rev()
            .map(|step| exploration.explore(2, 11, step))
            .collect::<Vec<_>>();
        backward.reverse();
        assert_eq!(forward, backward);
        assert!(forward.contains(&true) && forward.contains(&false));

        let other = (0..64)
            .map(|step| exploration.explore(2, 12, step))
            .collect::<Vec<_>>();
        assert_ne!(forward, other);
        let next_epoch = (0..64)
            .map(|step| exploration.explore(3, 11, step))
            .collect::<Vec<_>>();
        assert_ne!(forward, next_epoch);
    }
}
