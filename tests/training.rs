mod test_utils;

use std::collections::HashMap;
use std::io::Write as _;

use eagerdep::config::Config;
use eagerdep::dataset::{self, Dataset};
use eagerdep::logging;
use eagerdep::preprocessing::TransitionVocab;
use eagerdep::syntax::graph::Graph;
use eagerdep::syntax::parser::{NoExploration, SeededExploration, TrainOutcome};
use eagerdep::syntax::transition::prelude::*;
use eagerdep::syntax::transition::State;
use eagerdep::syntax::Scorer;
use eagerdep::training::callbacks::Reporter;
use eagerdep::training::{Learn, Trainer, TrainingInfo};
use tempfile::NamedTempFile;

use crate::test_utils::mock;

/// A structured perceptron over a handful of stack and buffer features.
#[derive(Debug)]
struct Perceptron {
    num_actions: usize,
    weights: HashMap<(String, usize), f32>,
    pending: Vec<Vec<String>>,
}

impl Perceptron {
    fn new(vocab: &TransitionVocab) -> Self {
        Perceptron {
            num_actions: vocab.len(),
            weights: HashMap::new(),
            pending: vec![],
        }
    }

    fn features(state: &State, graph: &Graph) -> Vec<String> {
        let s0 = graph.slot(state.stack_top());
        let b0 = graph.slot(state.buffer_head());
        vec![
            format!("s0.form={}", s0.form()),
            format!("b0.form={}", b0.form()),
            format!("s0.tag={}", s0.tag().unwrap_or("_")),
            format!("b0.tag={}", b0.tag().unwrap_or("_")),
            format!(
                "s0.tag+b0.tag={}+{}",
                s0.tag().unwrap_or("_"),
                b0.tag().unwrap_or("_")
            ),
            format!("s0.has_head={}", state.stack_top().and_then(|s| state.head(s)).is_some()),
        ]
    }
}

impl Scorer for Perceptron {
    fn score(&mut self, state: &State, graph: &Graph) -> eagerdep::Result<Vec<f32>> {
        if state.step() == 0 {
            self.pending.clear();
        }
        let features = Perceptron::features(state, graph);
        let scores = (0..self.num_actions)
            .map(|a| {
                features
                    .iter()
                    .map(|f| self.weights.get(&(f.clone(), a)).cloned().unwrap_or(0.0))
                    .sum()
            })
            .collect();
        self.pending.push(features);
        Ok(scores)
    }
}

impl Learn for Perceptron {
    fn learn(&mut self, _graph: &Graph, outcome: &TrainOutcome) -> eagerdep::Result<f32> {
        let pending = std::mem::replace(&mut self.pending, vec![]);
        assert_eq!(pending.len(), outcome.len());
        for (step, features) in outcome.steps.iter().zip(pending) {
            if !step.need_update {
                continue;
            }
            for f in features {
                *self.weights.entry((f.clone(), step.gold_index)).or_insert(0.0) += 1.0;
                *self.weights.entry((f, step.predicted_index)).or_insert(0.0) -= 1.0;
            }
        }
        Ok(outcome.errors as f32)
    }
}

fn corpus_file() -> NamedTempFile {
    let mut tmpfile = NamedTempFile::new().unwrap();
    write!(tmpfile.as_file_mut(), "{}", mock::provide_conll_text()).unwrap();
    tmpfile
}

fn errors(history: &[TrainingInfo]) -> Vec<usize> {
    history.iter().map(|info| info.errors).collect()
}

#[test]
fn test_perceptron_training() {
    let tmpfile = corpus_file();
    let logger = logging::discard();
    let mut config = Config::default();
    config.shuffle = false;
    let (mut train, vocab) =
        dataset::load_train_dataset(tmpfile.path(), &config, &logger).unwrap();
    let valid = dataset::load_test_dataset(tmpfile.path(), &logger).unwrap();

    let model = Perceptron::new(&vocab);
    let mut trainer = Trainer::from_config(&vocab, model, NoExploration, &config).unwrap();
    trainer.set_logger(logger.clone());
    trainer.add_callback("reporter", Reporter::new(logger.clone()));
    let history = trainer.fit(&mut train, Some(&valid), 8).unwrap();

    assert_eq!(history.len(), 8);
    let steps = 2 * valid.iter().map(|g| g.len()).sum::<usize>();
    assert!(history.iter().all(|info| info.steps == steps));
    let errors = errors(&history);
    assert!(errors[0] > 0);
    assert!(errors[7] <= errors[0], "errors: {:?}", errors);
    assert!(history.iter().all(|info| info.scores.map(|s| s.total) == Some(28)));
    assert!(!trainer.model().weights.is_empty());
}

#[test]
fn test_seeded_exploration_is_reproducible() {
    let tmpfile = corpus_file();
    let logger = logging::discard();
    let mut config = Config::default();
    config.exploration.seed = Some(17);
    config.exploration.warmup_epochs = 1;
    config.exploration.probability = 0.5;
    config.n_epochs = 4;

    let run = |config: &Config| {
        let (mut train, vocab) =
            dataset::load_train_dataset(tmpfile.path(), config, &logger).unwrap();
        let exploration = SeededExploration::from_config(&config.exploration).unwrap();
        let mut trainer =
            Trainer::from_config(&vocab, Perceptron::new(&vocab), exploration, config).unwrap();
        let history = trainer.train(&mut train, None).unwrap();
        assert_eq!(history.len(), 4);
        (
            errors(&history),
            history.iter().map(|info| info.loss).collect::<Vec<_>>(),
        )
    };
    let first = run(&config);
    let second = run(&config);
    assert_eq!(first, second);
}

#[test]
fn test_empty_dataset() {
    let vocab = TransitionVocab::fit(mock::provide_graphs().iter()).unwrap();
    let mut trainer = Trainer::new(&vocab, Perceptron::new(&vocab), NoExploration);
    let mut train: Dataset<Graph> = Dataset::new();
    let history = trainer.fit(&mut train, None, 2).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].loss, Some(0.0));
    assert_eq!(history[0].error_rate(), None);
}
