use std::fmt::Debug;

use rand::rngs::StdRng;
use slog::Logger;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::logging;
use crate::preprocessing::TransitionVocab;
use crate::syntax::eval::Scores;
use crate::syntax::graph::Graph;
use crate::syntax::parser::{Exploration, Parser, Scorer, TrainOutcome};
use crate::syntax::projectivity::PseudoProjective;
use crate::utils::rand::{resolve_seed, seeded_rng, DEFAULT_SEED};

pub mod callbacks;

/// A model that scores transitions and learns from the steps of a training sentence.
pub trait Learn: Scorer {
    /// Updates the model from the outcome of one sentence and returns its loss.
    fn learn(&mut self, graph: &Graph, outcome: &TrainOutcome) -> Result<f32>;
}

#[derive(Debug)]
pub struct Trainer<'a, M, E> {
    parser: Parser<'a>,
    model: M,
    exploration: E,
    transform: PseudoProjective,
    shuffle: bool,
    n_epochs: u32,
    rng: StdRng,
    logger: Logger,
    callbacks: Vec<(u32, usize, String, Box<dyn Callback>)>,
}

impl<'a, M: Learn, E: Exploration> Trainer<'a, M, E> {
    pub fn new(vocab: &'a TransitionVocab, model: M, exploration: E) -> Self {
        Trainer {
            parser: Parser::new(vocab),
            model,
            exploration,
            transform: PseudoProjective::default(),
            shuffle: false,
            n_epochs: Config::default().n_epochs,
            rng: seeded_rng(DEFAULT_SEED),
            logger: logging::discard(),
            callbacks: vec![],
        }
    }

    pub fn from_config(
        vocab: &'a TransitionVocab,
        model: M,
        exploration: E,
        config: &Config,
    ) -> Result<Self> {
        let seed = resolve_seed(config.exploration.seed)?;
        Ok(Trainer {
            parser: Parser::from_config(vocab, config),
            model,
            exploration,
            transform: PseudoProjective::from_config(config),
            shuffle: config.shuffle,
            n_epochs: config.n_epochs,
            rng: seeded_rng(seed),
            logger: logging::discard(),
            callbacks: vec![],
        })
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Trains for the configured number of epochs.
    pub fn train(
        &mut self,
        train_dataset: &mut Dataset<Graph>,
        valid_dataset: Option<&Dataset<Graph>>,
    ) -> Result<Vec<TrainingInfo>> {
        let n_epochs = self.n_epochs;
        self.fit(train_dataset, valid_dataset, n_epochs)
    }

    /// Trains for `n_epochs` epochs (counted from 1) on projectivized `train_dataset`.
    /// `valid_dataset` holds gold trees in their original form; it is parsed, the
    /// predictions are deprojectivized and scored after every epoch.
    pub fn fit(
        &mut self,
        train_dataset: &mut Dataset<Graph>,
        valid_dataset: Option<&Dataset<Graph>>,
        n_epochs: u32,
    ) -> Result<Vec<TrainingInfo>> {
        self.callbacks
            .sort_by(|cb1, cb2| (-(cb1.0 as i64), cb1.1).cmp(&(-(cb2.0 as i64), cb2.1)));
        let mut history = Vec::with_capacity(n_epochs as usize);

        for epoch in 1..n_epochs + 1 {
            let mut info = TrainingInfo::new(n_epochs, epoch, train_dataset.len(), true);
            self.notify(Event::EpochBegin, &info);
            debug!(self.logger, "epoch {} / {}", epoch, n_epochs);

            if self.shuffle {
                train_dataset.shuffle(&mut self.rng);
            }
            self.notify(Event::EpochTrainBegin, &info);
            self.train_epoch(train_dataset, &mut info)?;
            self.notify(Event::EpochTrainEnd, &info);

            if let Some(v_data) = valid_dataset {
                let mut valid_info = TrainingInfo::new(n_epochs, epoch, v_data.len(), false);
                self.notify(Event::EpochValidateBegin, &valid_info);
                valid_info.scores = Some(self.validate(v_data)?);
                self.notify(Event::EpochValidateEnd, &valid_info);
                info.scores = valid_info.scores;
            }
            self.notify(Event::EpochEnd, &info);
            history.push(info);
        }
        Ok(history)
    }

    fn train_epoch(&mut self, dataset: &Dataset<Graph>, info: &mut TrainingInfo) -> Result<()> {
        let mut total_loss = 0.0;
        for (index, graph) in dataset.iter().enumerate() {
            let outcome = self.parser.train_sentence(
                graph,
                &mut self.model,
                &mut self.exploration,
                info.epoch,
            )?;
            let loss = self.model.learn(graph, &outcome)?;
            total_loss += loss;
            info.steps += outcome.len();
            info.errors += outcome.errors;
            info.sentence_index = Some(index);
            info.sentence_loss = Some(loss);
            self.notify(Event::SentenceEnd, info);
        }
        info.sentence_index = None;
        info.sentence_loss = None;
        info.loss = Some(if dataset.is_empty() {
            0.0
        } else {
            total_loss / dataset.len() as f32
        });
        Ok(())
    }

    /// Parses every sentence of `dataset` and scores the deprojectivized predictions.
    pub fn validate(&mut self, dataset: &Dataset<Graph>) -> Result<Scores> {
        let mut scores = Scores::new();
        for gold in dataset.iter() {
            let mut graph = gold.clone();
            self.parser.parse(&mut graph, &mut self.model)?;
            self.transform.deprojectivize(&mut graph)?;
            scores.add_graph(&graph, self.transform.marker());
        }
        Ok(scores)
    }

    pub fn add_callback<S: Into<String>, C: Callback + 'static>(&mut self, name: S, callback: C) {
        self.add_callback_with_priority(name, callback, 1000);
    }

    /// Callbacks with a higher priority are notified first; equal priorities keep
    /// insertion order. A callback with the same name is replaced.
    pub fn add_callback_with_priority<S: Into<String>, C: Callback + 'static>(
        &mut self,
        name: S,
        callback: C,
        priority: u32,
    ) {
        let name = name.into();
        self.remove_callback(&name);
        let index = self.callbacks.len();
        self.callbacks
            .push((priority, index, name, Box::new(callback)));
    }

    pub fn has_callback(&self, name: &str) -> bool {
        self.callbacks.iter().any(|cb| cb.2 == name)
    }

    pub fn remove_callback(&mut self, name: &str) {
        if let Some(i) = self.callbacks.iter().position(|cb| cb.2 == name) {
            self.callbacks.remove(i);
        }
    }

    fn notify(&mut self, event: Event, info: &TrainingInfo) {
        for cb in self.callbacks.iter_mut() {
            let callback = &mut cb.3;
            match event {
                Event::EpochBegin => callback.on_epoch_begin(info),
                Event::EpochEnd => callback.on_epoch_end(info),
                Event::EpochTrainBegin => callback.on_epoch_train_begin(info),
                Event::EpochTrainEnd => callback.on_epoch_train_end(info),
                Event::EpochValidateBegin => callback.on_epoch_validate_begin(info),
                Event::EpochValidateEnd => callback.on_epoch_validate_end(info),
                Event::SentenceEnd => callback.on_sentence_end(info),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingInfo {
    pub n_epochs: u32,
    pub epoch: u32,
    pub data_size: usize,
    pub train: bool,
    /// Mean loss per sentence, set when the training pass ends.
    pub loss: Option<f32>,
    pub steps: usize,
    pub errors: usize,
    pub scores: Option<Scores>,
    pub sentence_index: Option<usize>,
    pub sentence_loss: Option<f32>,
}

impl TrainingInfo {
    fn new(n_epochs: u32, epoch: u32, data_size: usize, train: bool) -> Self {
        TrainingInfo {
            n_epochs,
            epoch,
            data_size,
            train,
            loss: None,
            steps: 0,
            errors: 0,
            scores: None,
            sentence_index: None,
            sentence_loss: None,
        }
    }

    /// Share of training steps whose gold transition was not ranked first.
    pub fn error_rate(&self) -> Option<f64> {
        if self.steps > 0 {
            Some(self.errors as f64 / self.steps as f64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    EpochBegin,
    EpochEnd,
    EpochTrainBegin,
    EpochTrainEnd,
    EpochValidateBegin,
    EpochValidateEnd,
    SentenceEnd,
}

#[allow(unused_variables)]
pub trait Callback: Debug {
    fn on_epoch_begin(&mut self, info: &TrainingInfo) {}
    fn on_epoch_end(&mut self, info: &TrainingInfo) {}
    fn on_epoch_train_begin(&mut self, info: &TrainingInfo) {}
    fn on_epoch_train_end(&mut self, info: &TrainingInfo) {}
    fn on_epoch_validate_begin(&mut self, info: &TrainingInfo) {}
    fn on_epoch_validate_end(&mut self, info: &TrainingInfo) {}
    fn on_sentence_end(&mut self, info: &TrainingInfo) {}
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::syntax::graph::Node;
    use crate::syntax::parser::{NoExploration, OracleScorer, ScriptedExploration};
    use crate::syntax::transition::State;

    #[derive(Debug)]
    struct OracleModel<'a> {
        scorer: OracleScorer<'a>,
        updates: usize,
    }

    impl<'a> Scorer for OracleModel<'a> {
        fn score(&mut self, state: &State, graph: &Graph) -> Result<Vec<f32>> {
            self.scorer.score(state, graph)
        }
    }

    impl<'a> Learn for OracleModel<'a> {
        fn learn(&mut self, _graph: &Graph, outcome: &TrainOutcome) -> Result<f32> {
            self.updates += 1;
            Ok(outcome.errors as f32)
        }
    }

    #[derive(Debug, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Callback for Recorder {
        fn on_epoch_train_begin(&mut self, info: &TrainingInfo) {
            self.0.borrow_mut().push(format!("train_begin {}", info.epoch));
        }

        fn on_sentence_end(&mut self, info: &TrainingInfo) {
            self.0
                .borrow_mut()
                .push(format!("sentence {:?}", info.sentence_index));
        }

        fn on_epoch_validate_end(&mut self, info: &TrainingInfo) {
            let las = info.scores.as_ref().map(|s| s.las()).unwrap_or(-1.0);
            self.0.borrow_mut().push(format!("validate {}", las));
        }
    }

    fn corpus() -> Dataset<Graph> {
        Dataset::from_items(vec![
            Graph::new(vec![
                Node::with_gold(1, "John", 2, "nsubj"),
                Node::with_gold(2, "loves", 0, "root"),
                Node::with_gold(3, "Mary", 2, "obj"),
            ])
            .unwrap(),
            Graph::new(vec![
                Node::with_gold(1, "It", 2, "nsubj"),
                Node::with_gold(2, "rains", 0, "root"),
            ])
            .unwrap(),
        ])
    }

    #[test]
    fn test_fit_with_oracle_model() {
        let mut train = corpus();
        let valid = corpus();
        let vocab = TransitionVocab::fit(train.iter()).unwrap();
        let model = OracleModel {
            scorer: OracleScorer::new(&vocab),
            updates: 0,
        };
        let events = Rc::new(RefCell::new(vec![]));
        let mut trainer = Trainer::new(&vocab, model, NoExploration);
        trainer.add_callback("recorder", Recorder(events.clone()));
        let history = trainer.fit(&mut train, Some(&valid), 2).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].loss, Some(0.0));
        assert_eq!(history[0].steps, 10);
        assert_eq!(history[0].error_rate(), Some(0.0));
        assert_eq!(history[1].scores.as_ref().unwrap().las(), 100.0);
        assert_eq!(trainer.model().updates, 4);
        assert_eq!(
            *events.borrow(),
            vec![
                "train_begin 1",
                "sentence Some(0)",
                "sentence Some(1)",
                "validate 100",
                "train_begin 2",
                "sentence Some(0)",
                "sentence Some(1)",
                "validate 100",
            ]
        );
    }

    #[test]
    fn test_callback_registry() {
        let vocab = TransitionVocab::fit(corpus().iter()).unwrap();
        let model = OracleModel {
            scorer: OracleScorer::new(&vocab),
            updates: 0,
        };
        let mut trainer = Trainer::new(&vocab, model, ScriptedExploration::default());
        trainer.add_callback("a", Recorder::default());
        trainer.add_callback_with_priority("b", Recorder::default(), 10);
        trainer.add_callback("a", Recorder::default());
        assert!(trainer.has_callback("a"));
        assert!(trainer.has_callback("b"));
        assert_eq!(trainer.callbacks.len(), 2);
        trainer.remove_callback("a");
        assert!(!trainer.has_callback("a"));
    }
}
