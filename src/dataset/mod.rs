use std::ops;
use std::path::Path;
use std::slice::{Iter, IterMut};

use rand::seq::SliceRandom;
use rand::Rng;
use slog::Logger;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::preprocessing::TransitionVocab;
use crate::syntax::graph::Graph;
use crate::syntax::projectivity::{self, PseudoProjective};

pub mod conll;

#[derive(Clone, Debug, Default)]
pub struct Dataset<T> {
    items: Vec<T>,
}

impl<T> Dataset<T> {
    pub fn new() -> Self {
        Dataset { items: vec![] }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Dataset { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn iter(&self) -> Iter<T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<T> {
        self.items.iter_mut()
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.items.shuffle(rng);
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> ops::Index<usize> for Dataset<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        ops::Index::index(&self.items, index)
    }
}

impl<T> ops::IndexMut<usize> for Dataset<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        ops::IndexMut::index_mut(&mut self.items, index)
    }
}

impl<T> ops::Index<ops::RangeFull> for Dataset<T> {
    type Output = [T];

    #[inline]
    fn index(&self, _index: ops::RangeFull) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a Dataset<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for Dataset<T> {
    type Item = T;
    type IntoIter = ::std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Reads a training corpus, projectivizes its gold trees and fits the action vocabulary
/// on the result. Sentences that cannot be read or projectivized are logged and skipped.
pub fn load_train_dataset<P: AsRef<Path>>(
    path: P,
    config: &Config,
    logger: &Logger,
) -> Result<(Dataset<Graph>, TransitionVocab)> {
    let transform = PseudoProjective::from_config(config);
    let reader = conll::Reader::open_with_logger(path.as_ref(), logger.clone())?;
    let mut dataset = Dataset::new();
    let mut skipped = 0;
    let mut lifted = 0;
    let mut lifts = 0;
    for (index, item) in reader.enumerate() {
        let mut graph = match item {
            Ok(graph) => graph,
            Err(e @ Error::Format { .. }) => {
                warn!(logger, "skip sentence {}: {}", index, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        match transform.projectivize(&mut graph) {
            Ok(n) => {
                if n > 0 {
                    lifted += 1;
                    lifts += n;
                }
                dataset.push(graph);
            }
            Err(e) => {
                warn!(logger, "skip sentence {}: {}", index, e);
                skipped += 1;
            }
        }
    }
    let vocab = TransitionVocab::fit(dataset.iter())?;
    info!(
        logger,
        "load train dataset: {} sentences, {} skipped, {} lifted ({} lifts), {} actions",
        dataset.len(),
        skipped,
        lifted,
        lifts,
        vocab.len()
    );
    Ok((dataset, vocab))
}

/// Restores the gold trees of a projectivized corpus. Sentences whose arcs do not form a
/// tree are logged and skipped.
pub fn deprojectivize_dataset(
    dataset: Dataset<Graph>,
    marker: char,
    logger: &Logger,
) -> Dataset<Graph> {
    let mut kept = Dataset::new();
    for (index, mut graph) in dataset.into_iter().enumerate() {
        let restored = graph.gold_arcs().and_then(|(heads, labels)| {
            projectivity::deprojectivize(&heads, &labels, marker)
        });
        match restored.and_then(|(heads, labels)| graph.set_gold_arcs(&heads, labels)) {
            Ok(()) => kept.push(graph),
            Err(e) => warn!(logger, "skip sentence {}: {}", index, e),
        }
    }
    kept
}

/// Reads a corpus for parsing or evaluation; malformed sentences are logged and skipped.
pub fn load_test_dataset<P: AsRef<Path>>(path: P, logger: &Logger) -> Result<Dataset<Graph>> {
    let items = conll::read_file(path.as_ref(), logger)?;
    info!(logger, "load test dataset: {} sentences", items.len());
    Ok(Dataset::from_items(items))
}
