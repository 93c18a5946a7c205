use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::syntax::graph::{Graph, Node};
use crate::syntax::projectivity::strip_marker;
use crate::syntax::transition::Index;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Comparison {
    pub attach: bool,
    pub label: bool,
}

fn compare_arcs(
    predicted: (Option<Index>, Option<&str>),
    gold: (Option<Index>, Option<&str>),
    marker: char,
) -> Comparison {
    let attach = match (predicted.0, gold.0) {
        (Some(p), Some(g)) => p == g,
        _ => false,
    };
    let label = match (predicted.1, gold.1) {
        (Some(p), Some(g)) => strip_marker(p, marker) == strip_marker(g, marker),
        _ => false,
    };
    Comparison { attach, label }
}

/// Compares the predicted attachment of `node` with its gold attachment. Markers are
/// stripped from both labels; a missing prediction counts as wrong.
pub fn compare(node: &Node, marker: char) -> Comparison {
    compare_arcs(
        (node.predicted_parent(), node.predicted_label()),
        (node.gold_parent(), node.gold_label()),
        marker,
    )
}

/// Attachment and label counts over any number of tokens.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub total: usize,
    pub right_attach: usize,
    pub right_label: usize,
    pub right_labeled_attach: usize,
}

#[inline]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (10000.0 * count as f64 / total as f64).round() / 100.0
}

impl Scores {
    pub fn new() -> Self {
        Scores::default()
    }

    pub fn add_comparison(&mut self, comparison: Comparison) {
        self.total += 1;
        if comparison.attach {
            self.right_attach += 1;
        }
        if comparison.label {
            self.right_label += 1;
        }
        if comparison.attach && comparison.label {
            self.right_labeled_attach += 1;
        }
    }

    pub fn add_graph(&mut self, graph: &Graph, marker: char) {
        for node in graph.tokens() {
            self.add_comparison(compare(node, marker));
        }
    }

    pub fn from_graph(graph: &Graph, marker: char) -> Self {
        let mut scores = Scores::new();
        scores.add_graph(graph, marker);
        scores
    }

    pub fn merge(&mut self, other: &Scores) {
        self.total += other.total;
        self.right_attach += other.right_attach;
        self.right_label += other.right_label;
        self.right_labeled_attach += other.right_labeled_attach;
    }

    pub fn uas(&self) -> f64 {
        percentage(self.right_attach, self.total)
    }

    pub fn las(&self) -> f64 {
        percentage(self.right_labeled_attach, self.total)
    }

    pub fn ls(&self) -> f64 {
        percentage(self.right_label, self.total)
    }
}

impl Add for Scores {
    type Output = Scores;

    fn add(mut self, other: Scores) -> Scores {
        self.merge(&other);
        self
    }
}

impl AddAssign for Scores {
    fn add_assign(&mut self, other: Scores) {
        self.merge(&other);
    }
}

impl Sum for Scores {
    fn sum<I: Iterator<Item = Scores>>(iter: I) -> Scores {
        iter.fold(Scores::new(), Add::add)
    }
}

impl<'a> Sum<&'a Scores> for Scores {
    fn sum<I: Iterator<Item = &'a Scores>>(iter: I) -> Scores {
        iter.fold(Scores::new(), |mut acc, s| {
            acc.merge(s);
            acc
        })
    }
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "UAS: {:.2}%, LAS: {:.2}%, LS: {:.2}% ({} tokens)",
            self.uas(),
            self.las(),
            self.ls(),
            self.total
        )
    }
}

/// Scores the annotations of `predicted`, as read from a corpus, against those of `gold`.
/// Both graphs must hold the same tokens.
pub fn evaluate(gold: &Graph, predicted: &Graph, marker: char) -> Result<Scores> {
    if gold.len() != predicted.len() {
        return Err(Error::invalid_argument(format!(
            "sentence lengths differ: {} and {}",
            gold.len(),
            predicted.len()
        )));
    }
    let mut scores = Scores::new();
    for (g, p) in gold.tokens().iter().zip(predicted.tokens()) {
        scores.add_comparison(compare_arcs(
            (p.gold_parent(), p.gold_label()),
            (g.gold_parent(), g.gold_label()),
            marker,
        ));
    }
    Ok(scores)
}
