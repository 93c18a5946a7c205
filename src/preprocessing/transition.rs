use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::serialize::{self, Format};
use crate::preprocessing::Vocab;
use crate::syntax::graph::{Graph, ROOT};
use crate::syntax::transition::{Action, ArcEagerAction, Index};

/// The fixed set of (transition, label) pairs a scorer produces scores for.
///
/// Index `0` is SHIFT and index `1` is REDUCE; the arc transitions observed in the
/// training corpus follow in order of first occurrence.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "TransitionVocabData", into = "TransitionVocabData")]
pub struct TransitionVocab {
    labels: Vocab,
    actions: Vec<ArcEagerAction>,
    indices: HashMap<Action, usize>,
}

#[derive(Serialize, Deserialize)]
struct TransitionVocabData {
    labels: Vocab,
    actions: Vec<Action>,
}

impl From<TransitionVocabData> for TransitionVocab {
    fn from(data: TransitionVocabData) -> Self {
        TransitionVocab::with_actions(
            data.labels,
            data.actions.into_iter().map(ArcEagerAction::from_action),
        )
    }
}

impl From<TransitionVocab> for TransitionVocabData {
    fn from(vocab: TransitionVocab) -> Self {
        TransitionVocabData {
            labels: vocab.labels,
            actions: vocab.actions.iter().map(|a| a.into_action()).collect(),
        }
    }
}

impl TransitionVocab {
    fn with_actions<I: IntoIterator<Item = ArcEagerAction>>(labels: Vocab, actions: I) -> Self {
        let mut vocab = TransitionVocab {
            labels,
            actions: vec![],
            indices: HashMap::new(),
        };
        for action in actions {
            vocab.insert(action);
        }
        vocab
    }

    fn insert(&mut self, action: ArcEagerAction) {
        let code = action.into_action();
        if !self.indices.contains_key(&code) {
            self.indices.insert(code, self.actions.len());
            self.actions.push(action);
        }
    }

    /// Builds the vocabulary from gold-annotated (projectivized) graphs.
    pub fn fit<'a, I: IntoIterator<Item = &'a Graph>>(graphs: I) -> Result<Self> {
        let mut vocab = TransitionVocab::with_actions(
            Vocab::new(),
            vec![ArcEagerAction::Shift, ArcEagerAction::Reduce],
        );
        for graph in graphs {
            let (heads, labels) = graph.gold_arcs()?;
            for id in 1..heads.len() {
                let label = vocab.labels.add(labels[id]);
                let head = heads[id];
                if head == ROOT || (id as Index) < head {
                    vocab.insert(ArcEagerAction::LeftArc(label));
                } else {
                    vocab.insert(ArcEagerAction::RightArc(label));
                }
            }
        }
        Ok(vocab)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[ArcEagerAction] {
        &self.actions
    }

    pub fn action(&self, index: usize) -> Option<ArcEagerAction> {
        self.actions.get(index).cloned()
    }

    pub fn index_of(&self, action: ArcEagerAction) -> Option<usize> {
        self.indices.get(&action.into_action()).cloned()
    }

    pub fn labels(&self) -> &Vocab {
        &self.labels
    }

    /// Label id of `label`, the unknown id when it was never observed.
    pub fn label_id(&self, label: &str) -> Index {
        self.labels.get(label)
    }

    /// Gold heads and label ids of `graph`, indexed by id.
    pub fn gold_arcs(&self, graph: &Graph) -> Result<(Vec<Index>, Vec<Index>)> {
        let (heads, labels) = graph.gold_arcs()?;
        let labels = labels.into_iter().map(|l| self.label_id(l)).collect();
        Ok((heads, labels))
    }

    /// Human-readable name of the pair, e.g. `LEFTARC(nsubj)`.
    pub fn name(&self, action: ArcEagerAction) -> String {
        match action.label() {
            Some(label) => format!(
                "{}({})",
                action.kind(),
                self.labels.lookup(label).unwrap_or("?")
            ),
            None => action.kind().to_string(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serialize::save(self, path, Format::JsonPretty)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let vocab: TransitionVocab = serialize::load(path, Format::Json)?;
        match (vocab.action(0), vocab.action(1)) {
            (Some(ArcEagerAction::Shift), Some(ArcEagerAction::Reduce)) => Ok(vocab),
            _ => Err(Error::invalid_argument(
                "transition vocabulary must start with SHIFT and REDUCE",
            )),
        }
    }
}
