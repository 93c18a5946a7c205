use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::preprocessing::Vocab;
use crate::syntax::transition::{Index, TransitionState};

pub const ROOT: Index = 0;

pub static ROOT_FORM: &'static str = "<ROOT>";
pub static ROOT_LABEL: &'static str = "__ROOT__";
pub static PAD_FORM: &'static str = "__PAD__";

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: Index,
    form: String,
    lemma: Option<String>,
    tag: Option<String>,
    ctag: Option<String>,
    feats: Option<String>,
    gold_parent: Option<Index>,
    gold_label: Option<String>,
    predicted_parent: Option<Index>,
    predicted_label: Option<String>,
    left_children: Vec<Index>,
    right_children: Vec<Index>,
}

impl Node {
    pub fn new<S: Into<String>>(
        id: Index,
        form: S,
        lemma: Option<S>,
        tag: Option<S>,
        ctag: Option<S>,
        feats: Option<S>,
        gold_parent: Option<Index>,
        gold_label: Option<S>,
    ) -> Self {
        Node {
            id,
            form: form.into(),
            lemma: lemma.map(|s| s.into()),
            tag: tag.map(|s| s.into()),
            ctag: ctag.map(|s| s.into()),
            feats: feats.map(|s| s.into()),
            gold_parent,
            gold_label: gold_label.map(|s| s.into()),
            predicted_parent: None,
            predicted_label: None,
            left_children: vec![],
            right_children: vec![],
        }
    }

    /// A token carrying only its form and gold attachment.
    pub fn with_gold<S: Into<String>>(id: Index, form: S, parent: Index, label: S) -> Self {
        Node::new(id, form, None, None, None, None, Some(parent), Some(label))
    }

    pub fn word<S: Into<String>>(id: Index, form: S) -> Self {
        Node::new(id, form, None, None, None, None, None, None)
    }

    fn root() -> Self {
        Node::new(
            ROOT,
            ROOT_FORM,
            Some(ROOT_FORM),
            Some(ROOT_LABEL),
            Some(ROOT_LABEL),
            None,
            None,
            Some(ROOT_LABEL),
        )
    }

    fn pad() -> Self {
        Node::new(
            ROOT,
            PAD_FORM,
            Some(PAD_FORM),
            Some(PAD_FORM),
            Some(PAD_FORM),
            None,
            None,
            Some(PAD_FORM),
        )
    }

    pub fn id(&self) -> Index {
        self.id
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn lemma(&self) -> Option<&str> {
        self.lemma.as_ref().map(|s| s.as_str())
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_ref().map(|s| s.as_str())
    }

    pub fn ctag(&self) -> Option<&str> {
        self.ctag.as_ref().map(|s| s.as_str())
    }

    pub fn feats(&self) -> Option<&str> {
        self.feats.as_ref().map(|s| s.as_str())
    }

    pub fn gold_parent(&self) -> Option<Index> {
        self.gold_parent
    }

    pub fn gold_label(&self) -> Option<&str> {
        self.gold_label.as_ref().map(|s| s.as_str())
    }

    pub fn predicted_parent(&self) -> Option<Index> {
        self.predicted_parent
    }

    pub fn predicted_label(&self) -> Option<&str> {
        self.predicted_label.as_ref().map(|s| s.as_str())
    }

    pub fn left_children(&self) -> &[Index] {
        &self.left_children
    }

    pub fn right_children(&self) -> &[Index] {
        &self.right_children
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "id: {}, form: {}", self.id, self.form)
    }
}

/// A sentence as an arena of nodes: ROOT at position `0`, tokens at `1..=n` and the
/// trailing ROOT sentinel at `n + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    pad: Node,
}

impl Graph {
    /// Wraps `tokens` with the ROOT nodes. Ids must run from `1` to `n` in order and gold
    /// parents must point into `0..=n`.
    pub fn new(tokens: Vec<Node>) -> Result<Self> {
        let n = tokens.len() as Index;
        for (i, token) in tokens.iter().enumerate() {
            let expected = i as Index + 1;
            if token.id != expected {
                return Err(Error::invalid_argument(format!(
                    "token ids must be contiguous: expected {}, found {}",
                    expected, token.id
                )));
            }
            if let Some(parent) = token.gold_parent {
                if parent > n || parent == token.id {
                    return Err(Error::invalid_argument(format!(
                        "token {} has an invalid parent {}",
                        token.id, parent
                    )));
                }
            }
        }
        let mut sentinel = Node::root();
        sentinel.id = n + 1;
        let mut nodes = Vec::with_capacity(tokens.len() + 2);
        nodes.push(Node::root());
        nodes.extend(tokens);
        nodes.push(sentinel);
        Ok(Graph {
            nodes,
            pad: Node::pad(),
        })
    }

    /// An unannotated graph for inference.
    pub fn from_words<S: Into<String>, I: IntoIterator<Item = S>>(words: I) -> Self {
        let nodes = words
            .into_iter()
            .enumerate()
            .map(|(i, w)| Node::word(i as Index + 1, w))
            .collect::<Vec<_>>();
        let n = nodes.len() as Index;
        let mut sentinel = Node::root();
        sentinel.id = n + 1;
        let mut all = Vec::with_capacity(nodes.len() + 2);
        all.push(Node::root());
        all.extend(nodes);
        all.push(sentinel);
        Graph {
            nodes: all,
            pad: Node::pad(),
        }
    }

    /// Number of real tokens.
    pub fn len(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn sentinel(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn pad(&self) -> &Node {
        &self.pad
    }

    /// Node at position `id`, including ROOT and the sentinel.
    pub fn node(&self, id: Index) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Node at a stack or buffer slot, PAD when the slot does not exist.
    pub fn slot(&self, id: Option<Index>) -> &Node {
        id.and_then(|id| self.node(id)).unwrap_or(&self.pad)
    }

    pub fn tokens(&self) -> &[Node] {
        let n = self.nodes.len();
        &self.nodes[1..n - 1]
    }

    pub fn forms(&self) -> Vec<&str> {
        self.tokens().iter().map(|t| t.form()).collect()
    }

    /// Hash of the token forms.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.forms().hash(&mut hasher);
        hasher.finish()
    }

    #[inline]
    fn token_mut(&mut self, id: Index) -> Result<&mut Node> {
        let n = self.len() as Index;
        if id == ROOT || id > n {
            return Err(Error::invalid_argument(format!(
                "{} is not a token position",
                id
            )));
        }
        Ok(&mut self.nodes[id as usize])
    }

    pub fn has_gold(&self) -> bool {
        self.tokens()
            .iter()
            .all(|t| t.gold_parent.is_some() && t.gold_label.is_some())
    }

    /// Gold heads and labels indexed by id; slot `0` holds ROOT's placeholder.
    pub fn gold_arcs(&self) -> Result<(Vec<Index>, Vec<&str>)> {
        let mut heads = Vec::with_capacity(self.len() + 1);
        let mut labels = Vec::with_capacity(self.len() + 1);
        heads.push(ROOT);
        labels.push(ROOT_LABEL);
        for token in self.tokens() {
            match (token.gold_parent, token.gold_label()) {
                (Some(head), Some(label)) => {
                    heads.push(head);
                    labels.push(label);
                }
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "token {} has no gold attachment",
                        token.id
                    )))
                }
            }
        }
        Ok((heads, labels))
    }

    /// Replaces the gold attachments; `heads` and `labels` are indexed by id.
    pub fn set_gold_arcs<S: Into<String>>(&mut self, heads: &[Index], labels: Vec<S>) -> Result<()> {
        let n = self.len();
        if heads.len() != n + 1 || labels.len() != n + 1 {
            return Err(Error::invalid_argument(format!(
                "expected {} heads and labels, found {} and {}",
                n + 1,
                heads.len(),
                labels.len()
            )));
        }
        if let Some(d) = (1..=n).find(|&d| heads[d] as usize > n || heads[d] as usize == d) {
            return Err(Error::invalid_argument(format!(
                "token {} has an invalid parent {}",
                d, heads[d]
            )));
        }
        for (d, label) in labels.into_iter().enumerate().skip(1) {
            let node = &mut self.nodes[d];
            node.gold_parent = Some(heads[d]);
            node.gold_label = Some(label.into());
        }
        Ok(())
    }

    /// Predicted heads and labels indexed by id; `None` where nothing was predicted.
    pub fn predicted_arcs(&self) -> (Vec<Option<Index>>, Vec<Option<&str>>) {
        let mut heads = Vec::with_capacity(self.len() + 1);
        let mut labels = Vec::with_capacity(self.len() + 1);
        heads.push(None);
        labels.push(None);
        for token in self.tokens() {
            heads.push(token.predicted_parent);
            labels.push(token.predicted_label());
        }
        (heads, labels)
    }

    pub fn set_predicted<S: Into<String>>(&mut self, id: Index, parent: Index, label: S) -> Result<()> {
        let n = self.len() as Index;
        if parent > n || parent == id {
            return Err(Error::invalid_argument(format!(
                "token {} cannot be attached to {}",
                id, parent
            )));
        }
        let node = self.token_mut(id)?;
        node.predicted_parent = Some(parent);
        node.predicted_label = Some(label.into());
        Ok(())
    }

    pub fn clear_predicted(&mut self) {
        for node in self.nodes.iter_mut() {
            node.predicted_parent = None;
            node.predicted_label = None;
            node.left_children.clear();
            node.right_children.clear();
        }
    }

    /// Writes the arcs of a parser state back onto the nodes, resolving label ids
    /// through `labels`.
    pub fn apply_state<S: TransitionState>(&mut self, state: &S, labels: &Vocab) -> Result<()> {
        if state.num_tokens() != self.len() {
            return Err(Error::invalid_argument(format!(
                "state covers {} tokens but the graph has {}",
                state.num_tokens(),
                self.len()
            )));
        }
        self.clear_predicted();
        for id in 1..=self.len() as Index {
            if let Some(head) = state.head(id) {
                let label = state
                    .label(id)
                    .and_then(|l| labels.lookup(l))
                    .unwrap_or(labels.default_token());
                let label = label.to_string();
                self.set_predicted(id, head, label)?;
            }
        }
        for id in 0..=self.len() as Index {
            let node = &mut self.nodes[id as usize];
            node.left_children = state.left_children(id).to_vec();
            node.right_children = state.right_children(id).to_vec();
        }
        Ok(())
    }
}
