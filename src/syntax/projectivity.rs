//! Pseudo-projective tree transform.
//!
//! Non-projective arcs are lifted to the grandparent until the tree is projective; every
//! lift appends one marker to the dependent's label. Deprojectivization undoes the lifts
//! latest first, looking for a tree whose projection is the input.
//!
//! References:
//! - http://aclweb.org/anthology/P05-1013
//! - https://github.com/tensorflow/models/blob/7d30a017fe50b648be6dee544f8059bde52db562/syntaxnet/syntaxnet/document_filters.cc#L296

use crate::config::Config;
use crate::error::{Error, Result};
use crate::syntax::graph::{Graph, ROOT};
use crate::syntax::transition::Index;

pub const DEFAULT_MARKER: char = '%';

/// Result of projectivizing a head array.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub heads: Vec<Index>,
    pub labels: Vec<String>,
    pub lifts: usize,
}

#[inline]
fn span(d: Index, h: Index) -> (Index, Index) {
    if d < h {
        (d, h)
    } else {
        (h, d)
    }
}

/// Pairs of dependents whose arcs cross. `heads` is indexed by id, slot `0` unused.
pub fn crossing_arcs(heads: &[Index]) -> Vec<(Index, Index)> {
    let mut pairs = vec![];
    for d1 in 1..heads.len() {
        let (lo1, hi1) = span(d1 as Index, heads[d1]);
        for d2 in (d1 + 1)..heads.len() {
            let (lo2, hi2) = span(d2 as Index, heads[d2]);
            if (lo1 < lo2 && lo2 < hi1 && hi1 < hi2) || (lo2 < lo1 && lo1 < hi2 && hi2 < hi1) {
                pairs.push((d1 as Index, d2 as Index));
            }
        }
    }
    pairs
}

pub fn is_projective(heads: &[Index]) -> bool {
    for d1 in 1..heads.len() {
        let (lo1, hi1) = span(d1 as Index, heads[d1]);
        for d2 in (d1 + 1)..heads.len() {
            let (lo2, hi2) = span(d2 as Index, heads[d2]);
            if (lo1 < lo2 && lo2 < hi1 && hi1 < hi2) || (lo2 < lo1 && lo1 < hi2 && hi2 < hi1) {
                return false;
            }
        }
    }
    true
}

pub fn count_markers(label: &str, marker: char) -> usize {
    label.chars().rev().take_while(|&c| c == marker).count()
}

pub fn strip_marker(label: &str, marker: char) -> &str {
    label.trim_end_matches(marker)
}

/// Checks that `heads` forms a tree rooted at ROOT.
pub fn check_tree(heads: &[Index]) -> Result<()> {
    let n = heads.len().saturating_sub(1);
    for d in 1..=n {
        let h = heads[d] as usize;
        if h > n || h == d {
            return Err(Error::invalid_argument(format!(
                "token {} has an invalid head {}",
                d, h
            )));
        }
    }
    for d in 1..=n {
        let mut j = d;
        let mut steps = 0;
        while j != ROOT as usize {
            j = heads[j] as usize;
            steps += 1;
            if steps > n {
                return Err(Error::invalid_argument(format!(
                    "token {} is part of a cycle",
                    d
                )));
            }
        }
    }
    Ok(())
}

/// Whether `ancestor` is `node` or one of its ancestors. Assumes an acyclic tree.
#[inline]
fn dominates(heads: &[Index], ancestor: Index, node: Index) -> bool {
    let mut j = node;
    loop {
        if j == ancestor {
            return true;
        }
        if j == ROOT {
            return false;
        }
        j = heads[j as usize];
    }
}

#[inline]
fn depth(heads: &[Index], node: Index) -> usize {
    let mut j = node;
    let mut depth = 0;
    while j != ROOT {
        j = heads[j as usize];
        depth += 1;
    }
    depth
}

/// Whether some token strictly between `d` and `h` is not dominated by `h`. Tokens for
/// which `covered` holds count as dominated.
fn is_nonprojective_arc<F: Fn(Index) -> bool>(
    heads: &[Index],
    d: Index,
    h: Index,
    covered: F,
) -> bool {
    let (lo, hi) = span(d, h);
    ((lo + 1)..hi).any(|j| !covered(j) && !dominates(heads, h, j))
}

/// The next arc to lift: the non-projective arc whose head is shallowest, then the
/// shortest, then the leftmost dependent.
fn select_lift(heads: &[Index]) -> Option<Index> {
    (1..heads.len() as Index)
        .filter(|&d| heads[d as usize] != ROOT)
        .filter(|&d| is_nonprojective_arc(heads, d, heads[d as usize], |_| false))
        .min_by_key(|&d| {
            let h = heads[d as usize];
            let (lo, hi) = span(d, h);
            (depth(heads, h), hi - lo, d)
        })
}

/// Lifts non-projective arcs of a checked tree until it is projective and returns the
/// new heads with the number of lifts per token.
fn lift_all(heads: &[Index], bound: usize) -> Result<(Vec<Index>, Vec<usize>)> {
    let mut heads = heads.to_vec();
    let mut counts = vec![0; heads.len()];
    let mut lifts = 0;
    while !is_projective(&heads) {
        let d = match select_lift(&heads) {
            Some(d) if lifts < bound => d as usize,
            _ => return Err(Error::Unprojectivizable { lifts }),
        };
        heads[d] = heads[heads[d] as usize];
        counts[d] += 1;
        lifts += 1;
    }
    Ok((heads, counts))
}

#[inline]
fn default_bound(heads: &[Index]) -> usize {
    let n = heads.len().saturating_sub(1);
    n * n
}

/// Lifts non-projective arcs until the tree is projective. Fails when more than
/// `max_lifts` lifts (default `n * n`) are needed.
pub fn projectivize<S: AsRef<str>>(
    heads: &[Index],
    labels: &[S],
    marker: char,
    max_lifts: Option<usize>,
) -> Result<Projection> {
    if heads.len() != labels.len() {
        return Err(Error::invalid_argument(format!(
            "length mismatch: {} heads and {} labels",
            heads.len(),
            labels.len()
        )));
    }
    check_tree(heads)?;
    let bound = max_lifts.unwrap_or_else(|| default_bound(heads));
    let (heads, counts) = lift_all(heads, bound)?;
    let labels = labels
        .iter()
        .zip(&counts)
        .map(|(l, &k)| {
            let mut label = l.as_ref().to_string();
            label.extend(std::iter::repeat(marker).take(k));
            label
        })
        .collect::<Vec<_>>();
    Ok(Projection {
        heads,
        labels,
        lifts: counts.iter().sum(),
    })
}

/// Maximum number of candidate attachments tried while undoing lifts.
const UNLIFT_BUDGET: usize = 1 << 12;

/// Undoes lifts one at a time, latest first. A lift of `d` from `c` is undone only if
/// `c` is a sibling of `d` outside its subtree and lifting would pick `d` again; the
/// leaf must reproduce the projected tree exactly.
struct Unlift<'a> {
    projected: &'a [Index],
    markers: &'a [usize],
    budget: usize,
}

impl<'a> Unlift<'a> {
    fn search(&mut self, heads: &mut Vec<Index>, remaining: &mut Vec<usize>) -> bool {
        if remaining.iter().all(|&k| k == 0) {
            return match lift_all(heads, default_bound(heads)) {
                Ok((lifted, counts)) => lifted == self.projected && counts == self.markers,
                Err(_) => false,
            };
        }
        let mut candidates = vec![];
        for d in 1..heads.len() {
            if remaining[d] == 0 {
                continue;
            }
            let d = d as Index;
            for c in 1..heads.len() as Index {
                if heads[c as usize] == heads[d as usize] && !dominates(heads, d, c) {
                    candidates.push((d, c));
                }
            }
        }
        candidates.sort_by_key(|&(d, c)| {
            let (lo, hi) = span(d, c);
            (hi - lo, c, d)
        });
        for (d, c) in candidates {
            if self.budget == 0 {
                return false;
            }
            self.budget -= 1;
            let lifted_to = heads[d as usize];
            heads[d as usize] = c;
            if select_lift(heads) == Some(d) {
                remaining[d as usize] -= 1;
                if self.search(heads, remaining) {
                    return true;
                }
                remaining[d as usize] += 1;
            }
            heads[d as usize] = lifted_to;
        }
        false
    }
}

/// Reattaches every marked token in one pass, `k` levels below its current head for
/// `k` markers. Candidates inside the token's own subtree are skipped, so the result
/// stays a tree. Prefers nodes that make the arc non-projective again, then the node
/// closest to the token; a token with no candidate keeps its head.
fn reattach(heads: &[Index], markers: &[usize]) -> Vec<Index> {
    let mut new_heads = heads.to_vec();
    for (d, &k) in markers.iter().enumerate().skip(1) {
        if k == 0 {
            continue;
        }
        let d = d as Index;
        let mut frontier = vec![new_heads[d as usize]];
        for _ in 0..k {
            frontier = (1..new_heads.len() as Index)
                .filter(|&c| frontier.contains(&new_heads[c as usize]))
                .filter(|&c| !dominates(&new_heads, d, c))
                .collect();
        }
        let best = frontier.into_iter().min_by_key(|&c| {
            let reproduces_lift =
                is_nonprojective_arc(&new_heads, d, c, |j| dominates(&new_heads, d, j));
            let (lo, hi) = span(d, c);
            (!reproduces_lift, hi - lo, c)
        });
        if let Some(c) = best {
            new_heads[d as usize] = c;
        }
    }
    new_heads
}

/// Restores the arcs encoded by `projectivize` and strips the markers.
///
/// The marker count alone does not always identify the original head: distinct trees
/// may share one projection. The result is a tree whose projection reproduces the input
/// whenever such a tree is found within the search budget; otherwise, and for marker
/// patterns no tree projects to, the tokens are reattached greedily.
pub fn deprojectivize<S: AsRef<str>>(
    heads: &[Index],
    labels: &[S],
    marker: char,
) -> Result<(Vec<Index>, Vec<String>)> {
    if heads.len() != labels.len() {
        return Err(Error::invalid_argument(format!(
            "length mismatch: {} heads and {} labels",
            heads.len(),
            labels.len()
        )));
    }
    check_tree(heads)?;
    let markers = labels
        .iter()
        .enumerate()
        .map(|(d, l)| if d == 0 { 0 } else { count_markers(l.as_ref(), marker) })
        .collect::<Vec<_>>();
    let new_labels = labels
        .iter()
        .map(|l| strip_marker(l.as_ref(), marker).to_string())
        .collect::<Vec<_>>();
    if markers.iter().all(|&k| k == 0) {
        return Ok((heads.to_vec(), new_labels));
    }

    let mut restored = heads.to_vec();
    let mut remaining = markers.clone();
    let mut unlift = Unlift {
        projected: heads,
        markers: &markers,
        budget: UNLIFT_BUDGET,
    };
    if !unlift.search(&mut restored, &mut remaining) {
        restored = reattach(heads, &markers);
    }
    Ok((restored, new_labels))
}

/// The transform applied to graphs: gold arcs are projectivized for training, predicted
/// arcs are deprojectivized after parsing.
#[derive(Clone, Copy, Debug)]
pub struct PseudoProjective {
    marker: char,
    max_lifts: Option<usize>,
}

impl PseudoProjective {
    pub fn new(marker: char, max_lifts: Option<usize>) -> Self {
        PseudoProjective { marker, max_lifts }
    }

    pub fn from_config(config: &Config) -> Self {
        PseudoProjective::new(config.marker, config.max_lifts)
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// Rewrites the gold arcs of `graph` and returns the number of lifts.
    pub fn projectivize(&self, graph: &mut Graph) -> Result<usize> {
        let projection = {
            let (heads, labels) = graph.gold_arcs()?;
            projectivize(&heads, &labels, self.marker, self.max_lifts)?
        };
        graph.set_gold_arcs(&projection.heads, projection.labels)?;
        Ok(projection.lifts)
    }

    /// Rewrites the predicted arcs of `graph`; every token must carry a prediction.
    pub fn deprojectivize(&self, graph: &mut Graph) -> Result<()> {
        let (heads, labels) = {
            let (heads, labels) = graph.predicted_arcs();
            let mut hs = vec![ROOT];
            let mut ls = vec![String::new()];
            for id in 1..heads.len() {
                match (heads[id], labels[id]) {
                    (Some(h), Some(l)) => {
                        hs.push(h);
                        ls.push(l.to_string());
                    }
                    _ => {
                        return Err(Error::invalid_argument(format!(
                            "token {} has no predicted attachment",
                            id
                        )))
                    }
                }
            }
            deprojectivize(&hs, &ls, self.marker)?
        };
        for (id, label) in labels.into_iter().enumerate().skip(1) {
            graph.set_predicted(id as Index, heads[id], label)?;
        }
        Ok(())
    }
}

impl Default for PseudoProjective {
    fn default() -> Self {
        PseudoProjective::new(DEFAULT_MARKER, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A hearing is scheduled on the issue today .
    const HEARING_HEADS: [Index; 10] = [0, 2, 3, 0, 3, 2, 7, 5, 4, 3];
    const HEARING_LABELS: [&str; 10] = [
        "", "det", "nsubj", "root", "aux", "nmod", "det", "pobj", "tmod", "punct",
    ];

    #[test]
    fn test_crossing_arcs() {
        assert!(is_projective(&[0, 2, 0, 2, 2]));
        assert_eq!(crossing_arcs(&[0, 3, 0, 2]), vec![(1, 2)]);
        assert!(!is_projective(&HEARING_HEADS));
        // arcs sharing an endpoint do not cross
        assert!(is_projective(&[0, 0, 1, 1]));
    }

    #[test]
    fn test_markers() {
        assert_eq!(count_markers("nmod%%", '%'), 2);
        assert_eq!(count_markers("nmod", '%'), 0);
        assert_eq!(strip_marker("tmod%", '%'), "tmod");
        assert_eq!(strip_marker("tmod", '%'), "tmod");
    }

    #[test]
    fn test_check_tree() {
        assert!(check_tree(&[0, 2, 0]).is_ok());
        assert!(check_tree(&[0, 2, 1]).is_err());
        assert!(check_tree(&[0, 3, 0]).is_err());
        assert!(check_tree(&[0, 1]).is_err());
    }

    #[test]
    fn test_projectivize_hearing() {
        let p = projectivize(&HEARING_HEADS, &HEARING_LABELS, '%', None).unwrap();
        assert_eq!(p.lifts, 2);
        assert_eq!(p.heads, vec![0, 2, 3, 0, 3, 3, 7, 5, 3, 3]);
        assert_eq!(p.labels[5], "nmod%");
        assert_eq!(p.labels[8], "tmod%");
        assert!(is_projective(&p.heads));

        let (heads, labels) = deprojectivize(&p.heads, &p.labels, '%').unwrap();
        assert_eq!(&heads[..], &HEARING_HEADS[..]);
        assert_eq!(&labels[1..], &HEARING_LABELS[1..]);
    }

    #[test]
    fn test_double_lift() {
        let labels = ["", "a", "root", "b", "c"];
        let p = projectivize(&[0, 4, 0, 2, 3], &labels, '%', None).unwrap();
        assert_eq!(p.heads, vec![0, 2, 0, 2, 3]);
        assert_eq!(p.labels[1], "a%%");
        let (heads, labels) = deprojectivize(&p.heads, &p.labels, '%').unwrap();
        assert_eq!(heads, vec![0, 4, 0, 2, 3]);
        assert_eq!(labels[1], "a");
    }

    #[test]
    fn test_two_lifts_decode_to_a_tree() {
        let labels = ["", "l1", "l2", "l3", "l4", "l5"];
        let p = projectivize(&[0, 4, 0, 5, 2, 2], &labels, '%', None).unwrap();
        assert_eq!(p.heads, vec![0, 2, 0, 2, 2, 2]);
        assert_eq!(p.labels[1], "l1%");
        assert_eq!(p.labels[3], "l3%");

        let (heads, restored) = deprojectivize(&p.heads, &p.labels, '%').unwrap();
        assert!(check_tree(&heads).is_ok());
        assert_eq!(&restored[1..], &labels[1..]);
        // [0, 4, 0, 1, 2, 2] has the same projection as the input tree
        assert_eq!(heads, vec![0, 4, 0, 1, 2, 2]);
        assert_eq!(projectivize(&heads, &labels, '%', None).unwrap(), p);
    }

    #[test]
    fn test_shared_projection() {
        let labels = ["", "a", "b", "root", "c", "d"];
        let left = projectivize(&[0, 3, 3, 0, 1, 3], &labels, '%', None).unwrap();
        let right = projectivize(&[0, 3, 3, 0, 2, 3], &labels, '%', None).unwrap();
        assert_eq!(left, right);
        assert_eq!(left.heads, vec![0, 3, 3, 0, 3, 3]);

        let (heads, _) = deprojectivize(&left.heads, &left.labels, '%').unwrap();
        assert_eq!(heads, vec![0, 3, 3, 0, 2, 3]);
    }

    #[test]
    fn test_inconsistent_markers_keep_a_tree() {
        // no tree projects to two sibling lifts under ROOT
        let (heads, labels) = deprojectivize(&[0, 0, 0], &["", "a%", "b%"], '%').unwrap();
        assert!(check_tree(&heads).is_ok());
        assert_eq!(heads, vec![0, 2, 0]);
        assert_eq!(labels, vec!["", "a", "b"]);

        let (heads, _) = deprojectivize(&[0, 2, 0, 2], &["", "a%%%", "root", "b%"], '%').unwrap();
        assert!(check_tree(&heads).is_ok());
    }

    #[test]
    fn test_lift_bound() {
        let labels = ["", "a", "root", "b", "c"];
        match projectivize(&[0, 4, 0, 2, 3], &labels, '%', Some(1)) {
            Err(Error::Unprojectivizable { lifts }) => assert_eq!(lifts, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_projective_tree_is_untouched() {
        let labels = ["", "nsubj", "root", "obj", "punct"];
        let p = projectivize(&[0, 2, 0, 2, 2], &labels, '%', None).unwrap();
        assert_eq!(p.lifts, 0);
        assert_eq!(p.heads, vec![0, 2, 0, 2, 2]);
        assert_eq!(p.labels, labels.to_vec());
    }
}
