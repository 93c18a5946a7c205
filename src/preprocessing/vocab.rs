use std::borrow::Borrow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// String <-> id mapping. Id `0` is reserved for the default token, which unknown
/// strings map onto.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "VocabData", into = "VocabData")]
pub struct Vocab {
    s2i: HashMap<String, u32>,
    i2s: Vec<String>,
    freq: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
struct VocabData {
    words: Vec<String>,
    freq: Vec<u32>,
}

impl From<VocabData> for Vocab {
    fn from(data: VocabData) -> Self {
        let mut freq = data.freq;
        freq.resize(data.words.len(), 0);
        let s2i = data
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as u32))
            .collect();
        Vocab {
            s2i,
            i2s: data.words,
            freq,
        }
    }
}

impl From<Vocab> for VocabData {
    fn from(vocab: Vocab) -> Self {
        VocabData {
            words: vocab.i2s,
            freq: vocab.freq,
        }
    }
}

const DEFAULT_CAPACITY: usize = 32;
pub static UNKNOWN_TOKEN: &'static str = "<UNK>";

impl Vocab {
    pub fn new() -> Self {
        Self::with_capacity_and_default_token(DEFAULT_CAPACITY, UNKNOWN_TOKEN.to_string())
    }

    pub fn with_default_token(default_token: String) -> Self {
        Self::with_capacity_and_default_token(DEFAULT_CAPACITY, default_token)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_default_token(capacity, UNKNOWN_TOKEN.to_string())
    }

    pub fn with_capacity_and_default_token(capacity: usize, default_token: String) -> Self {
        let mut v = Vocab {
            s2i: HashMap::with_capacity(capacity),
            i2s: Vec::with_capacity(capacity),
            freq: Vec::with_capacity(capacity),
        };
        v.add(default_token);
        v
    }

    pub fn add<S: Into<String>>(&mut self, word: S) -> u32 {
        let word = word.into();
        if let Some(&id) = self.s2i.get(&word) {
            if id > 0 {
                self.freq[id as usize] += 1;
            }
            return id;
        }
        let id = self.i2s.len() as u32;
        self.i2s.push(word.clone());
        self.s2i.insert(word, id);
        self.freq.push(if id > 0 { 1 } else { 0 });
        id
    }

    /// Id of `word`, the default id `0` when unknown.
    pub fn get<Q: Borrow<str> + ?Sized>(&self, word: &Q) -> u32 {
        self.find(word).unwrap_or(0)
    }

    pub fn find<Q: Borrow<str> + ?Sized>(&self, word: &Q) -> Option<u32> {
        self.s2i.get(word.borrow()).cloned()
    }

    pub fn contains<Q: Borrow<str> + ?Sized>(&self, word: &Q) -> bool {
        self.s2i.contains_key(word.borrow())
    }

    pub fn freq(&self, id: u32) -> Option<u32> {
        self.freq.get(id as usize).cloned()
    }

    pub fn lookup(&self, id: u32) -> Option<&str> {
        self.i2s.get(id as usize).map(|v| v.as_str())
    }

    pub fn default_token(&self) -> &str {
        &self.i2s[0]
    }

    pub fn size(&self) -> usize {
        self.i2s.len()
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Vocab::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut v = Vocab::new();
        assert_eq!(v.add("nsubj"), 1);
        assert_eq!(v.add("obj"), 2);
        assert_eq!(v.add("nsubj"), 1);
        assert_eq!(v.freq(1), Some(2));
        assert_eq!(v.get("obj"), 2);
        assert_eq!(v.get("iobj"), 0);
        assert_eq!(v.find("iobj"), None);
        assert_eq!(v.lookup(0), Some(UNKNOWN_TOKEN));
        assert_eq!(v.size(), 3);
    }

    #[test]
    fn test_serde() {
        let mut v = Vocab::with_default_token("_".to_string());
        v.add("root");
        v.add("det");
        let json = serde_json::to_string(&v).unwrap();
        let restored: Vocab = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.default_token(), "_");
        assert_eq!(restored.get("det"), 2);
        assert_eq!(restored.freq(1), Some(1));
    }
}
