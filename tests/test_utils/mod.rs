#![allow(dead_code)]

pub mod mock {
    use eagerdep::dataset::conll;
    use eagerdep::syntax::graph::Graph;
    use eagerdep::syntax::transition::Index;
    use rand::seq::SliceRandom;
    use rand::Rng;

    type Row = (&'static str, &'static str, Index, &'static str);

    static SENTENCES: &'static [&'static [Row]] = &[
        &[
            ("John", "NNP", 2, "nsubj"),
            ("loves", "VBZ", 0, "root"),
            ("Mary", "NNP", 2, "obj"),
            (".", ".", 2, "punct"),
        ],
        &[
            ("A", "DT", 2, "det"),
            ("hearing", "NN", 3, "nsubj"),
            ("is", "VBZ", 0, "root"),
            ("scheduled", "VBN", 3, "aux"),
            ("on", "IN", 2, "nmod"),
            ("the", "DT", 7, "det"),
            ("issue", "NN", 5, "pobj"),
            ("today", "NN", 4, "tmod"),
            (".", ".", 3, "punct"),
        ],
        &[
            ("w", "X", 4, "a"),
            ("x", "X", 0, "root"),
            ("y", "X", 2, "b"),
            ("z", "X", 3, "c"),
        ],
        &[("p", "X", 3, "a"), ("q", "X", 0, "root"), ("r", "X", 2, "b")],
        &[
            ("No", "UH", 4, "intj"),
            (",", ",", 4, "punct"),
            ("it", "PRP", 4, "nsubj"),
            ("was", "VBD", 0, "root"),
            ("n't", "RB", 4, "neg"),
            ("Black", "NNP", 7, "compound"),
            ("Monday", "NNP", 4, "attr"),
            (".", ".", 4, "punct"),
        ],
    ];

    /// Gold heads of the mock sentences, indexed by id.
    pub fn provide_heads() -> Vec<Vec<Index>> {
        SENTENCES
            .iter()
            .map(|rows| {
                let mut heads = vec![0];
                heads.extend(rows.iter().map(|r| r.2));
                heads
            })
            .collect()
    }

    pub fn provide_conll_text() -> String {
        let mut text = String::from("# mock corpus\n");
        for rows in SENTENCES {
            for (i, &(form, tag, head, label)) in rows.iter().enumerate() {
                text.push_str(&format!(
                    "{}\t{}\t{}\t{}\t{}\t_\t{}\t{}\t_\t_\n",
                    i + 1,
                    form,
                    form.to_lowercase(),
                    tag,
                    tag,
                    head,
                    label
                ));
            }
            text.push('\n');
        }
        text
    }

    pub fn provide_graphs() -> Vec<Graph> {
        let text = provide_conll_text();
        conll::Reader::new(text.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    /// A random tree over `n` tokens, possibly non-projective and with several tokens
    /// attached to ROOT.
    pub fn random_tree<R: Rng>(rng: &mut R, n: usize) -> Vec<Index> {
        let mut order = (1..=n as Index).collect::<Vec<_>>();
        order.shuffle(rng);
        let mut heads = vec![0; n + 1];
        for (i, &d) in order.iter().enumerate() {
            heads[d as usize] = if i == 0 || rng.gen_range(0..4) == 0 {
                0
            } else {
                order[rng.gen_range(0..i)]
            };
        }
        heads
    }
}
