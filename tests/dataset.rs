mod test_utils;

use std::io::Write as _;

use eagerdep::config::Config;
use eagerdep::dataset::{self, conll, Dataset};
use eagerdep::io::{Read, Write};
use eagerdep::logging;
use eagerdep::syntax::projectivity::{self, PseudoProjective};
use tempfile::NamedTempFile;

use crate::test_utils::mock;

#[test]
fn test_reader_writer_round_trip() {
    let mut tmpfile = NamedTempFile::new().unwrap();
    write!(tmpfile.as_file_mut(), "{}", mock::provide_conll_text()).unwrap();

    let mut reader = conll::Reader::open(tmpfile.path()).unwrap();
    let mut graphs = vec![];
    assert_eq!(reader.read(&mut graphs).unwrap(), 5);
    assert_eq!(graphs[1].len(), 9);
    assert_eq!(graphs[1].tokens()[1].form(), "hearing");
    assert_eq!(graphs[1].tokens()[1].lemma(), Some("hearing"));

    let mut writer = conll::Writer::new(vec![], conll::Annotation::Gold);
    writer.write(&graphs).unwrap();
    writer.flush().unwrap();
    let output = String::from_utf8(writer.into_inner()).unwrap();
    let expected = mock::provide_conll_text();
    assert_eq!(output, expected.trim_start_matches("# mock corpus\n"));
}

#[test]
fn test_malformed_block_is_skipped() {
    let text = format!(
        "1\tonly\tseven\t_\t_\t_\t0\n\n1\tbad\t_\t_\t_\t_\tx\troot\n\n{}",
        mock::provide_conll_text()
    );
    let items = conll::Reader::new(text.as_bytes()).collect::<Vec<_>>();
    assert_eq!(items.len(), 7);
    assert!(items[0].is_err());
    assert!(items[1].is_err());
    assert!(items[2..].iter().all(|item| item.is_ok()));

    let mut reader = conll::Reader::new(text.as_bytes());
    let mut graphs = vec![];
    assert_eq!(reader.read(&mut graphs).unwrap(), 5);
    assert_eq!(graphs[0].forms(), vec!["John", "loves", "Mary", "."]);
}

#[test]
fn test_load_train_dataset() {
    let mut tmpfile = NamedTempFile::new().unwrap();
    write!(tmpfile.as_file_mut(), "{}", mock::provide_conll_text()).unwrap();
    // a cycle cannot be projectivized
    write!(
        tmpfile.as_file_mut(),
        "1\ta\t_\t_\t_\t_\t2\tdep\n2\tb\t_\t_\t_\t_\t1\tdep\n\n"
    )
    .unwrap();

    let logger = logging::discard();
    let (train, vocab) =
        dataset::load_train_dataset(tmpfile.path(), &Config::default(), &logger).unwrap();
    assert_eq!(train.len(), 5);
    for graph in train.iter() {
        let (heads, _) = graph.gold_arcs().unwrap();
        assert!(projectivity::is_projective(&heads));
    }
    let (_, labels) = train[1].gold_arcs().unwrap();
    assert_eq!(labels[5], "nmod%");
    assert_eq!(labels[8], "tmod%");
    assert!(vocab.labels().contains("nmod%"));
    assert!(vocab.labels().contains("root"));

    let test = dataset::load_test_dataset(tmpfile.path(), &logger).unwrap();
    assert_eq!(test.len(), 6);
    let (_, labels) = test[1].gold_arcs().unwrap();
    assert_eq!(labels[5], "nmod");
}

#[test]
fn test_write_predicted_strips_markers() {
    let mut graphs = mock::provide_graphs();
    let graph = &mut graphs[3];
    graph.set_predicted(1, 2, "a%").unwrap();
    graph.set_predicted(2, 0, "root").unwrap();
    graph.set_predicted(3, 2, "b").unwrap();
    let mut writer =
        conll::Writer::new(vec![], conll::Annotation::Predicted).strip_marker('%');
    writer.write(&graphs[3..4]).unwrap();
    let output = String::from_utf8(writer.into_inner()).unwrap();
    let rows = output.lines().collect::<Vec<_>>();
    assert_eq!(rows[0], "1\tp\tp\tX\tX\t_\t2\ta\t_\t_");
    assert_eq!(rows[1], "2\tq\tq\tX\tX\t_\t0\troot\t_\t_");
    assert_eq!(rows[3], "");
}

#[test]
fn test_deprojectivize_dataset_skips_broken_trees() {
    let transform = PseudoProjective::default();
    let mut graphs = mock::provide_graphs();
    for graph in graphs.iter_mut() {
        transform.projectivize(graph).unwrap();
    }
    let cycle = "1\ta\t_\t_\t_\t_\t2\tdep%\n2\tb\t_\t_\t_\t_\t1\tdep\n\n";
    graphs.insert(
        2,
        conll::Reader::new(cycle.as_bytes())
            .next()
            .unwrap()
            .unwrap(),
    );

    let logger = logging::discard();
    let restored = dataset::deprojectivize_dataset(Dataset::from_items(graphs), '%', &logger);
    assert_eq!(restored.len(), 5);
    for (graph, original) in restored.iter().zip(mock::provide_graphs()) {
        assert_eq!(graph.gold_arcs().unwrap(), original.gold_arcs().unwrap());
    }
}
