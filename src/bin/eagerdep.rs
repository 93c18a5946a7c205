#[macro_use]
extern crate eagerdep;
#[macro_use]
extern crate slog;

use std::error::Error;
use std::fs::File;
use std::io as std_io;
use std::path::{Path, PathBuf};

use eagerdep::app::prelude::*;
use eagerdep::config::Config as ParserConfig;
use eagerdep::dataset::{self, conll};
use eagerdep::io::Write;
use eagerdep::preprocessing::TransitionVocab;
use eagerdep::syntax::eval::{evaluate, Scores};
use eagerdep::syntax::graph::Graph;
use eagerdep::syntax::projectivity::PseudoProjective;
use eagerdep::syntax::{OracleScorer, Parser};
use eagerdep::syntax::transition::Index;
use slog::Logger;

type CommandResult = Result<(), Box<dyn Error + Send + Sync>>;

fn load_config(path: Option<&PathBuf>) -> Result<ParserConfig, eagerdep::Error> {
    match path {
        Some(path) => ParserConfig::from_file(path),
        None => Ok(ParserConfig::default()),
    }
}

fn open_output(
    path: Option<&PathBuf>,
    annotation: conll::Annotation,
) -> Result<conll::Writer<Box<dyn std_io::Write>>, eagerdep::Error> {
    let inner: Box<dyn std_io::Write> = match path {
        Some(path) => Box::new(std_io::BufWriter::new(File::create(path)?)),
        None => Box::new(std_io::BufWriter::new(std_io::stdout())),
    };
    Ok(conll::Writer::new(inner, annotation))
}

fn projectivize<P: AsRef<Path>>(
    input: P,
    output: Option<&PathBuf>,
    config: &ParserConfig,
    logger: &Logger,
) -> CommandResult {
    let transform = PseudoProjective::from_config(config);
    let mut graphs = dataset::load_test_dataset(input, logger)?.into_inner();
    let mut lifts = 0;
    let mut kept = Vec::with_capacity(graphs.len());
    for (index, mut graph) in graphs.drain(..).enumerate() {
        match transform.projectivize(&mut graph) {
            Ok(n) => {
                lifts += n;
                kept.push(graph);
            }
            Err(e) => warn!(logger, "skip sentence {}: {}", index, e),
        }
    }
    let mut writer = open_output(output, conll::Annotation::Gold)?;
    writer.write(&kept)?;
    writer.flush()?;
    info!(logger, "projectivized {} sentences with {} lifts", kept.len(), lifts);
    Ok(())
}

fn deprojectivize<P: AsRef<Path>>(
    input: P,
    output: Option<&PathBuf>,
    config: &ParserConfig,
    logger: &Logger,
) -> CommandResult {
    let loaded = dataset::load_test_dataset(input, logger)?;
    let total = loaded.len();
    let graphs = dataset::deprojectivize_dataset(loaded, config.marker, logger).into_inner();
    if graphs.len() < total {
        warn!(logger, "skipped {} of {} sentences", total - graphs.len(), total);
    }
    let mut writer = open_output(output, conll::Annotation::Gold)?;
    writer.write(&graphs)?;
    writer.flush()?;
    info!(logger, "deprojectivized {} sentences", graphs.len());
    Ok(())
}

/// Parses every sentence with the dynamic oracle as scorer and scores the
/// deprojectivized result against the original trees.
fn oracle<P: AsRef<Path>>(
    input: P,
    output: Option<&PathBuf>,
    config: &ParserConfig,
    logger: &Logger,
) -> CommandResult {
    let transform = PseudoProjective::from_config(config);
    let originals = dataset::load_test_dataset(input, logger)?.into_inner();
    let mut pairs = Vec::with_capacity(originals.len());
    for (index, original) in originals.into_iter().enumerate() {
        let mut graph = original.clone();
        match transform.projectivize(&mut graph) {
            Ok(_) => pairs.push((original, graph)),
            Err(e) => warn!(logger, "skip sentence {}: {}", index, e),
        }
    }
    let vocab = TransitionVocab::fit(pairs.iter().map(|p| &p.1))?;
    info!(logger, "{} transitions", vocab.len());
    let parser = Parser::from_config(&vocab, config);
    let mut scorer = OracleScorer::new(&vocab);

    let mut scores = Scores::new();
    let mut results: Vec<Graph> = Vec::with_capacity(pairs.len());
    for (original, mut graph) in pairs {
        parser.parse(&mut graph, &mut scorer)?;
        transform.deprojectivize(&mut graph)?;
        let mut result = original;
        let (heads, labels) = graph.predicted_arcs();
        for id in 1..heads.len() {
            if let (Some(head), Some(label)) = (heads[id], labels[id]) {
                result.set_predicted(id as Index, head, label)?;
            }
        }
        scores.add_graph(&result, config.marker);
        results.push(result);
    }
    if output.is_some() {
        let mut writer =
            open_output(output, conll::Annotation::Predicted)?.strip_marker(config.marker);
        writer.write(&results)?;
        writer.flush()?;
    }
    info!(logger, "oracle: {}", scores);
    println!("{}", scores);
    Ok(())
}

fn evaluate_files<P1: AsRef<Path>, P2: AsRef<Path>>(
    gold_file: P1,
    predicted_file: P2,
    config: &ParserConfig,
    logger: &Logger,
) -> CommandResult {
    let gold = conll::read_file(gold_file, logger)?;
    let predicted = conll::read_file(predicted_file, logger)?;
    if gold.len() != predicted.len() {
        return Err(format!(
            "the files hold {} and {} sentences",
            gold.len(),
            predicted.len()
        )
        .into());
    }
    let mut scores = Scores::new();
    for (g, p) in gold.iter().zip(predicted.iter()) {
        scores += evaluate(g, p, config.marker)?;
    }
    info!(logger, "evaluate: {}", scores);
    println!("{}", scores);
    Ok(())
}

#[derive(StructOpt, Debug)]
#[structopt(name = "eagerdep")]
struct Args {
    #[structopt(flatten)]
    common: CommonArgs,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    #[structopt(name = "projectivize", about = "Lifts non-projective arcs of a corpus")]
    Projectivize(Transform),
    #[structopt(name = "deprojectivize", about = "Restores arcs lifted by projectivize")]
    Deprojectivize(Transform),
    #[structopt(name = "oracle", about = "Parses a corpus with the dynamic oracle")]
    Oracle(Transform),
    #[structopt(name = "evaluate", about = "Scores predicted trees against gold trees")]
    Evaluate(Evaluate),
}

#[derive(StructOpt, Debug)]
struct Transform {
    /// An input file in the CoNLL format
    #[structopt(name = "INPUT", parse(from_os_str))]
    input: PathBuf,
    /// An output file (stdout by default)
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,
    /// A JSON config file
    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
struct Evaluate {
    /// A gold file
    #[structopt(name = "GOLD", parse(from_os_str))]
    gold: PathBuf,
    /// A file with predicted trees
    #[structopt(name = "PREDICTED", parse(from_os_str))]
    predicted: PathBuf,
    /// A JSON config file
    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
}

main!(|args: Args, context: Context| match args.command {
    Command::Projectivize(ref c) => {
        info!(&context.logger, "execute subcommand: {:?}", c);
        let config = load_config(c.config.as_ref())?;
        projectivize(&c.input, c.output.as_ref(), &config, &context.logger)
    }
    Command::Deprojectivize(ref c) => {
        info!(&context.logger, "execute subcommand: {:?}", c);
        let config = load_config(c.config.as_ref())?;
        deprojectivize(&c.input, c.output.as_ref(), &config, &context.logger)
    }
    Command::Oracle(ref c) => {
        info!(&context.logger, "execute subcommand: {:?}", c);
        let config = load_config(c.config.as_ref())?;
        oracle(&c.input, c.output.as_ref(), &config, &context.logger)
    }
    Command::Evaluate(ref c) => {
        info!(&context.logger, "execute subcommand: {:?}", c);
        let config = load_config(c.config.as_ref())?;
        evaluate_files(&c.gold, &c.predicted, &config, &context.logger)
    }
});
