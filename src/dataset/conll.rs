use std::fs::File;
use std::io as std_io;
use std::io::BufRead;
use std::path::Path;
use std::usize::MAX as USIZE_MAX;

use slog::Logger;

use crate::error::{Error, Result};
use crate::io as mod_io;
use crate::logging;
use crate::syntax::graph::{Graph, Node};
use crate::syntax::projectivity::strip_marker;
use crate::syntax::transition::Index;

static CONLL_FIELD_DELIMITER: &'static str = "\t";
static CONLL_EMPTY_FIELD: &'static str = "_";
static CONLL_COMMENT_PREFIX: &'static str = "#";

/// `id form lemma tag ctag feats parent relation`; further columns are ignored.
pub const CONLL_MIN_COLUMNS: usize = 8;

#[inline]
fn optional_field(field: &str) -> Option<&str> {
    if field == CONLL_EMPTY_FIELD {
        None
    } else {
        Some(field)
    }
}

#[inline]
fn format_error<S: Into<String>>(line: usize, message: S) -> Error {
    Error::Format {
        line,
        message: message.into(),
    }
}

/// Multiword ranges (`1-2`) and empty nodes (`1.1`) carry no attachment of their own.
#[inline]
fn is_auxiliary_line(first_column: &str) -> bool {
    first_column.contains('-') || first_column.contains('.')
}

fn parse_line(line: &str, lineno: usize, expected_id: Index) -> Result<Node> {
    let cols = line.split(CONLL_FIELD_DELIMITER).collect::<Vec<_>>();
    if cols.len() < CONLL_MIN_COLUMNS {
        return Err(format_error(
            lineno,
            format!(
                "expected at least {} columns, found {}",
                CONLL_MIN_COLUMNS,
                cols.len()
            ),
        ));
    }
    let id = cols[0]
        .parse::<Index>()
        .map_err(|e| format_error(lineno, format!("invalid id `{}`: {}", cols[0], e)))?;
    if id != expected_id {
        return Err(format_error(
            lineno,
            format!("expected id {}, found {}", expected_id, id),
        ));
    }
    let parent = match optional_field(cols[6]) {
        Some(field) => Some(
            field
                .parse::<Index>()
                .map_err(|e| format_error(lineno, format!("invalid parent `{}`: {}", field, e)))?,
        ),
        None => None,
    };
    Ok(Node::new(
        id,
        cols[1],
        optional_field(cols[2]),
        optional_field(cols[3]),
        optional_field(cols[4]),
        optional_field(cols[5]),
        parent,
        optional_field(cols[7]),
    ))
}

/// Parses one sentence block given as `(line number, line)` pairs.
pub fn parse_block(lines: &[(usize, String)]) -> Result<Graph> {
    let first_line = lines.first().map(|l| l.0).unwrap_or(0);
    let mut tokens = Vec::with_capacity(lines.len());
    for &(lineno, ref line) in lines {
        let first = line.split(CONLL_FIELD_DELIMITER).next().unwrap_or("");
        if is_auxiliary_line(first) {
            continue;
        }
        tokens.push(parse_line(line, lineno, tokens.len() as Index + 1)?);
    }
    Graph::new(tokens).map_err(|e| match e {
        Error::InvalidArgument(message) => format_error(first_line, message),
        e => e,
    })
}

/// Reads blank-line separated sentence blocks. A malformed block is reported as a
/// `Format` error and reading resumes at the next block.
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    logger: Logger,
    lineno: usize,
}

impl<R: BufRead> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader::with_logger(inner, logging::discard())
    }

    pub fn with_logger(inner: R, logger: Logger) -> Self {
        Reader {
            inner,
            logger,
            lineno: 0,
        }
    }

    fn read_block(&mut self) -> Result<Option<Vec<(usize, String)>>> {
        let mut lines = vec![];
        let mut line = String::new();
        loop {
            line.clear();
            match self.inner.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    self.lineno += 1;
                    let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r');
                    if trimmed.trim().is_empty() {
                        if lines.is_empty() {
                            continue;
                        }
                        break;
                    } else if trimmed.starts_with(CONLL_COMMENT_PREFIX) {
                        continue;
                    }
                    lines.push((self.lineno, trimmed.to_string()));
                }
                Err(ref e) if e.kind() == std_io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(if lines.is_empty() { None } else { Some(lines) })
    }
}

impl Reader<std_io::BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Reader::new(std_io::BufReader::new(File::open(path)?)))
    }

    pub fn open_with_logger<P: AsRef<Path>>(path: P, logger: Logger) -> Result<Self> {
        Ok(Reader::with_logger(
            std_io::BufReader::new(File::open(path)?),
            logger,
        ))
    }
}

/// One item per sentence block.
impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Graph>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_block() {
            Ok(Some(lines)) => Some(parse_block(&lines)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: BufRead> mod_io::Read for Reader<R> {
    type Item = Graph;

    /// Skips malformed blocks with a warning; I/O errors are returned.
    fn read_upto(&mut self, num: usize, buf: &mut Vec<Self::Item>) -> Result<usize> {
        let mut count = 0;
        let mut index = 0;
        while count < num {
            match self.next() {
                Some(Ok(graph)) => {
                    buf.push(graph);
                    count += 1;
                }
                Some(Err(e @ Error::Format { .. })) => {
                    warn!(self.logger, "skip sentence {}: {}", index, e);
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
            index += 1;
        }
        Ok(count)
    }
}

/// Which arcs of a graph are written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Annotation {
    Gold,
    Predicted,
}

/// Writes graphs as 10-column blocks.
#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
    annotation: Annotation,
    marker: Option<char>,
}

impl<W: std_io::Write> Writer<W> {
    pub fn new(inner: W, annotation: Annotation) -> Self {
        Writer {
            inner,
            annotation,
            marker: None,
        }
    }

    /// Removes trailing `marker`s from every written relation.
    pub fn strip_marker(mut self, marker: char) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_graph(&mut self, graph: &Graph) -> Result<()> {
        for node in graph.tokens() {
            let (parent, label) = match self.annotation {
                Annotation::Gold => (node.gold_parent(), node.gold_label()),
                Annotation::Predicted => (node.predicted_parent(), node.predicted_label()),
            };
            let label = match (label, self.marker) {
                (Some(l), Some(m)) => Some(strip_marker(l, m)),
                (l, _) => l,
            };
            writeln!(
                self.inner,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t_\t_",
                node.id(),
                node.form(),
                node.lemma().unwrap_or(CONLL_EMPTY_FIELD),
                node.tag().unwrap_or(CONLL_EMPTY_FIELD),
                node.ctag().unwrap_or(CONLL_EMPTY_FIELD),
                node.feats().unwrap_or(CONLL_EMPTY_FIELD),
                parent
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| CONLL_EMPTY_FIELD.to_string()),
                label.unwrap_or(CONLL_EMPTY_FIELD),
            )?;
        }
        writeln!(self.inner)?;
        Ok(())
    }
}

impl Writer<std_io::BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, annotation: Annotation) -> Result<Self> {
        Ok(Writer::new(
            std_io::BufWriter::new(File::create(path)?),
            annotation,
        ))
    }
}

impl<W: std_io::Write> mod_io::Write for Writer<W> {
    type Item = Graph;

    fn write(&mut self, buf: &[Self::Item]) -> Result<usize> {
        for graph in buf {
            self.write_graph(graph)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Reads every well-formed sentence of `path`.
pub fn read_file<P: AsRef<Path>>(path: P, logger: &Logger) -> Result<Vec<Graph>> {
    let mut reader = Reader::open_with_logger(path, logger.clone())?;
    let mut buf = vec![];
    mod_io::Read::read_upto(&mut reader, USIZE_MAX, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Read, Write};

    static CORPUS: &'static str = "\
# sent_id = 1
1\tJohn\tjohn\tNNP\tPROPN\t_\t2\tnsubj
2\tloves\tlove\tVBZ\tVERB\t_\t0\troot
3\tMary\tmary\tNNP\tPROPN\t_\t2\tobj

1\tbroken\t_\t_\t_\t_\t0
2\tline\t_\t_\t_\t_\t1\tdep

1-2\tDon't\t_\t_\t_\t_\t_\t_
1\tDo\tdo\tVB\tAUX\t_\t3\taux
2\tn't\tnot\tRB\tPART\t_\t3\tadvmod
3\tgo\tgo\tVB\tVERB\t_\t0\troot\t_\t_
";

    #[test]
    fn test_read_skips_malformed_block() {
        let mut reader = Reader::new(CORPUS.as_bytes());
        let mut buf = vec![];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(buf[0].forms(), vec!["John", "loves", "Mary"]);
        assert_eq!(buf[0].tokens()[0].tag(), Some("NNP"));
        assert_eq!(buf[0].tokens()[0].ctag(), Some("PROPN"));
        assert_eq!(buf[0].tokens()[0].feats(), None);
        assert_eq!(buf[1].forms(), vec!["Do", "n't", "go"]);
        assert_eq!(buf[1].gold_arcs().unwrap().0, vec![0, 3, 3, 0]);
    }

    #[test]
    fn test_iterator_reports_format_error() {
        let items = Reader::new(CORPUS.as_bytes()).collect::<Vec<_>>();
        assert_eq!(items.len(), 3);
        match items[1] {
            Err(Error::Format { line, .. }) => assert_eq!(line, 6),
            ref other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn test_read_upto() {
        let mut reader = Reader::new(CORPUS.as_bytes());
        let mut buf = vec![];
        assert_eq!(reader.read_upto(1, &mut buf).unwrap(), 1);
        assert_eq!(reader.read_upto(1, &mut buf).unwrap(), 1);
        assert_eq!(reader.read_upto(1, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_predicted() {
        let mut graph = Reader::new(CORPUS.as_bytes()).next().unwrap().unwrap();
        graph.set_predicted(1, 2, "nsubj%").unwrap();
        graph.set_predicted(2, 0, "root").unwrap();
        graph.set_predicted(3, 1, "obj").unwrap();
        let mut writer = Writer::new(vec![], Annotation::Predicted).strip_marker('%');
        writer.write(&[graph]).unwrap();
        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            output,
            "1\tJohn\tjohn\tNNP\tPROPN\t_\t2\tnsubj\t_\t_\n\
             2\tloves\tlove\tVBZ\tVERB\t_\t0\troot\t_\t_\n\
             3\tMary\tmary\tNNP\tPROPN\t_\t1\tobj\t_\t_\n\n"
        );
    }
}
