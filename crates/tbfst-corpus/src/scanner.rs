// Line scanner: `\marker value` fields from a byte stream

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tbfst_core::Tag;

use crate::CorpusError;

/// One marker field. Continuation lines are joined to the value with `\n`
/// and trailing whitespace is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub tag: Tag,
    pub value: String,
    /// 1-based line number of the marker line.
    pub line: usize,
}

/// Split a marker line into its tag and value.
///
/// A marker line starts with a backslash immediately followed by the marker
/// name; the value starts after the single whitespace character that ends the
/// name.
fn parse_marker(line: &str) -> Option<(Tag, &str)> {
    let rest = line.strip_prefix('\\')?;
    let name_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let tag = Tag::new(&rest[..name_len]).ok()?;
    let mut value = &rest[name_len..];
    if let Some(ws) = value.chars().next() {
        value = &value[ws.len_utf8()..];
    }
    Some((tag, value))
}

/// Iterator over the marker fields of a Toolbox stream.
///
/// Invalid UTF-8 is replaced rather than rejected, and text before the first
/// marker (Toolbox's `\_sh` header aside) is skipped. An I/O error ends the
/// iteration after being yielded once.
pub struct MarkerReader<R> {
    reader: R,
    path: PathBuf,
    buf: Vec<u8>,
    line_no: usize,
    pending: Option<Field>,
    done: bool,
}

impl MarkerReader<BufReader<File>> {
    /// Open a corpus file.
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let file = File::open(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> MarkerReader<R> {
    /// Wrap a reader. `path` is only used in error messages.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            buf: Vec::new(),
            line_no: 0,
            pending: None,
            done: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: BufRead> Iterator for MarkerReader<R> {
    type Item = Result<Field, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Err(source) => {
                    self.done = true;
                    return Some(Err(CorpusError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
                Ok(0) => {
                    self.done = true;
                    return self.pending.take().map(|f| Ok(finish(f)));
                }
                Ok(_) => {
                    self.line_no += 1;
                    let decoded = String::from_utf8_lossy(&self.buf);
                    let mut text = decoded.trim_end_matches(['\n', '\r']);
                    if self.line_no == 1 {
                        text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
                    }

                    match parse_marker(text) {
                        Some((tag, value)) => {
                            let field = Field {
                                tag,
                                value: value.to_string(),
                                line: self.line_no,
                            };
                            if let Some(prev) = self.pending.replace(field) {
                                return Some(Ok(finish(prev)));
                            }
                        }
                        None => {
                            if let Some(field) = self.pending.as_mut() {
                                field.value.push('\n');
                                field.value.push_str(text);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn finish(mut field: Field) -> Field {
    let trimmed = field.value.trim_end().len();
    field.value.truncate(trimmed);
    field
}
