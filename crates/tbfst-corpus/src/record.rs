// Record grouper
//
// Records are delimited by key markers such as `\id` (text) and `\ref`
// (sentence). Keys are ranked: a new `\id` starts a new text and clears the
// current `\ref`, while a new `\ref` keeps the `\id`. Each record carries a
// snapshot of the key values that were current when it was read.

use std::fmt;

use tbfst_core::{Tag, TierLine};

use crate::CorpusError;
use crate::scanner::Field;

/// Key marker values identifying a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    keys: Vec<(Tag, Option<String>)>,
}

impl RecordContext {
    pub fn new(keys: &[Tag]) -> Self {
        Self {
            keys: keys.iter().map(|k| (k.clone(), None)).collect(),
        }
    }

    /// Current value of a key marker.
    pub fn get(&self, key: &Tag) -> Option<&str> {
        self.keys
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    fn rank(&self, tag: &Tag) -> Option<usize> {
        self.keys.iter().position(|(k, _)| k == tag)
    }

    /// Set the key at `rank` and clear all lower-ranked keys.
    fn set(&mut self, rank: usize, value: String) {
        self.keys[rank].1 = Some(value);
        for (_, v) in &mut self.keys[rank + 1..] {
            *v = None;
        }
    }
}

impl fmt::Display for RecordContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.keys {
            if let Some(value) = value {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{key} {value}")?;
                first = false;
            }
        }
        if first {
            f.write_str("(no key)")?;
        }
        Ok(())
    }
}

/// The non-key fields of one record, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub context: RecordContext,
    pub fields: Vec<Field>,
}

impl Record {
    /// The first field with the given marker, as a tier line.
    pub fn tier(&self, tag: &Tag) -> Option<TierLine> {
        self.fields
            .iter()
            .find(|f| f.tag == *tag)
            .map(|f| TierLine::new(f.tag.clone(), f.value.clone()))
    }

    /// Line number of the first field, for diagnostics.
    pub fn line(&self) -> Option<usize> {
        self.fields.first().map(|f| f.line)
    }
}

/// Groups a field stream into records.
pub struct Records<I> {
    fields: I,
    context: RecordContext,
    current: Vec<Field>,
    done: bool,
}

impl<I> Records<I>
where
    I: Iterator<Item = Result<Field, CorpusError>>,
{
    pub fn new(fields: I, keys: &[Tag]) -> Self {
        Self {
            fields,
            context: RecordContext::new(keys),
            current: Vec::new(),
            done: false,
        }
    }

    fn take(&mut self) -> Option<Record> {
        if self.current.is_empty() {
            return None;
        }
        Some(Record {
            context: self.context.clone(),
            fields: std::mem::take(&mut self.current),
        })
    }
}

impl<I> Iterator for Records<I>
where
    I: Iterator<Item = Result<Field, CorpusError>>,
{
    type Item = Result<Record, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.fields.next() {
                None => {
                    self.done = true;
                    return self.take().map(Ok);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(field)) => match self.context.rank(&field.tag) {
                    Some(rank) => {
                        let finished = self.take();
                        self.context.set(rank, field.value);
                        if let Some(record) = finished {
                            return Some(Ok(record));
                        }
                    }
                    None => self.current.push(field),
                },
            }
        }
    }
}
