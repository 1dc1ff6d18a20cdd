//! Rows and row sinks
//!
//! A [`RowSink`] is the consumer side of a query: it receives rows one at a
//! time and reports how many more it wants.

use crate::error::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::io::Write;

/// One result row: column values in output order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: &str, value: Value) {
        self.values.push((column.to_string(), value));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Consumer of result rows
pub trait RowSink {
    fn stream_row(&mut self, row: Row) -> Result<()>;

    /// Nonzero while the consumer still wants rows
    fn rows_remaining(&self) -> usize {
        usize::MAX
    }
}

/// Collects every row in memory
#[derive(Debug, Default)]
pub struct CollectSink {
    pub rows: Vec<Row>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl RowSink for CollectSink {
    fn stream_row(&mut self, row: Row) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }
}

/// Writes each row as one line of JSON as soon as it arrives
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl<W: Write> RowSink for JsonLinesSink<W> {
    fn stream_row(&mut self, row: Row) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &row).map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// Caps an inner sink at `limit` rows
pub struct LimitedSink<'a, S: RowSink> {
    inner: &'a mut S,
    limit: Option<usize>,
    emitted: usize,
}

impl<'a, S: RowSink> LimitedSink<'a, S> {
    pub fn new(inner: &'a mut S, limit: Option<usize>) -> Self {
        Self {
            inner,
            limit,
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl<S: RowSink> RowSink for LimitedSink<'_, S> {
    /// Rows past the limit are dropped
    fn stream_row(&mut self, row: Row) -> Result<()> {
        if self.rows_remaining() == 0 {
            return Ok(());
        }
        self.emitted += 1;
        self.inner.stream_row(row)
    }

    fn rows_remaining(&self) -> usize {
        let inner = self.inner.rows_remaining();
        match self.limit {
            Some(limit) => inner.min(limit.saturating_sub(self.emitted)),
            None => inner,
        }
    }
}
