//! Shard record decoding.
//!
//! A shard is newline-delimited JSON, usually gzip-compressed. Each line is one
//! sparse state update. Lines that fail to decode are skipped and counted;
//! failing to open or decompress the shard is fatal.

use std::io::{BufRead, BufReader, Read};

use flate2::read::MultiGzDecoder;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{RecordSchema, ReplayConfig};
use crate::error::{ReplayError, Result};
use crate::shard::ShardId;
use crate::storage::ShardStore;
use crate::timestamp::Timestamp;

pub type FieldMap = Map<String, Value>;

/// One decoded log line.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: Timestamp,
    /// Fields written by this record. Absent fields are unchanged.
    pub fields: FieldMap,
    /// Values fields held just before this record, when the producer wrote
    /// a prior image.
    pub prior: FieldMap,
}

impl Record {
    pub fn new(timestamp: Timestamp, fields: FieldMap) -> Self {
        Self {
            timestamp,
            fields,
            prior: FieldMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a json object")]
    NotAnObject,
    #[error("missing timestamp key '{0}'")]
    MissingTimestamp(String),
    #[error("unparseable timestamp {0}")]
    BadTimestamp(Value),
    #[error("'{0}' is not a json object")]
    NotAMap(String),
}

/// Decodes one line according to `schema`.
pub fn decode_line(
    line: &[u8],
    schema: &RecordSchema,
) -> std::result::Result<Record, DecodeError> {
    let Value::Object(mut object) = serde_json::from_slice::<Value>(line)? else {
        return Err(DecodeError::NotAnObject);
    };

    let raw_ts = object
        .remove(&schema.timestamp_key)
        .ok_or_else(|| DecodeError::MissingTimestamp(schema.timestamp_key.clone()))?;
    let timestamp = match raw_ts.as_str().map(Timestamp::parse) {
        Some(Ok(ts)) => ts,
        _ => return Err(DecodeError::BadTimestamp(raw_ts)),
    };

    let prior = match &schema.prior_key {
        Some(key) => take_map(&mut object, key)?,
        None => FieldMap::new(),
    };
    let fields = match &schema.fields_key {
        Some(key) => take_map(&mut object, key)?,
        None => object,
    };

    Ok(Record {
        timestamp,
        fields,
        prior,
    })
}

fn take_map(object: &mut FieldMap, key: &str) -> std::result::Result<FieldMap, DecodeError> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(FieldMap::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(DecodeError::NotAMap(key.to_string())),
    }
}

/// Lazy, single-pass sequence of records from one shard, in file order.
///
/// The underlying reader is dropped with the stream; reopen the shard to
/// read it again.
pub struct RecordStream<'a> {
    shard: String,
    reader: Box<dyn BufRead + 'a>,
    schema: &'a RecordSchema,
    buf: Vec<u8>,
    line_no: u64,
    corrupt: u64,
    failed: bool,
}

impl<'a> RecordStream<'a> {
    /// Opens `shard` through `store`, decompressing when the configured suffix
    /// says so.
    pub fn open(
        store: &'a dyn ShardStore,
        shard: &ShardId,
        config: &'a ReplayConfig,
    ) -> Result<Self> {
        let raw = store.open(&shard.location)?;
        Self::from_reader(&shard.location, raw, config.is_compressed(), &config.schema)
    }

    pub fn from_reader(
        label: &str,
        raw: impl Read + 'a,
        compressed: bool,
        schema: &'a RecordSchema,
    ) -> Result<Self> {
        let mut reader: Box<dyn BufRead + 'a> = if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(raw)))
        } else {
            Box::new(BufReader::new(raw))
        };
        // Forces the gzip header to be parsed so a non-gzip shard fails here
        // rather than looking like an empty one.
        reader
            .fill_buf()
            .map_err(|err| ReplayError::unreadable(label, err))?;

        Ok(Self {
            shard: label.to_string(),
            reader,
            schema,
            buf: Vec::new(),
            line_no: 0,
            corrupt: 0,
            failed: false,
        })
    }

    pub fn shard(&self) -> &str {
        &self.shard
    }

    /// Lines skipped so far because they failed to decode.
    pub fn corrupt_lines(&self) -> u64 {
        self.corrupt
    }
}

impl Iterator for RecordStream<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    self.failed = true;
                    return Some(Err(ReplayError::unreadable(self.shard.clone(), err)));
                }
            }
            self.line_no += 1;

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match decode_line(&self.buf, self.schema) {
                Ok(record) => return Some(Ok(record)),
                Err(err) => {
                    self.corrupt += 1;
                    log::warn!(
                        "{}:{}: skipping corrupt record: {err}",
                        self.shard,
                        self.line_no
                    );
                }
            }
        }
    }
}
