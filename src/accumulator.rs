//! Folding sparse records into point-in-time state.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::record::Record;
use crate::timestamp::Timestamp;

/// A field value and the timestamp of the record that wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub value: Value,
    pub at: Timestamp,
}

/// Accumulated field state. Only grows during a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: BTreeMap<String, Observed>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `record` into the snapshot, last write wins per field.
    ///
    /// Ordering is by record timestamp: an update older than the value
    /// already held is dropped. Equal timestamps resolve to the record applied
    /// last.
    pub fn apply(&mut self, record: Record) {
        let at = record.timestamp;
        for (name, value) in record.fields {
            match self.fields.get_mut(&name) {
                Some(current) if at < current.at => {}
                Some(current) => *current = Observed { value, at },
                None => {
                    self.fields.insert(name, Observed { value, at });
                }
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(|observed| &observed.value)
    }

    pub fn observed(&self, field: &str) -> Option<&Observed> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of offering one record to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    Applied,
    /// The record is after the target and was not applied. Records behind
    /// it in the same shard are later still.
    PastTarget,
}

/// State of the requested fields, split into observed and missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub state: BTreeMap<String, Value>,
    pub missing: Vec<String>,
}

/// Applies records up to and including `target`.
#[derive(Debug, Clone)]
pub struct StateAccumulator {
    target: Timestamp,
    snapshot: Snapshot,
    applied: u64,
}

impl StateAccumulator {
    pub fn new(target: Timestamp) -> Self {
        Self {
            target,
            snapshot: Snapshot::new(),
            applied: 0,
        }
    }

    pub fn target(&self) -> Timestamp {
        self.target
    }

    pub fn fold(&mut self, record: Record) -> Fold {
        if record.timestamp > self.target {
            return Fold::PastTarget;
        }
        self.snapshot.apply(record);
        self.applied += 1;
        Fold::Applied
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Looks up each requested field. Fields never written are reported in
    /// `missing`, in request order.
    pub fn project(&self, fields: &[String]) -> Projection {
        let mut projection = Projection::default();
        for field in fields {
            match self.snapshot.get(field) {
                Some(value) => {
                    projection.state.insert(field.clone(), value.clone());
                }
                None => projection.missing.push(field.clone()),
            }
        }
        projection
    }
}

/// Resolves fields that were never written at or before the target from the
/// prior image of the earliest later record that mentions them.
///
/// A later record that writes the field without a prior value means the field
/// did not exist yet at the target; it settles the field as absent. Either
/// way an even earlier record found afterwards takes over.
#[derive(Debug, Clone)]
pub struct PriorBackfill {
    target: Timestamp,
    /// Settling record timestamp and the prior value it carried, if any.
    settled: BTreeMap<String, (Timestamp, Option<Value>)>,
    pending: Vec<String>,
}

impl PriorBackfill {
    pub fn new(target: Timestamp, missing: &[String]) -> Self {
        Self {
            target,
            settled: BTreeMap::new(),
            pending: missing.to_vec(),
        }
    }

    /// Offers one record. Records at or before the target are ignored.
    pub fn offer(&mut self, record: &Record) {
        let at = record.timestamp;
        if at <= self.target {
            return;
        }
        for field in &self.pending {
            let prior = record.prior.get(field);
            if prior.is_none() && !record.fields.contains_key(field) {
                continue;
            }
            let earlier = match self.settled.get(field) {
                Some((current, _)) => at < *current,
                None => true,
            };
            if earlier {
                self.settled.insert(field.clone(), (at, prior.cloned()));
            }
        }
    }

    /// True once every pending field is settled by a record no later than
    /// `next_start`, so no shard starting there can improve the answer.
    pub fn is_settled_before(&self, next_start: Timestamp) -> bool {
        self.pending.iter().all(|field| match self.settled.get(field) {
            Some((at, _)) => *at <= next_start,
            None => false,
        })
    }

    /// Values recovered for pending fields.
    pub fn resolved(&self) -> BTreeMap<String, Value> {
        self.settled
            .iter()
            .filter_map(|(field, (_, prior))| {
                prior.as_ref().map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }
}
