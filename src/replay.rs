//! Query orchestration: locate shards, stream them in order, fold, project.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::accumulator::{Fold, PriorBackfill, Projection, StateAccumulator};
use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::record::RecordStream;
use crate::shard::{ShardLocator, ShardPlan};
use crate::storage::{LogRoot, ShardStore, StorageResolver};
use crate::timestamp::Timestamp;

/// "What did these fields look like at `target`?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayQuery {
    pub root: LogRoot,
    /// Requested fields, de-duplicated in first-seen order.
    pub fields: Vec<String>,
    pub target: Timestamp,
    /// The target exactly as given, echoed back in the result.
    pub target_input: String,
}

impl ReplayQuery {
    pub fn new<I, S>(root: &str, fields: I, target: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Ok(Self {
            root: LogRoot::parse(root)?,
            fields: unique,
            target: Timestamp::parse(target)?,
            target_input: target.to_string(),
        })
    }
}

/// Recoverable conditions attached to a successful result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayWarning {
    /// A requested field was never written up to the target.
    FieldMissing { field: String },
    /// No shard can hold records at or before the target.
    EmptyRange { root: String, target: Timestamp },
}

impl fmt::Display for ReplayWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayWarning::FieldMissing { field } => {
                write!(f, "The field \"{field}\" could not be found.")
            }
            ReplayWarning::EmptyRange { root, target } => {
                write!(f, "no shard under {root} covers {target}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub shards_selected: usize,
    pub shards_opened: usize,
    pub records_applied: u64,
    pub corrupt_records: u64,
    /// Fields recovered from prior images, in request order.
    pub backfilled: Vec<String>,
}

/// Serialises as `{"state": {...}, "ts": "<target as given>"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayResult {
    pub state: BTreeMap<String, Value>,
    pub ts: String,
    #[serde(skip)]
    pub warnings: Vec<ReplayWarning>,
    #[serde(skip)]
    pub stats: ReplayStats,
}

impl ReplayResult {
    pub fn missing_fields(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().filter_map(|warning| match warning {
            ReplayWarning::FieldMissing { field } => Some(field.as_str()),
            _ => None,
        })
    }
}

/// Runs queries against one store. Holds no state between runs.
pub struct ReplayEngine<'a> {
    store: &'a dyn ShardStore,
    config: &'a ReplayConfig,
}

impl<'a> ReplayEngine<'a> {
    pub fn new(store: &'a dyn ShardStore, config: &'a ReplayConfig) -> Self {
        Self { store, config }
    }

    /// Fails with `InvalidRoot` if `query.root` is not the root this engine's
    /// store reads from.
    pub fn run(&self, query: &ReplayQuery) -> Result<ReplayResult> {
        self.config.validate()?;
        let root = query.root.to_string();
        if root != self.store.root() {
            return Err(ReplayError::InvalidRoot {
                root,
                reason: format!("engine store reads from {}", self.store.root()),
            });
        }
        let target = query.target;
        let plan = ShardLocator::new(self.store, &self.config.shard_suffix).locate(target)?;

        let mut warnings = Vec::new();
        let mut stats = ReplayStats {
            shards_selected: plan.selected.len(),
            ..ReplayStats::default()
        };

        if plan.is_empty_range() {
            let warning = ReplayWarning::EmptyRange {
                root: self.store.root().to_string(),
                target,
            };
            log::warn!("{warning}");
            warnings.push(warning);
        }

        let mut acc = StateAccumulator::new(target);
        for shard in &plan.selected {
            log::debug!("scanning {shard}");
            let mut stream = RecordStream::open(self.store, shard, self.config)?;
            stats.shards_opened += 1;
            for record in stream.by_ref() {
                if acc.fold(record?) == Fold::PastTarget {
                    break;
                }
            }
            stats.corrupt_records += stream.corrupt_lines();
        }
        stats.records_applied = acc.applied();

        let mut projection = acc.project(&query.fields);
        if self.config.backfill_prior && !projection.missing.is_empty() {
            self.backfill(&plan, target, &mut projection, &mut stats)?;
        }

        for field in projection.missing {
            let warning = ReplayWarning::FieldMissing { field };
            log::warn!("{warning}");
            warnings.push(warning);
        }

        Ok(ReplayResult {
            state: projection.state,
            ts: query.target_input.clone(),
            warnings,
            stats,
        })
    }

    fn backfill(
        &self,
        plan: &ShardPlan,
        target: Timestamp,
        projection: &mut Projection,
        stats: &mut ReplayStats,
    ) -> Result<()> {
        let mut backfill = PriorBackfill::new(target, &projection.missing);
        for shard in plan.all() {
            if let Some(start) = shard.coverage_start {
                if backfill.is_settled_before(start) {
                    break;
                }
            }
            log::debug!("backfill scanning {shard}");
            let stream = RecordStream::open(self.store, shard, self.config)?;
            stats.shards_opened += 1;
            for record in stream {
                let record = record?;
                if record.timestamp <= target {
                    continue;
                }
                backfill.offer(&record);
                if backfill.is_settled_before(record.timestamp) {
                    break;
                }
            }
        }

        let resolved = backfill.resolved();
        for field in std::mem::take(&mut projection.missing) {
            match resolved.get(&field) {
                Some(value) => {
                    log::debug!("backfilled {field} from prior image");
                    projection.state.insert(field.clone(), value.clone());
                    stats.backfilled.push(field);
                }
                None => projection.missing.push(field),
            }
        }
        Ok(())
    }
}

/// Resolves the backend for `query.root` and runs the query.
pub fn replay(query: &ReplayQuery, config: &ReplayConfig) -> Result<ReplayResult> {
    let store = StorageResolver.open(&query.root)?;
    ReplayEngine::new(store.as_ref(), config).run(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_dedups_fields_in_order() {
        let query = ReplayQuery::new(
            "/some_dir/folder",
            ["ambientTemp", "schedule", "ambientTemp"],
            "2016-01-01T03:00",
        )
        .unwrap();
        assert_eq!(query.fields, vec!["ambientTemp", "schedule"]);
        assert_eq!(query.target_input, "2016-01-01T03:00");
    }

    #[test]
    fn query_rejects_bad_timestamp() {
        assert!(ReplayQuery::new("/x", ["a"], "yesterday").is_err());
    }

    #[test]
    fn result_serialises_state_and_ts_only() {
        let mut state = BTreeMap::new();
        state.insert("ambientTemp".to_string(), json!(77.0));
        state.insert("schedule".to_string(), json!(false));
        let result = ReplayResult {
            state,
            ts: "2016-01-01T03:00".to_string(),
            warnings: vec![ReplayWarning::FieldMissing {
                field: "barn".to_string(),
            }],
            stats: ReplayStats::default(),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"state": {"ambientTemp": 77.0, "schedule": false}, "ts": "2016-01-01T03:00"})
        );
        assert_eq!(result.missing_fields().collect::<Vec<_>>(), vec!["barn"]);
    }

    #[test]
    fn missing_field_warning_names_the_field() {
        let warning = ReplayWarning::FieldMissing {
            field: "barn".to_string(),
        };
        assert_eq!(warning.to_string(), "The field \"barn\" could not be found.");
    }
}
