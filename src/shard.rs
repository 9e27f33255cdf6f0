//! Shard discovery and selection.
//!
//! A shard is one log file keyed by the calendar date in its name
//! (`2016/01/09.jsonl.gz`). Producers do not cut shards at exact day
//! boundaries: a shard may still hold records reaching back to the day of the
//! shard before it, and the first shard may reach back arbitrarily far.
//! Selection therefore works on coverage ranges rather than on the date label
//! alone.

use std::fmt;

use time::macros::format_description;
use time::Date;

use crate::error::Result;
use crate::storage::{ShardObject, ShardStore};
use crate::timestamp::Timestamp;

/// One shard, ordered by `(key, location)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardId {
    pub key: Date,
    pub name: String,
    pub location: String,
    /// Earliest timestamp this shard may contain. `None` for the first shard,
    /// whose records have no lower bound.
    pub coverage_start: Option<Timestamp>,
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Result of locating shards for a target timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardPlan {
    /// Shards whose coverage starts at or before the target, ascending.
    /// Empty only when the root holds no keyed shard.
    pub selected: Vec<ShardId>,
    /// Remaining shards, ascending. Never scanned for state; only consulted
    /// for prior-image backfill.
    pub later: Vec<ShardId>,
}

impl ShardPlan {
    /// No shard can hold a record at or before the target.
    pub fn is_empty_range(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &ShardId> {
        self.selected.iter().chain(self.later.iter())
    }
}

/// Derives the shard key from a name relative to the root.
///
/// The suffix is stripped and all digits are concatenated, so
/// `2016/01/09.jsonl.gz`, `2016-01-09.jsonl.gz` and `20160109.jsonl.gz` all
/// key to 2016-01-09.
pub fn shard_key(name: &str, suffix: &str) -> Option<Date> {
    let stem = name.strip_suffix(suffix)?;
    let digits: String = stem.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return None;
    }
    Date::parse(&digits, format_description!("[year][month][day]")).ok()
}

pub struct ShardLocator<'a> {
    store: &'a dyn ShardStore,
    suffix: &'a str,
}

impl<'a> ShardLocator<'a> {
    pub fn new(store: &'a dyn ShardStore, suffix: &'a str) -> Self {
        Self { store, suffix }
    }

    /// Every keyed shard under the root in ascending order, with coverage
    /// starts assigned.
    pub fn discover(&self) -> Result<Vec<ShardId>> {
        let objects = self.store.list_shards(self.suffix)?;
        let mut keyed: Vec<(Date, ShardObject)> = Vec::with_capacity(objects.len());
        for object in objects {
            match shard_key(&object.name, self.suffix) {
                Some(key) => keyed.push((key, object)),
                None => log::debug!("skipping unkeyed shard {}", object.location),
            }
        }
        keyed.sort_by(|(a_key, a), (b_key, b)| {
            a_key.cmp(b_key).then_with(|| a.location.cmp(&b.location))
        });

        let mut previous: Option<Date> = None;
        let shards = keyed
            .into_iter()
            .map(|(key, object)| {
                let coverage_start = previous.map(Timestamp::start_of);
                previous = Some(key);
                ShardId {
                    key,
                    name: object.name,
                    location: object.location,
                    coverage_start,
                }
            })
            .collect();
        Ok(shards)
    }

    /// Splits the shards into those that may hold records at or before
    /// `target` and those that cannot.
    pub fn locate(&self, target: Timestamp) -> Result<ShardPlan> {
        let mut shards = self.discover()?;
        let split = shards
            .iter()
            .position(|shard| shard.coverage_start.is_some_and(|start| start > target))
            .unwrap_or(shards.len());
        let later = shards.split_off(split);
        log::debug!(
            "{}: {} shard(s) selected for {target}, {} later",
            self.store.root(),
            shards.len(),
            later.len()
        );
        Ok(ShardPlan {
            selected: shards,
            later,
        })
    }
}
