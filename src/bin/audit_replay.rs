use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use audit_replay::{replay, ReplayConfig, ReplayQuery};

/// Prints the state of one or more top level fields at a given moment in time.
#[derive(Parser, Debug)]
#[command(name = "audit-replay", author, version, about, long_about = None)]
struct Args {
    /// Audit field to report (repeatable)
    #[arg(long = "field", value_name = "NAME", required = true)]
    fields: Vec<String>,

    /// Location of the audit log: a local directory or s3://bucket/prefix
    source_path: String,

    /// Target timestamp, e.g. 2016-01-09T05:00 or 2016-07-05T01:16:00.001282
    date_str: String,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Record key holding the change timestamp
    #[arg(long)]
    timestamp_key: Option<String>,

    /// Record key holding the updated fields
    #[arg(long, conflicts_with = "flat")]
    fields_key: Option<String>,

    /// Records are flat: every non-timestamp key is a field
    #[arg(long)]
    flat: bool,

    /// Record key holding the prior image
    #[arg(long)]
    prior_key: Option<String>,

    /// Shard file suffix
    #[arg(long)]
    suffix: Option<String>,

    /// Resolve unseen fields from the prior image of the next change
    #[arg(long)]
    backfill: bool,

    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn replay_config(&self) -> Result<ReplayConfig> {
        let mut config = match &self.config {
            Some(path) => ReplayConfig::load(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => ReplayConfig::default(),
        };
        if let Some(key) = &self.timestamp_key {
            config.schema.timestamp_key = key.clone();
        }
        if let Some(key) = &self.fields_key {
            config.schema.fields_key = Some(key.clone());
        }
        if self.flat {
            config.schema.fields_key = None;
            config.schema.prior_key = None;
        }
        if let Some(key) = &self.prior_key {
            config.schema.prior_key = Some(key.clone());
        }
        if let Some(suffix) = &self.suffix {
            config.shard_suffix = suffix.clone();
        }
        config.backfill_prior |= self.backfill;
        config.validate().context("invalid replay config")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = args.replay_config()?;

    let query = ReplayQuery::new(&args.source_path, &args.fields, &args.date_str)
        .context("invalid query")?;
    let result = replay(&query, &config)
        .with_context(|| format!("replay {} at {}", args.source_path, args.date_str))?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");
    Ok(())
}
