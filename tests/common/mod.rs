#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};

/// `{"changeTime": ts, "after": after}`
pub fn change(ts: &str, after: Value) -> Value {
    json!({ "changeTime": ts, "after": after })
}

/// `{"changeTime": ts, "after": after, "before": before}`
pub fn change_with_prior(ts: &str, after: Value, before: Value) -> Value {
    json!({ "changeTime": ts, "after": after, "before": before })
}

pub fn gzip_lines(lines: &[Value]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        serde_json::to_writer(&mut encoder, line).expect("encode line");
        encoder.write_all(b"\n").expect("write newline");
    }
    encoder.finish().expect("finish gz")
}

/// Writes `<root>/<rel>` as a gzip ndjson shard.
pub fn write_shard(root: &Path, rel: &str, lines: &[Value]) {
    write_raw(root, rel, &gzip_lines(lines));
}

pub fn write_raw(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create shard dir");
    }
    let mut file = File::create(&path).expect("create shard");
    file.write_all(bytes).expect("write shard");
}
