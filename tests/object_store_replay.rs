#![cfg(feature = "s3")]

mod common;

use std::sync::Arc;

use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::{json, Value};

use audit_replay::{ObjectShardStore, ReplayConfig, ReplayEngine, ReplayError, ReplayQuery};
use common::{change, gzip_lines};

fn seed(objects: &[(&str, Vec<u8>)]) -> Arc<InMemory> {
    let store = Arc::new(InMemory::new());
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    for (key, body) in objects {
        rt.block_on(store.put(&ObjectPath::from(*key), PutPayload::from(body.clone())))
            .expect("put");
    }
    store
}

fn shard(lines: &[Value]) -> Vec<u8> {
    gzip_lines(lines)
}

#[test]
fn replays_shards_from_object_store() {
    let store = seed(&[
        (
            "some_path/sub_folder/2016/01/08.jsonl.gz",
            shard(&[change("2016-01-08T20:44", json!({"ambientTemp": 81.0}))]),
        ),
        (
            "some_path/sub_folder/2016/01/09.jsonl.gz",
            shard(&[
                change("2016-01-09T01:00", json!({"schedule": true})),
                change("2016-01-09T09:00", json!({"ambientTemp": 90.0})),
            ]),
        ),
        (
            "some_path/sub_folder/2016/01/10.jsonl.gz",
            shard(&[change("2016-01-10T00:30", json!({"schedule": false}))]),
        ),
        (
            "some_path/sub_folder/2016/01/12.jsonl.gz",
            b"unreachable".to_vec(),
        ),
    ]);
    let shards = ObjectShardStore::new(
        store,
        "some_path/sub_folder",
        "s3://bucket/some_path/sub_folder",
    )
    .expect("store");
    let config = ReplayConfig::default();
    let query = ReplayQuery::new(
        "s3://bucket/some_path/sub_folder",
        ["ambientTemp", "schedule"],
        "2016-01-09T05:00",
    )
    .expect("query");

    let result = ReplayEngine::new(&shards, &config).run(&query).expect("replay");

    assert_eq!(
        serde_json::to_value(&result).expect("serialise"),
        json!({"state": {"ambientTemp": 81.0, "schedule": true}, "ts": "2016-01-09T05:00"})
    );
    assert_eq!(result.stats.shards_selected, 3);
    assert_eq!(result.stats.shards_opened, 3);
}

#[test]
fn empty_prefix_is_not_found() {
    let store = seed(&[(
        "elsewhere/2016/01/09.jsonl.gz",
        shard(&[change("2016-01-09T01:00", json!({"a": 1}))]),
    )]);
    let shards = ObjectShardStore::new(store, "missing", "s3://bucket/missing").expect("store");
    let config = ReplayConfig::default();
    let query = ReplayQuery::new("s3://bucket/missing", ["a"], "2016-01-09T05:00").expect("query");

    let err = ReplayEngine::new(&shards, &config)
        .run(&query)
        .unwrap_err();
    assert!(matches!(err, ReplayError::NotFound { .. }));
}
