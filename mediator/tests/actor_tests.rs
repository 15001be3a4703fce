//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for request serialization across concurrent callers

use async_trait::async_trait;
use havok_mediator::{Mediator, Resource, StoreHandle, Table, key};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// A counter whose update yields between read and write.
struct SlowCounter {
    value: u64,
}

#[async_trait]
impl Resource for SlowCounter {
    type Request = ();
    type Reply = u64;
    type Error = std::io::Error;

    async fn handle(&mut self, _request: ()) -> Result<u64, std::io::Error> {
        let read = self.value;
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.value = read + 1;
        Ok(self.value)
    }
}

#[tokio::test]
async fn test_concurrent_read_modify_write_is_not_lost() {
    let counter = Mediator::single("counter", SlowCounter { value: 0 });
    let barrier = Arc::new(Barrier::new(16));
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let counter = counter.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            counter.call(()).await.unwrap()
        }));
    }
    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await.unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, (1..=16).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_puts_for_one_key_apply_in_submission_order() {
    let store = StoreHandle::spawn([("accounts", Table::in_memory(["email"]))]);
    let first = store.clone();
    let second = store.clone();

    let record = |n: u64| match json!({"email": "same@example.com", "generation": n}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };

    // join! polls in order, so the first put is queued before the second
    let (a, b) = tokio::join!(
        first.put_item("accounts", record(1)),
        second.put_item("accounts", record(2)),
    );
    a.unwrap();
    b.unwrap();

    let stored = store
        .get_item("accounts", key([("email", "same@example.com")]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("generation"), Some(&json!(2)));
}

#[tokio::test]
async fn test_dropped_caller_does_not_disturb_actor() {
    let counter = Mediator::single("counter", SlowCounter { value: 0 });
    let abandoned = {
        let counter = counter.clone();
        tokio::spawn(async move { counter.call(()).await })
    };
    tokio::task::yield_now().await;
    abandoned.abort();
    let value = counter.call(()).await.unwrap();
    assert!(value >= 1);
}

#[tokio::test]
async fn test_json_table_survives_reopen() {
    let path = std::env::temp_dir().join(format!("havok-table-{}.json", uuid::Uuid::new_v4()));
    {
        let table = Table::open(&path, ["email", "name"]).await.unwrap();
        let store = StoreHandle::spawn([("players", table)]);
        store
            .put("players", &json!({"email": "a@b.cd", "name": "Zed", "complete": true}))
            .await
            .unwrap();
    }
    let table = Table::open(&path, ["email", "name"]).await.unwrap();
    let store = StoreHandle::spawn([("players", table)]);
    let rows = store.get_all("players").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("complete"), Some(&json!(true)));
    tokio::fs::remove_file(&path).await.unwrap();
}
