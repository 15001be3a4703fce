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

//! Keyed record store
//!
//! Records are JSON objects. Each table names the fields that make up its
//! key, and a table is either purely in memory or mirrored to a JSON file
//! that is rewritten on every put. A put only changes the in-memory rows
//! once that rewrite has succeeded. All tables of a store share one
//! [`ResourceActor`](crate::ResourceActor), so puts against one table are
//! applied strictly in submission order.

use crate::{Mediator, MediatorError, MediatorResult, Resource, ResourceActor};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// A stored record
pub type Record = serde_json::Map<String, Value>;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// A key field is absent from the record or lookup key
    #[error("Missing key field {0}")]
    MissingKey(String),

    /// Record could not be converted to or from JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Table file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Table file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Operations understood by a [`Table`]
#[derive(Debug, Clone)]
pub enum StoreRequest {
    /// Look up one record by its key fields
    GetItem(Record),
    /// Insert or replace a record
    PutItem(Record),
    /// Insert or replace several records as one write
    PutItems(Vec<Record>),
    /// Insert a record only if no record has its key
    PutIfAbsent(Record),
    /// Every record in key order
    GetAll,
}

/// Replies produced by a [`Table`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreReply {
    /// Result of [`StoreRequest::GetItem`]
    Item(Option<Record>),
    /// A put was applied
    Stored,
    /// A [`StoreRequest::PutIfAbsent`] found this record under the key
    Exists(Record),
    /// Result of [`StoreRequest::GetAll`]
    Items(Vec<Record>),
}

/// Build a lookup key from field/value pairs.
pub fn key<I, F, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (F, V)>,
    F: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(field, value)| (field.into(), value.into()))
        .collect()
}

/// One table of records.
#[derive(Debug)]
pub struct Table {
    key_fields: Vec<String>,
    rows: BTreeMap<String, Record>,
    path: Option<PathBuf>,
}

impl Table {
    /// A table that lives only as long as the process.
    pub fn in_memory<I, S>(key_fields: I) -> Table
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
            path: None,
        }
    }

    /// A table backed by the JSON file at `path`, loading it if present.
    pub async fn open<I, S>(path: impl AsRef<Path>, key_fields: I) -> Result<Table, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.as_ref().to_path_buf();
        let mut table = Table::in_memory(key_fields);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<Record> = serde_json::from_slice(&bytes)?;
                for record in records {
                    let key = table.row_key(&record)?;
                    table.rows.insert(key, record);
                }
                info!(path = %path.display(), rows = table.rows.len(), "Loaded table");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Table file absent, starting empty");
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        }
        table.path = Some(path);
        Ok(table)
    }

    /// Fields forming the key, in order
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    fn row_key(&self, record: &Record) -> Result<String, StoreError> {
        let mut parts = Vec::with_capacity(self.key_fields.len());
        for field in &self.key_fields {
            match record.get(field) {
                Some(Value::String(text)) => parts.push(text.to_lowercase()),
                Some(Value::Null) | None => return Err(StoreError::MissingKey(field.clone())),
                Some(other) => parts.push(other.to_string()),
            }
        }
        Ok(parts.join("\u{1f}"))
    }

    /// Write `records` and commit them only if the file write succeeds.
    async fn store(&mut self, records: Vec<Record>) -> Result<(), StoreError> {
        let keyed = records
            .into_iter()
            .map(|record| Ok((self.row_key(&record)?, record)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        if self.path.is_none() {
            self.rows.extend(keyed);
            return Ok(());
        }
        let mut staged = self.rows.clone();
        staged.extend(keyed);
        self.flush(&staged).await?;
        self.rows = staged;
        Ok(())
    }

    async fn flush(&self, rows: &BTreeMap<String, Record>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let records: Vec<&Record> = rows.values().collect();
        let bytes = serde_json::to_vec_pretty(&records)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })
    }
}

#[async_trait]
impl Resource for Table {
    type Request = StoreRequest;
    type Reply = StoreReply;
    type Error = StoreError;

    async fn handle(&mut self, request: StoreRequest) -> Result<StoreReply, StoreError> {
        match request {
            StoreRequest::GetItem(lookup) => {
                let key = self.row_key(&lookup)?;
                Ok(StoreReply::Item(self.rows.get(&key).cloned()))
            }
            StoreRequest::PutItem(record) => {
                self.store(vec![record]).await?;
                Ok(StoreReply::Stored)
            }
            StoreRequest::PutItems(records) => {
                self.store(records).await?;
                Ok(StoreReply::Stored)
            }
            StoreRequest::PutIfAbsent(record) => {
                let key = self.row_key(&record)?;
                if let Some(existing) = self.rows.get(&key) {
                    return Ok(StoreReply::Exists(existing.clone()));
                }
                self.store(vec![record]).await?;
                Ok(StoreReply::Stored)
            }
            StoreRequest::GetAll => Ok(StoreReply::Items(self.rows.values().cloned().collect())),
        }
    }
}

/// Handle to the store actor with typed record access.
#[derive(Clone, Debug)]
pub struct StoreHandle {
    mediator: Mediator<String, Table>,
}

impl StoreHandle {
    /// Spawn a store actor owning `tables`.
    pub fn spawn<I, S>(tables: I) -> StoreHandle
    where
        I: IntoIterator<Item = (S, Table)>,
        S: Into<String>,
    {
        let tables: Vec<(String, Table)> = tables
            .into_iter()
            .map(|(name, table)| (name.into(), table))
            .collect();
        StoreHandle {
            mediator: ResourceActor::spawn("store", tables, crate::DEFAULT_QUEUE_DEPTH),
        }
    }

    /// The underlying mediator.
    pub fn mediator(&self) -> &Mediator<String, Table> {
        &self.mediator
    }

    /// Look up one raw record.
    pub async fn get_item(&self, table: &str, key: Record) -> MediatorResult<Option<Record>, StoreError> {
        match self.mediator.submit(table.to_string(), StoreRequest::GetItem(key)).await? {
            StoreReply::Item(item) => Ok(item),
            other => Err(unexpected(other)),
        }
    }

    /// Insert or replace one raw record.
    pub async fn put_item(&self, table: &str, record: Record) -> MediatorResult<(), StoreError> {
        match self.mediator.submit(table.to_string(), StoreRequest::PutItem(record)).await? {
            StoreReply::Stored => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Insert or replace several raw records of one table; all or none are stored.
    pub async fn put_items(&self, table: &str, records: Vec<Record>) -> MediatorResult<(), StoreError> {
        match self.mediator.submit(table.to_string(), StoreRequest::PutItems(records)).await? {
            StoreReply::Stored => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Insert `record` unless its key is taken, returning the holder if it is.
    pub async fn put_if_absent(&self, table: &str, record: Record) -> MediatorResult<Option<Record>, StoreError> {
        match self.mediator.submit(table.to_string(), StoreRequest::PutIfAbsent(record)).await? {
            StoreReply::Stored => Ok(None),
            StoreReply::Exists(existing) => Ok(Some(existing)),
            other => Err(unexpected(other)),
        }
    }

    /// Every raw record of a table.
    pub async fn get_all(&self, table: &str) -> MediatorResult<Vec<Record>, StoreError> {
        match self.mediator.submit(table.to_string(), StoreRequest::GetAll).await? {
            StoreReply::Items(items) => Ok(items),
            other => Err(unexpected(other)),
        }
    }

    /// Look up a record and deserialize it.
    pub async fn get<T: DeserializeOwned>(&self, table: &str, key: Record) -> MediatorResult<Option<T>, StoreError> {
        self.get_item(table, key)
            .await?
            .map(from_record)
            .transpose()
    }

    /// Serialize a value and store it.
    pub async fn put<T: Serialize>(&self, table: &str, value: &T) -> MediatorResult<(), StoreError> {
        self.put_item(table, to_record(value)?).await
    }

    /// Serialize several values and store them as one write.
    pub async fn put_all<T: Serialize>(&self, table: &str, values: &[T]) -> MediatorResult<(), StoreError> {
        let records = values.iter().map(to_record).collect::<MediatorResult<Vec<Record>, StoreError>>()?;
        self.put_items(table, records).await
    }

    /// Store `value` unless its key is taken, returning the holder if it is.
    pub async fn claim<T: Serialize + DeserializeOwned>(
        &self,
        table: &str,
        value: &T,
    ) -> MediatorResult<Option<T>, StoreError> {
        self.put_if_absent(table, to_record(value)?)
            .await?
            .map(from_record)
            .transpose()
    }

    /// Every record of a table, deserialized.
    pub async fn scan<T: DeserializeOwned>(&self, table: &str) -> MediatorResult<Vec<T>, StoreError> {
        self.get_all(table)
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }
}

fn to_record<T: Serialize>(value: &T) -> MediatorResult<Record, StoreError> {
    match serde_json::to_value(value).map_err(|err| MediatorError::Failed(err.into()))? {
        Value::Object(record) => Ok(record),
        _ => Err(MediatorError::Failed(StoreError::Json(serde::ser::Error::custom(
            "records must serialize to JSON objects",
        )))),
    }
}

fn from_record<T: DeserializeOwned>(record: Record) -> MediatorResult<T, StoreError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|err| MediatorError::Failed(StoreError::Json(err)))
}

fn unexpected(reply: StoreReply) -> MediatorError<StoreError> {
    MediatorError::Failed(StoreError::Json(serde::de::Error::custom(format!(
        "unexpected store reply {:?}",
        reply
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tracing_test::traced_test;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        email: String,
        name: String,
        level: u32,
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(record) => record,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_open_loads_existing_rows() {
        let path = std::env::temp_dir().join(format!("havok-open-{}.json", uuid::Uuid::new_v4()));
        let rows = json!([
            {"email": "a@example.com", "name": "Ann", "level": 1},
            {"email": "b@example.com", "name": "Bob", "level": 2},
        ]);
        tokio::fs::write(&path, rows.to_string()).await.unwrap();

        let table = Table::open(&path, ["email"]).await.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(logs_contain("Loaded table"));
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let mut table = Table::in_memory(["email"]);
        let reply = table
            .handle(StoreRequest::GetItem(key([("email", "nobody@example.com")])))
            .await
            .unwrap();
        assert_eq!(reply, StoreReply::Item(None));
    }

    #[tokio::test]
    async fn test_keys_are_case_insensitive() {
        let mut table = Table::in_memory(["email"]);
        table
            .handle(StoreRequest::PutItem(record(json!({"email": "Bob@Example.com", "x": 1}))))
            .await
            .unwrap();
        let reply = table
            .handle(StoreRequest::GetItem(key([("email", "bob@example.com")])))
            .await
            .unwrap();
        assert!(matches!(reply, StoreReply::Item(Some(_))));
    }

    #[tokio::test]
    async fn test_missing_key_field() {
        let mut table = Table::in_memory(["email", "name"]);
        let err = table
            .handle(StoreRequest::PutItem(record(json!({"email": "a@b.cd"}))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingKey(ref field) if field == "name"));
    }

    #[tokio::test]
    async fn test_typed_round_trip_through_actor() {
        let store = StoreHandle::spawn([("players", Table::in_memory(["email", "name"]))]);
        let row = Row {
            email: "a@b.cd".to_string(),
            name: "Zed".to_string(),
            level: 3,
        };
        store.put("players", &row).await.unwrap();
        let found: Option<Row> = store
            .get("players", key([("email", "a@b.cd"), ("name", "zed")]))
            .await
            .unwrap();
        assert_eq!(found, Some(row));
        let all: Vec<Row> = store.scan("players").await.unwrap();
        assert_eq!(all.len(), 1);
    }

    async fn blocked_table(name: &str) -> (Table, PathBuf) {
        let dir = std::env::temp_dir().join(format!("havok-{}-{}", name, uuid::Uuid::new_v4()));
        let path = dir.join("bank.json");
        let mut table = Table::open(&path, ["account"]).await.unwrap();
        table
            .handle(StoreRequest::PutItem(record(json!({"account": "frodo", "coins": 1}))))
            .await
            .unwrap();
        tokio::fs::create_dir_all(path.with_extension("json.tmp")).await.unwrap();
        (table, dir)
    }

    async fn row(table: &mut Table, account: &str) -> Option<Record> {
        match table
            .handle(StoreRequest::GetItem(key([("account", account)])))
            .await
            .unwrap()
        {
            StoreReply::Item(item) => item,
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_flush_leaves_rows_unchanged() {
        let (mut table, dir) = blocked_table("put").await;
        let err = table
            .handle(StoreRequest::PutItem(record(json!({"account": "frodo", "coins": 5}))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(row(&mut table, "frodo").await, Some(record(json!({"account": "frodo", "coins": 1}))));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_items_is_all_or_nothing() {
        let (mut table, dir) = blocked_table("items").await;
        let err = table
            .handle(StoreRequest::PutItems(vec![
                record(json!({"account": "frodo", "coins": 0})),
                record(json!({"account": "sam", "coins": 1})),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(row(&mut table, "frodo").await, Some(record(json!({"account": "frodo", "coins": 1}))));
        assert_eq!(row(&mut table, "sam").await, None);

        tokio::fs::remove_dir_all(dir.join("bank.json.tmp")).await.unwrap();
        table
            .handle(StoreRequest::PutItems(vec![
                record(json!({"account": "frodo", "coins": 0})),
                record(json!({"account": "sam", "coins": 1})),
            ]))
            .await
            .unwrap();
        let reopened = Table::open(dir.join("bank.json"), ["account"]).await.unwrap();
        assert_eq!(reopened.rows.len(), 2);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_items_with_bad_record_stores_nothing() {
        let mut table = Table::in_memory(["account"]);
        let err = table
            .handle(StoreRequest::PutItems(vec![
                record(json!({"account": "frodo"})),
                record(json!({"coins": 1})),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingKey(_)));
        assert_eq!(row(&mut table, "frodo").await, None);
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_first_claim() {
        let mut table = Table::in_memory(["account"]);
        let first = table
            .handle(StoreRequest::PutIfAbsent(record(json!({"account": "Bilbo", "owner": "a"}))))
            .await
            .unwrap();
        assert_eq!(first, StoreReply::Stored);
        let second = table
            .handle(StoreRequest::PutIfAbsent(record(json!({"account": "bilbo", "owner": "b"}))))
            .await
            .unwrap();
        assert_eq!(second, StoreReply::Exists(record(json!({"account": "Bilbo", "owner": "a"}))));
    }

    #[tokio::test]
    async fn test_concurrent_claims_through_actor() {
        let store = StoreHandle::spawn([("players", Table::in_memory(["email", "name"]))]);
        let mut tasks = Vec::new();
        for level in 0..10 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let row = Row {
                    email: "a@b.cd".to_string(),
                    name: "Zed".to_string(),
                    level,
                };
                store.claim("players", &row).await.unwrap().is_none()
            }));
        }
        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = StoreHandle::spawn(Vec::<(String, Table)>::new());
        let err = store.get_all("nowhere").await.unwrap_err();
        assert!(matches!(err, MediatorError::NoHandler(_)));
    }
}
