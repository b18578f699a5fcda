// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Shared helpers for integration tests
//
// - relational backends run SeaORM against a SQLite file in a temp dir
// - document backends talk to an in-process CouchDB-compatible fake

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use food_store::config::{DocumentConfig, RelationalConfig, StorageConfig};
use food_store::{BackendFactory, FoodItem, StorageBackend};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A ready backend plus whatever must outlive it
pub struct TestBackend {
    pub store: Arc<dyn StorageBackend>,
    _temp_dir: Option<TempDir>,
}

pub async fn relational_backend() -> TestBackend {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig::relational(RelationalConfig {
        url: Some(format!(
            "sqlite://{}?mode=rwc",
            temp_dir.path().join("foods.db").display()
        )),
        ..RelationalConfig::default()
    });

    TestBackend {
        store: BackendFactory::create(&config).await.unwrap(),
        _temp_dir: Some(temp_dir),
    }
}

pub async fn document_backend() -> TestBackend {
    let uri = spawn_fake_couch("food_db").await;
    let config = StorageConfig::document(DocumentConfig {
        uri,
        database: "food_db".to_string(),
        ..DocumentConfig::default()
    });

    TestBackend {
        store: BackendFactory::create(&config).await.unwrap(),
        _temp_dir: None,
    }
}

pub fn food(id: &str, name: &str, protein: f64, fat: f64, carbs: f64) -> FoodItem {
    FoodItem::new(id, name, protein, fat, carbs).unwrap()
}

pub fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

pub fn sorted_ids(foods: &[FoodItem]) -> Vec<String> {
    let mut ids: Vec<String> = foods.iter().map(|f| f.id().to_string()).collect();
    ids.sort();
    ids
}

// ---------------------------------------------------------------------------
// CouchDB-compatible fake
// ---------------------------------------------------------------------------

struct StoredDoc {
    rev: u64,
    body: Value,
}

struct FakeCouch {
    database: String,
    created: AtomicBool,
    docs: DashMap<String, StoredDoc>,
}

impl FakeCouch {
    fn has_database(&self, db: &str) -> bool {
        db == self.database && self.created.load(Ordering::SeqCst)
    }
}

fn render(id: &str, doc: &StoredDoc) -> Value {
    let mut body = doc.body.clone();
    body["_id"] = json!(id);
    body["_rev"] = json!(format!("{}-fake", doc.rev));
    body
}

fn parse_rev(rev: &str) -> Option<u64> {
    rev.split('-').next()?.parse().ok()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "not_found", "reason": "missing"})),
    )
        .into_response()
}

/// CouchDB refuses non-reserved keys starting with `_`
fn reserved_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "illegal_docid",
            "reason": "Only reserved document ids may start with underscore."
        })),
    )
        .into_response()
}

fn conflict() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({"error": "conflict", "reason": "Document update conflict."})),
    )
        .into_response()
}

async fn up() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn create_db(State(couch): State<Arc<FakeCouch>>, Path(db): Path<String>) -> Response {
    if db != couch.database {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "illegal_database_name"})))
            .into_response();
    }
    if couch.created.swap(true, Ordering::SeqCst) {
        return (
            StatusCode::PRECONDITION_FAILED,
            Json(json!({"error": "file_exists"})),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"ok": true}))).into_response()
}

async fn all_docs(
    State(couch): State<Arc<FakeCouch>>,
    Path(db): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !couch.has_database(&db) {
        return not_found();
    }
    let include_docs = params.get("include_docs").map(String::as_str) == Some("true");

    let mut rows: Vec<Value> = couch
        .docs
        .iter()
        .map(|entry| {
            let mut row = json!({
                "id": entry.key(),
                "key": entry.key(),
                "value": {"rev": format!("{}-fake", entry.value().rev)},
            });
            if include_docs {
                row["doc"] = render(entry.key(), entry.value());
            }
            row
        })
        .collect();
    rows.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    Json(json!({"total_rows": rows.len(), "offset": 0, "rows": rows})).into_response()
}

async fn get_doc(
    State(couch): State<Arc<FakeCouch>>,
    Path((db, id)): Path<(String, String)>,
) -> Response {
    if !couch.has_database(&db) {
        return not_found();
    }
    if id.starts_with('_') {
        return reserved_id();
    }
    match couch.docs.get(&id) {
        Some(doc) => Json(render(&id, &doc)).into_response(),
        None => not_found(),
    }
}

async fn put_doc(
    State(couch): State<Arc<FakeCouch>>,
    Path((db, id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Response {
    if !couch.has_database(&db) {
        return not_found();
    }
    if id.starts_with('_') {
        return reserved_id();
    }

    let rev = body
        .get("_rev")
        .and_then(Value::as_str)
        .and_then(parse_rev);
    if let Some(map) = body.as_object_mut() {
        map.remove("_id");
        map.remove("_rev");
    }

    let new_rev = match (couch.docs.entry(id.clone()), rev) {
        (Entry::Vacant(slot), None) => {
            slot.insert(StoredDoc { rev: 1, body });
            1
        }
        (Entry::Occupied(mut slot), Some(rev)) if slot.get().rev == rev => {
            let doc = slot.get_mut();
            doc.rev += 1;
            doc.body = body;
            doc.rev
        }
        _ => return conflict(),
    };

    (
        StatusCode::CREATED,
        Json(json!({"ok": true, "id": id, "rev": format!("{}-fake", new_rev)})),
    )
        .into_response()
}

async fn delete_doc(
    State(couch): State<Arc<FakeCouch>>,
    Path((db, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !couch.has_database(&db) {
        return not_found();
    }
    if id.starts_with('_') {
        return reserved_id();
    }
    let rev = params.get("rev").and_then(|r| parse_rev(r));

    match couch.docs.entry(id) {
        Entry::Vacant(_) => not_found(),
        Entry::Occupied(slot) if Some(slot.get().rev) == rev => {
            slot.remove();
            (StatusCode::OK, Json(json!({"ok": true}))).into_response()
        }
        Entry::Occupied(_) => conflict(),
    }
}

/// Start a fake document store on an ephemeral port and return its base URI
pub async fn spawn_fake_couch(database: &str) -> String {
    let couch = Arc::new(FakeCouch {
        database: database.to_string(),
        created: AtomicBool::new(false),
        docs: DashMap::new(),
    });

    let app = Router::new()
        .route("/_up", get(up))
        .route("/:db", put(create_db))
        .route("/:db/_all_docs", get(all_docs))
        .route("/:db/:id", get(get_doc).put(put_doc).delete(delete_doc))
        .with_state(couch);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
