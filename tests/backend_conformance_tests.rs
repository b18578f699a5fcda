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

// Storage backend conformance tests
//
// Every property here runs against the relational and the document backend.
// Both must produce the same outcomes; only the engine underneath differs.

mod common;

use common::{document_backend, food, relational_backend, sorted_ids, TestBackend};
use food_store::record::MAX_ID_LEN;
use food_store::{FoodItem, StorageBackend, StoreError};
use std::sync::Arc;

macro_rules! conformance_suite {
    ($name:ident, $factory:path) => {
        mod $name {
            use super::*;

            async fn backend() -> TestBackend {
                $factory().await
            }

            #[tokio::test]
            async fn test_round_trip() {
                let backend = backend().await;
                let banana = food("1001", "Banana", 1.1, 0.3, 22.8);

                let stored = backend.store.create(banana.clone()).await.unwrap();
                assert_eq!(stored, banana, "create returns the record unchanged");

                let fetched = backend.store.get("1001").await.unwrap();
                assert_eq!(fetched, banana);
                assert_eq!(fetched.name(), "Banana");
                assert_eq!(fetched.protein(), 1.1);
                assert_eq!(fetched.fat(), 0.3);
                assert_eq!(fetched.carbs(), 22.8);
            }

            #[tokio::test]
            async fn test_duplicate_create_rejected() {
                let backend = backend().await;
                let first = food("42", "Rice", 2.7, 0.3, 28.2);
                let second = food("42", "Rice (brown)", 2.6, 0.9, 23.0);

                backend.store.create(first.clone()).await.unwrap();
                let err = backend.store.create(second).await.unwrap_err();
                assert!(err.is_already_exists(), "unexpected error: {}", err);

                // The first write survives untouched
                assert_eq!(backend.store.get("42").await.unwrap(), first);
            }

            #[tokio::test]
            async fn test_missing_id_not_found() {
                let backend = backend().await;

                let err = backend.store.get("never-inserted").await.unwrap_err();
                assert!(err.is_not_found());

                let err = backend
                    .store
                    .update(food("never-inserted", "Ghost", 1.0, 1.0, 1.0))
                    .await
                    .unwrap_err();
                assert!(err.is_not_found());

                let err = backend.store.delete("never-inserted").await.unwrap_err();
                assert!(err.is_not_found());
            }

            #[tokio::test]
            async fn test_list_empty_store() {
                let backend = backend().await;
                let foods = backend.store.list().await.unwrap();
                assert!(foods.is_empty());
            }

            #[tokio::test]
            async fn test_list_completeness() {
                let backend = backend().await;
                for id in ["c", "a", "b"] {
                    backend
                        .store
                        .create(food(id, &format!("Food {}", id), 1.0, 2.0, 3.0))
                        .await
                        .unwrap();
                }

                let foods = backend.store.list().await.unwrap();
                assert_eq!(sorted_ids(&foods), vec!["a", "b", "c"]);
            }

            #[tokio::test]
            async fn test_deletion_finality() {
                let backend = backend().await;
                backend
                    .store
                    .create(food("gone", "Apple", 0.3, 0.2, 14.0))
                    .await
                    .unwrap();

                backend.store.delete("gone").await.unwrap();

                assert!(backend.store.get("gone").await.unwrap_err().is_not_found());
                assert!(backend.store.delete("gone").await.unwrap_err().is_not_found());
                assert!(backend.store.list().await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_update_replaces_mutable_fields() {
                let backend = backend().await;
                backend
                    .store
                    .create(food("7", "Egg", 12.6, 9.5, 0.7))
                    .await
                    .unwrap();

                let boiled = food("7", "Egg, boiled", 13.0, 11.0, 1.1);
                let updated = backend.store.update(boiled.clone()).await.unwrap();
                assert_eq!(updated, boiled);

                let fetched = backend.store.get("7").await.unwrap();
                assert_eq!(fetched, boiled);
                assert_eq!(fetched.id(), "7");

                let foods = backend.store.list().await.unwrap();
                assert_eq!(foods, vec![boiled]);
            }

            #[tokio::test]
            async fn test_repeated_update() {
                let backend = backend().await;
                backend
                    .store
                    .create(food("9", "Oats", 16.9, 6.9, 66.3))
                    .await
                    .unwrap();

                for protein in [10.0, 11.0, 12.0] {
                    backend
                        .store
                        .update(food("9", "Oats", protein, 6.9, 66.3))
                        .await
                        .unwrap();
                }

                assert_eq!(backend.store.get("9").await.unwrap().protein(), 12.0);
            }

            #[tokio::test]
            async fn test_recreate_after_delete() {
                let backend = backend().await;
                backend
                    .store
                    .create(food("5", "Milk", 3.2, 3.3, 4.8))
                    .await
                    .unwrap();
                backend.store.delete("5").await.unwrap();

                let skimmed = food("5", "Milk, skimmed", 3.4, 0.1, 5.0);
                backend.store.create(skimmed.clone()).await.unwrap();
                assert_eq!(backend.store.get("5").await.unwrap(), skimmed);
            }

            #[tokio::test]
            async fn test_awkward_ids() {
                let backend = backend().await;
                let ids = [
                    "with space",
                    "slash/inside",
                    "ümlaut",
                    "dots.and-dashes",
                    "_x",
                    "_design/menu",
                    "_all_docs",
                    "~tilde",
                    "~_both",
                ];

                for id in ids {
                    backend
                        .store
                        .create(food(id, "Odd", 1.0, 1.0, 1.0))
                        .await
                        .unwrap();
                }

                for id in ids {
                    assert_eq!(backend.store.get(id).await.unwrap().id(), id);
                }
                let mut expected: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                expected.sort();
                assert_eq!(sorted_ids(&backend.store.list().await.unwrap()), expected);

                backend.store.delete("slash/inside").await.unwrap();
                assert!(backend.store.get("slash/inside").await.unwrap_err().is_not_found());
            }

            #[tokio::test]
            async fn test_ids_differing_by_case_or_accent() {
                let backend = backend().await;
                let ids = ["Apple", "apple", "APPLE", "Äpple", "apple\u{301}"];

                for id in ids {
                    backend
                        .store
                        .create(food(id, &format!("Variant {}", id), 0.3, 0.2, 14.0))
                        .await
                        .unwrap_or_else(|e| panic!("create '{}' failed: {}", id, e));
                }

                for id in ids {
                    let fetched = backend.store.get(id).await.unwrap();
                    assert_eq!(fetched.id(), id);
                    assert_eq!(fetched.name(), format!("Variant {}", id));
                }

                backend.store.delete("apple").await.unwrap();
                assert!(backend.store.get("apple").await.unwrap_err().is_not_found());
                assert_eq!(backend.store.get("Apple").await.unwrap().id(), "Apple");
                assert_eq!(backend.store.list().await.unwrap().len(), ids.len() - 1);
            }

            #[tokio::test]
            async fn test_longest_id_and_long_name() {
                let backend = backend().await;
                let id = "ü".repeat(MAX_ID_LEN);
                let name = "Very long description ".repeat(40);
                let stored = food(&id, name.trim(), 1.0, 2.0, 3.0);

                backend.store.create(stored.clone()).await.unwrap();
                assert_eq!(backend.store.get(&id).await.unwrap(), stored);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_create_same_id() {
                let backend = backend().await;
                let store: Arc<dyn StorageBackend> = backend.store.clone();

                let handles: Vec<_> = (0..8)
                    .map(|i| {
                        let store = store.clone();
                        tokio::spawn(async move {
                            store
                                .create(food("contested", &format!("Writer {}", i), 1.0, 1.0, 1.0))
                                .await
                        })
                    })
                    .collect();

                let mut created = 0;
                let mut conflicts = 0;
                for handle in handles {
                    match handle.await.unwrap() {
                        Ok(_) => created += 1,
                        Err(StoreError::AlreadyExists(_)) => conflicts += 1,
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }

                assert_eq!(created, 1);
                assert_eq!(conflicts, 7);
                assert_eq!(store.list().await.unwrap().len(), 1);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_create_distinct_ids() {
                let backend = backend().await;
                let store: Arc<dyn StorageBackend> = backend.store.clone();

                let handles: Vec<_> = (0..20)
                    .map(|i| {
                        let store = store.clone();
                        tokio::spawn(async move {
                            store
                                .create(food(&format!("food-{:02}", i), "Bulk", 1.0, 1.0, 1.0))
                                .await
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.await.unwrap().unwrap();
                }

                assert_eq!(store.list().await.unwrap().len(), 20);
            }

            #[tokio::test]
            async fn test_initialize_is_idempotent() {
                let backend = backend().await;
                backend
                    .store
                    .create(food("keep", "Lentils", 9.0, 0.4, 20.1))
                    .await
                    .unwrap();

                backend.store.initialize().await.unwrap();
                backend.store.initialize().await.unwrap();

                assert!(backend.store.get("keep").await.is_ok());
            }

            #[tokio::test]
            async fn test_health_check() {
                let backend = backend().await;
                assert!(backend.store.health_check().await.unwrap());
            }
        }
    };
}

conformance_suite!(relational, relational_backend);
conformance_suite!(document, document_backend);

/// Observable outcome of one call, independent of the engine
#[derive(Debug, PartialEq)]
enum Outcome {
    Ok,
    Found(FoodItem),
    AlreadyExists,
    NotFound,
    Failed,
}

fn outcome<T>(result: Result<T, StoreError>, found: impl FnOnce(T) -> Option<FoodItem>) -> Outcome {
    match result {
        Ok(value) => match found(value) {
            Some(food) => Outcome::Found(food),
            None => Outcome::Ok,
        },
        Err(StoreError::AlreadyExists(_)) => Outcome::AlreadyExists,
        Err(StoreError::NotFound(_)) => Outcome::NotFound,
        Err(StoreError::Backend(_)) => Outcome::Failed,
    }
}

/// Replay one fixed call script and record every outcome plus the final listing
async fn replay(store: &dyn StorageBackend) -> (Vec<Outcome>, Vec<FoodItem>) {
    let mut outcomes = Vec::new();

    outcomes.push(outcome(store.create(food("a", "Apple", 0.3, 0.2, 14.0)).await, |_| None));
    outcomes.push(outcome(store.create(food("b", "Bread", 9.0, 3.2, 49.0)).await, |_| None));
    outcomes.push(outcome(store.create(food("a", "Apricot", 1.4, 0.4, 11.0)).await, |_| None));
    outcomes.push(outcome(store.get("a").await, Some));
    outcomes.push(outcome(store.get("zzz").await, Some));
    outcomes.push(outcome(store.update(food("b", "Bread, rye", 8.5, 3.3, 48.0)).await, |_| None));
    outcomes.push(outcome(store.update(food("zzz", "Nothing", 0.0, 0.0, 0.0)).await, |_| None));
    outcomes.push(outcome(store.delete("a").await, |_| None));
    outcomes.push(outcome(store.delete("a").await, |_| None));
    outcomes.push(outcome(store.get("a").await, Some));
    outcomes.push(outcome(store.create(food("c", "Cheese", 25.0, 33.0, 1.3)).await, |_| None));
    outcomes.push(outcome(store.get("b").await, Some));

    let mut foods = store.list().await.unwrap();
    foods.sort_by(|x, y| x.id().cmp(y.id()));

    (outcomes, foods)
}

#[tokio::test]
async fn test_backend_parity() {
    let relational = relational_backend().await;
    let document = document_backend().await;

    let (relational_outcomes, relational_foods) = replay(relational.store.as_ref()).await;
    let (document_outcomes, document_foods) = replay(document.store.as_ref()).await;

    assert_eq!(relational_outcomes, document_outcomes);
    assert_eq!(relational_foods, document_foods);

    // Sanity check the script itself
    assert_eq!(
        relational_outcomes,
        vec![
            Outcome::Ok,
            Outcome::Ok,
            Outcome::AlreadyExists,
            Outcome::Found(food("a", "Apple", 0.3, 0.2, 14.0)),
            Outcome::NotFound,
            Outcome::Ok,
            Outcome::NotFound,
            Outcome::Ok,
            Outcome::NotFound,
            Outcome::NotFound,
            Outcome::Ok,
            Outcome::Found(food("b", "Bread, rye", 8.5, 3.3, 48.0)),
        ]
    );
    assert_eq!(sorted_ids(&relational_foods), vec!["b", "c"]);
}
