//! Shared test helpers for API tests.

#![allow(dead_code)]

use chatsync_api::{ApiClient, ApiConfig};
use chatsync_types::{EntityInfo, EntityKey, EntityKind};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub fn mock_config(server: &MockServer) -> ApiConfig {
    ApiConfig::new(server.uri())
}

pub fn mock_client(server: &MockServer) -> ApiClient {
    ApiClient::new(mock_config(server)).unwrap()
}

pub fn key(folders: &[&str], name: &str) -> EntityKey {
    EntityKey::new("u1", folders.iter().map(|s| s.to_string()).collect(), name).unwrap()
}

pub fn info(kind: EntityKind, folders: &[&str], name: &str) -> EntityInfo {
    EntityInfo::new(kind, key(folders, name))
}

/// In-memory stand-in for the metadata/content API.
///
/// `GET/PUT/DELETE /api/{id}` operate on stored documents; a `GET` on a path
/// ending in `/` lists the folder.
#[derive(Clone, Default)]
pub struct FakeApi {
    docs: Arc<Mutex<BTreeMap<String, serde_json::Value>>>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
    failing_puts: Arc<Mutex<HashSet<String>>>,
}

impl FakeApi {
    pub async fn mount(server: &MockServer) -> Self {
        let fake = FakeApi::default();
        Mock::given(path_regex("^/api/.*"))
            .respond_with(fake.clone())
            .mount(server)
            .await;
        fake
    }

    pub fn insert(&self, id: &str, doc: serde_json::Value) {
        self.docs.lock().unwrap().insert(id.to_string(), doc);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.lock().unwrap().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<serde_json::Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.docs.lock().unwrap().keys().cloned().collect()
    }

    /// Makes every DELETE of `id` answer 500.
    pub fn fail_delete(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(id.to_string());
    }

    /// Makes every PUT of `id` answer 500.
    pub fn fail_put(&self, id: &str) {
        self.failing_puts.lock().unwrap().insert(id.to_string());
    }

    fn listing(&self, folder_id: &str, recursive: bool) -> ResponseTemplate {
        let prefix = format!("{folder_id}/");
        let docs = self.docs.lock().unwrap();
        let items: Vec<serde_json::Value> = docs
            .keys()
            .filter(|id| id.starts_with(&prefix))
            .filter(|id| recursive || !id[prefix.len()..].contains('/'))
            .map(|id| {
                serde_json::json!({
                    "name": id.rsplit('/').next().unwrap_or_default(),
                    "url": id,
                    "nodeType": "ITEM",
                    "updatedAt": 1_700_000_000_000i64
                })
            })
            .collect();

        if items.is_empty() {
            return ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "not found"}));
        }
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": prefix,
            "nodeType": "FOLDER",
            "items": items
        }))
    }
}

impl Respond for FakeApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path();
        let id = path.trim_start_matches("/api/");

        match request.method.as_str() {
            "GET" if id.ends_with('/') => {
                let recursive = request
                    .url
                    .query_pairs()
                    .any(|(k, v)| k == "recursive" && v == "true");
                self.listing(id.trim_end_matches('/'), recursive)
            }
            "GET" => match self.get(id) {
                Some(doc) => ResponseTemplate::new(200).set_body_json(doc),
                None => ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "not found"})),
            },
            "PUT" => {
                if self.failing_puts.lock().unwrap().contains(id) {
                    return ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "put failed"}));
                }
                let doc: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                self.insert(id, doc);
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "url": id,
                    "updatedAt": 1_700_000_000_500i64
                }))
            }
            "DELETE" => {
                if self.failing_deletes.lock().unwrap().contains(id) {
                    return ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "delete failed"}));
                }
                match self.docs.lock().unwrap().remove(id) {
                    Some(_) => ResponseTemplate::new(204),
                    None => ResponseTemplate::new(404),
                }
            }
            _ => ResponseTemplate::new(405),
        }
    }
}
