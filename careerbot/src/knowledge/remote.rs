use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{check_dimensions, record_id_prefix, KnowledgeStore};
use crate::error::{CareerError, Result};
use crate::models::{
    CollectionHandle, KnowledgeRecord, Metadata, MetadataFilter, MetadataValue, ScoredRecord,
};

/// Metadata key carrying the passage text; the index stores only vectors
/// and flat metadata.
const TEXT_KEY: &str = "text";
const UPSERT_BATCH: usize = 100;
/// Ids per `/vectors/fetch` and `/vectors/delete` request.
const ID_BATCH: usize = 100;
/// Page size for `/vectors/list`.
const LIST_LIMIT: usize = 100;
/// Largest `topK` the index accepts when values or metadata are included.
const MAX_TOP_K: usize = 1_000;

#[derive(Debug, Clone)]
pub struct RemoteKnowledgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub dimensions: usize,
}

/// Managed vector index speaking the Pinecone data-plane REST API. One
/// namespace per owner; the index must be a serverless index created with
/// the cosine metric.
///
/// Filtered snapshots and deletes list ids by prefix, fetch them and check
/// the filter locally, so they see every match however many there are.
/// The index is eventually consistent and upserts larger than one request
/// are not atomic; callers rely on `replace_where` staging for rollback.
pub struct RemoteKnowledgeStore {
    client: Client,
    config: RemoteKnowledgeConfig,
}

#[derive(Debug, Serialize)]
struct RemoteVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedId>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct ListedId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Debug, Deserialize)]
struct FetchedVector {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: Map<String, Value>,
}

impl RemoteKnowledgeStore {
    pub fn new(config: RemoteKnowledgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CareerError::KnowledgeStore(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, endpoint: &str, body: Value) -> Result<T> {
        let request = self.client.post(self.url(endpoint)).json(&body);
        self.send(endpoint, request).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.client.get(self.url(endpoint)).query(params);
        self.send(endpoint, request).await
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        mut request: RequestBuilder,
    ) -> Result<T> {
        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Api-Key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CareerError::KnowledgeStore(format!("{endpoint} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CareerError::KnowledgeStore(format!(
                "{endpoint} returned {status}: {text}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CareerError::KnowledgeStore(format!("Invalid {endpoint} response: {e}")))
    }

    /// Every id in the owner's namespace starting with `prefix`, across all
    /// pages.
    async fn list_ids(&self, owner_id: &str, prefix: &str) -> Result<Vec<String>> {
        let limit = LIST_LIMIT.to_string();
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut params = vec![("namespace", owner_id), ("limit", limit.as_str())];
            if !prefix.is_empty() {
                params.push(("prefix", prefix));
            }
            if let Some(ref t) = token {
                params.push(("paginationToken", t.as_str()));
            }

            let page: ListResponse = self.get("/vectors/list", &params).await?;
            let page_len = page.vectors.len();
            ids.extend(page.vectors.into_iter().map(|v| v.id));

            token = page
                .pagination
                .and_then(|p| p.next)
                .filter(|next| !next.is_empty());
            if token.is_none() || page_len == 0 {
                break;
            }
        }
        Ok(ids)
    }

    async fn fetch(&self, owner_id: &str, ids: &[String]) -> Result<Vec<KnowledgeRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH) {
            let mut params: Vec<(&str, &str)> = vec![("namespace", owner_id)];
            params.extend(batch.iter().map(|id| ("ids", id.as_str())));

            let response: FetchResponse = self.get("/vectors/fetch", &params).await?;
            records.extend(
                response
                    .vectors
                    .into_values()
                    .map(|v| to_record(v.id, v.values, v.metadata)),
            );
        }
        Ok(records)
    }

    /// Records matching `filter`, sorted by id.
    async fn matching(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
    ) -> Result<Vec<KnowledgeRecord>> {
        let ids = self.list_ids(owner_id, &record_id_prefix(filter)).await?;
        let mut records: Vec<KnowledgeRecord> = self
            .fetch(owner_id, &ids)
            .await?
            .into_iter()
            .filter(|r| filter.matches(&r.metadata))
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

fn to_remote_metadata(record: &KnowledgeRecord) -> Map<String, Value> {
    let mut map: Map<String, Value> = record
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    map.insert(TEXT_KEY.to_string(), Value::from(record.text.clone()));
    map
}

fn to_record(id: String, values: Vec<f32>, remote: Map<String, Value>) -> KnowledgeRecord {
    let mut metadata = Metadata::new();
    let mut text = String::new();
    for (key, value) in remote {
        if key == TEXT_KEY {
            text = value.as_str().unwrap_or_default().to_string();
        } else if let Some(v) = MetadataValue::from_json(&value) {
            metadata.insert(key, v);
        }
    }
    KnowledgeRecord {
        id,
        vector: values,
        text,
        metadata,
    }
}

fn from_match(m: QueryMatch) -> ScoredRecord {
    ScoredRecord {
        record: to_record(m.id, m.values, m.metadata),
        score: m.score,
    }
}

/// `{"key": {"$eq": value}, ...}`, or `None` for an empty filter.
fn remote_filter(filter: &MetadataFilter) -> Option<Value> {
    if filter.is_empty() {
        return None;
    }
    let clauses: Map<String, Value> = filter
        .clauses()
        .iter()
        .map(|(k, v)| (k.clone(), json!({ "$eq": v.to_json() })))
        .collect();
    Some(Value::Object(clauses))
}

fn query_body(owner_id: &str, vector: &[f32], top_k: usize, filter: &MetadataFilter) -> Value {
    let mut body = json!({
        "namespace": owner_id,
        "vector": vector,
        "topK": top_k.min(MAX_TOP_K),
        "includeMetadata": true,
        "includeValues": true,
    });
    if let Some(f) = remote_filter(filter) {
        body["filter"] = f;
    }
    body
}

#[async_trait]
impl KnowledgeStore for RemoteKnowledgeStore {
    /// Namespaces are implicit; `created` reports whether the owner had no
    /// vectors yet.
    async fn ensure_collection(&self, owner_id: &str) -> Result<CollectionHandle> {
        let stats: IndexStats = self.post("/describe_index_stats", json!({})).await?;
        Ok(CollectionHandle {
            owner_id: owner_id.to_string(),
            created: !stats.namespaces.contains_key(owner_id),
        })
    }

    async fn upsert(&self, owner_id: &str, records: &[KnowledgeRecord]) -> Result<()> {
        for record in records {
            check_dimensions(self.config.dimensions, &record.vector)?;
        }

        for batch in records.chunks(UPSERT_BATCH) {
            let vectors: Vec<RemoteVector> = batch
                .iter()
                .map(|r| RemoteVector {
                    id: &r.id,
                    values: &r.vector,
                    metadata: to_remote_metadata(r),
                })
                .collect();
            let _: Value = self
                .post(
                    "/vectors/upsert",
                    json!({ "vectors": vectors, "namespace": owner_id }),
                )
                .await?;
        }
        Ok(())
    }

    async fn delete_where(&self, owner_id: &str, filter: &MetadataFilter) -> Result<usize> {
        filter.validate()?;
        let ids: Vec<String> = self
            .matching(owner_id, filter)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.delete_by_id(owner_id, &ids).await?;
        Ok(ids.len())
    }

    async fn delete_by_id(&self, owner_id: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        for batch in ids.chunks(ID_BATCH) {
            let _: Value = self
                .post(
                    "/vectors/delete",
                    json!({ "ids": batch, "namespace": owner_id }),
                )
                .await?;
        }
        Ok(())
    }

    async fn query(
        &self,
        owner_id: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredRecord>> {
        filter.validate()?;
        check_dimensions(self.config.dimensions, vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let response: QueryResponse = self
            .post("/query", query_body(owner_id, vector, top_k, filter))
            .await?;
        Ok(response.matches.into_iter().map(from_match).collect())
    }

    async fn get_where(
        &self,
        owner_id: &str,
        filter: &MetadataFilter,
    ) -> Result<Vec<KnowledgeRecord>> {
        filter.validate()?;
        self.matching(owner_id, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{
        body_partial_json, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn store(base_url: &str) -> RemoteKnowledgeStore {
        RemoteKnowledgeStore::new(RemoteKnowledgeConfig {
            base_url: base_url.to_string(),
            api_key: Some("pc-key".to_string()),
            timeout_secs: 5,
            dimensions: 2,
        })
        .unwrap()
    }

    fn record(id: &str) -> KnowledgeRecord {
        let mut metadata = Metadata::new();
        metadata.insert("category".to_string(), "resume".into());
        metadata.insert("chunk_index".to_string(), 0_i64.into());
        KnowledgeRecord {
            id: id.to_string(),
            vector: vec![0.6, 0.8],
            text: "Built a search engine".to_string(),
            metadata,
        }
    }

    #[test]
    fn test_remote_filter_shape() {
        let filter = MetadataFilter::new().eq("category", "jobs").eq("job_id", "j1");
        assert_eq!(
            remote_filter(&filter).unwrap(),
            json!({ "category": { "$eq": "jobs" }, "job_id": { "$eq": "j1" } })
        );
        assert!(remote_filter(&MetadataFilter::new()).is_none());
    }

    #[tokio::test]
    async fn test_upsert_sends_namespace_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(header("Api-Key", "pc-key"))
            .and(body_partial_json(json!({
                "namespace": "u1",
                "vectors": [{
                    "id": "resume:0",
                    "metadata": { "text": "Built a search engine", "category": "resume" }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server.uri())
            .upsert("u1", &[record("resume:0")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_query_maps_matches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({
                "namespace": "u1",
                "topK": 3,
                "filter": { "category": { "$eq": "resume" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [{
                    "id": "resume:0",
                    "score": 0.92,
                    "values": [0.6, 0.8],
                    "metadata": { "text": "Built a search engine", "category": "resume", "chunk_index": 0 }
                }]
            })))
            .mount(&server)
            .await;

        let results = store(&server.uri())
            .query("u1", &[1.0, 0.0], 3, &MetadataFilter::new().eq("category", "resume"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record, record("resume:0"));
        assert!((results[0].score - 0.92).abs() < 1e-6);
    }

    /// Answers `/vectors/fetch` with the requested ids that it knows.
    struct FetchResponder(Vec<Value>);

    impl Respond for FetchResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let wanted: Vec<String> = request
                .url
                .query_pairs()
                .filter(|(k, _)| k == "ids")
                .map(|(_, v)| v.into_owned())
                .collect();
            let vectors: Map<String, Value> = self
                .0
                .iter()
                .filter_map(|v| {
                    let id = v["id"].as_str()?.to_string();
                    wanted.contains(&id).then(|| (id, v.clone()))
                })
                .collect();
            ResponseTemplate::new(200)
                .set_body_json(json!({ "vectors": vectors, "namespace": "u1" }))
        }
    }

    fn stored(id: &str, extra: Value) -> Value {
        let mut metadata = json!({ "text": id, "category": "jobs", "job_id": "j1" });
        if let (Some(m), Some(e)) = (metadata.as_object_mut(), extra.as_object()) {
            m.extend(e.clone());
        }
        json!({ "id": id, "values": [1.0, 0.0], "metadata": metadata })
    }

    async fn mount_list_page(server: &MockServer, prefix: &str, token: Option<&str>, body: Value) {
        let mock = Mock::given(method("GET"))
            .and(path("/vectors/list"))
            .and(query_param("namespace", "u1"))
            .and(query_param("prefix", prefix));
        let mock = match token {
            Some(t) => mock.and(query_param("paginationToken", t)),
            None => mock.and(query_param_is_missing("paginationToken")),
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_delete_where_walks_every_list_page() {
        let server = MockServer::start().await;
        mount_list_page(
            &server,
            "resume:",
            None,
            json!({
                "vectors": [{ "id": "resume:0" }, { "id": "resume:1" }],
                "pagination": { "next": "page-2" },
                "namespace": "u1"
            }),
        )
        .await;
        mount_list_page(
            &server,
            "resume:",
            Some("page-2"),
            json!({ "vectors": [{ "id": "resume:2" }], "namespace": "u1" }),
        )
        .await;

        let resume = |id: &str| {
            json!({ "id": id, "values": [0.6, 0.8], "metadata": { "text": id, "category": "resume" } })
        };
        Mock::given(method("GET"))
            .and(path("/vectors/fetch"))
            .respond_with(FetchResponder(vec![
                resume("resume:0"),
                resume("resume:1"),
                resume("resume:2"),
            ]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .and(body_partial_json(json!({
                "ids": ["resume:0", "resume:1", "resume:2"],
                "namespace": "u1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let deleted = store(&server.uri())
            .delete_where("u1", &MetadataFilter::new().eq("category", "resume"))
            .await
            .unwrap();
        assert_eq!(deleted, 3);

        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.iter().all(|r| r.url.path() != "/query"));
    }

    #[tokio::test]
    async fn test_get_where_checks_every_clause_locally() {
        let server = MockServer::start().await;
        mount_list_page(
            &server,
            "job:j1:",
            None,
            json!({
                "vectors": [
                    { "id": "job:j1:responsibilities:0" },
                    { "id": "job:j1:qualifications:0" }
                ],
                "namespace": "u1"
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/vectors/fetch"))
            .respond_with(FetchResponder(vec![
                stored("job:j1:responsibilities:0", json!({ "section": "responsibilities" })),
                stored("job:j1:qualifications:0", json!({ "section": "qualifications" })),
            ]))
            .mount(&server)
            .await;

        let filter = MetadataFilter::new()
            .eq("category", "jobs")
            .eq("job_id", "j1")
            .eq("section", "qualifications");
        let records = store(&server.uri()).get_where("u1", &filter).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "job:j1:qualifications:0");
        assert_eq!(records[0].text, "job:j1:qualifications:0");
        assert_eq!(records[0].vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_query_caps_top_k() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({ "topK": 1000 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let results = store(&server.uri())
            .query("u1", &[1.0, 0.0], 5_000, &MetadataFilter::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_http_failure_is_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = store(&server.uri())
            .query("u1", &[1.0, 0.0], 3, &MetadataFilter::new())
            .await
            .unwrap_err();
        assert!(err.is_provider_failure());
    }

    #[tokio::test]
    async fn test_ensure_collection_reports_new_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": { "u1": { "vectorCount": 4 } },
                "dimension": 2
            })))
            .mount(&server)
            .await;

        let store = store(&server.uri());
        assert!(!store.ensure_collection("u1").await.unwrap().created);
        assert!(store.ensure_collection("u2").await.unwrap().created);
    }
}
