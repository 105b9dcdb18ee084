//! Dispatcher tests over stub models.
//!
//! The stub records which model operation fired and can be told to fail, so
//! every branch of the GET and POST paths can be driven directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Value, json};

use fhirmap_persistence::core::ResourceModel;
use fhirmap_persistence::error::{
    BackendError, ConfigurationError, ResourceError, StorageError, StorageResult,
};
use fhirmap_persistence::registry::{ModelProvider, ModelRegistry};
use fhirmap_persistence::schema::{self, ResourceDefinition};
use fhirmap_persistence::search::{CompiledFilter, CompiledSort};
use fhirmap_persistence::types::{PageLimits, StoredResource};
use fhirmap_rest::{DispatchOptions, DispatchResponse, RequestDispatcher};

/// A model that records its calls and serves a fixed set of records.
struct StubModel {
    definition: &'static ResourceDefinition,
    records: Vec<StoredResource>,
    failure: Option<fn() -> StorageError>,
    calls: Mutex<Vec<&'static str>>,
}

impl StubModel {
    fn new(resource_type: &str) -> Self {
        Self {
            definition: schema::definition(resource_type).unwrap(),
            records: Vec::new(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_record(mut self, id: &str, content: Value) -> Self {
        let resource_type = self.definition.name;
        self.records
            .push(StoredResource::new(resource_type, id, content));
        self
    }

    fn failing(mut self, failure: fn() -> StorageError) -> Self {
        self.failure = Some(failure);
        self
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> StorageResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ResourceModel for StubModel {
    fn definition(&self) -> &'static ResourceDefinition {
        self.definition
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }

    async fn get_by_primary_key(&self, id: &str) -> StorageResult<StoredResource> {
        self.record("get_by_primary_key")?;
        self.records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| {
                ResourceError::NotFound {
                    resource_type: self.definition.name.to_string(),
                    id: id.to_string(),
                }
                .into()
            })
    }

    async fn find(
        &self,
        _filters: &[CompiledFilter],
        _sort: &[CompiledSort],
    ) -> StorageResult<Vec<StoredResource>> {
        self.record("find")?;
        Ok(self.records.clone())
    }

    async fn resolve_reference(
        &self,
        _resource_type: &str,
        _id: &str,
    ) -> StorageResult<Option<StoredResource>> {
        Ok(None)
    }

    async fn after_create(&self, instance: StoredResource) -> StorageResult<StoredResource> {
        self.record("after_create")?;
        Ok(instance)
    }
}

/// Fails every load with a configuration error.
struct BrokenBackend;

#[async_trait]
impl ModelProvider for BrokenBackend {
    async fn load_models(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError> {
        Err(ConfigurationError::BackendNotConfigured)
    }
}

/// Serves one stub and counts loads.
struct CountingProvider {
    model: Arc<StubModel>,
    loads: Arc<AtomicUsize>,
}

#[async_trait]
impl ModelProvider for CountingProvider {
    async fn load_models(&self) -> Result<Vec<Arc<dyn ResourceModel>>, ConfigurationError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(vec![Arc::clone(&self.model) as Arc<dyn ResourceModel>])
    }
}

fn dispatcher_with(models: Vec<Arc<StubModel>>, options: DispatchOptions) -> RequestDispatcher {
    let models = models
        .into_iter()
        .map(|m| m as Arc<dyn ResourceModel>)
        .collect();
    RequestDispatcher::new(Arc::new(ModelRegistry::with_models(models)), options)
}

fn dispatcher(model: &Arc<StubModel>) -> RequestDispatcher {
    dispatcher_with(vec![Arc::clone(model)], DispatchOptions::default())
}

fn issue_code(response: &DispatchResponse) -> &str {
    response.payload["issue"][0]["code"].as_str().unwrap_or_default()
}

fn diagnostics(response: &DispatchResponse) -> &str {
    response.payload["issue"][0]["diagnostics"]
        .as_str()
        .unwrap_or_default()
}

// ============================================================================
// GET Tests
// ============================================================================

#[tokio::test]
async fn test_get_by_id() {
    let model = Arc::new(
        StubModel::new("Patient").with_record("940", json!({"resourceType": "Patient", "gender": "male"})),
    );
    let response = dispatcher(&model).handle_get_request("Patient/940").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.payload["resourceType"], "Patient");
    assert_eq!(response.payload["id"], "940");
    assert_eq!(response.payload["gender"], "male");
    assert_eq!(response.payload["meta"]["versionId"], "1");
}

#[tokio::test]
async fn test_id_selects_primary_key_lookup() {
    let model = Arc::new(StubModel::new("Patient").with_record("1", json!({})));
    let dispatcher = dispatcher(&model);

    dispatcher.handle_get_request("Patient/1").await;
    assert_eq!(model.calls(), ["get_by_primary_key"]);

    dispatcher.handle_get_request("Patient?gender=male").await;
    assert_eq!(model.calls(), ["get_by_primary_key", "find"]);
}

#[tokio::test]
async fn test_malformed_urls_are_bad_requests() {
    let model = Arc::new(StubModel::new("Patient"));
    let dispatcher = dispatcher(&model);

    for url in [
        "",
        "/",
        "patient",
        "Patient/1/2",
        "Patient/not valid",
        "Patient?name",
        "Patient?=x",
        "Patient?name:fuzzy=x",
        "Patient?name:exact:contains=x",
        "Patient?_count=many",
        "Patient?_sort=,",
        "Patient?_include=a:b:c",
    ] {
        let response = dispatcher.handle_get_request(url).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{url}");
        assert_eq!(issue_code(&response), "bad-request", "{url}");
        assert_eq!(response.payload["issue"][0]["severity"], "error");
    }
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_resource_type() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model).handle_get_request("Bogus/1").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.payload,
        json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": "error",
                "code": "not-found",
                "diagnostics": "Resource type \"Bogus\" does not exist or is not supported."
            }]
        })
    );
}

#[tokio::test]
async fn test_resource_type_is_case_sensitive() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model).handle_get_request("PATIENT").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model).handle_get_request("Patient/nope").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(issue_code(&response), "not-found");
}

#[tokio::test]
async fn test_empty_search_is_ok() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_get_request("Patient?name:contains=Jo")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.payload["resourceType"], "Bundle");
    assert_eq!(response.payload["type"], "searchset");
    assert_eq!(response.payload["total"], 0);
    assert_eq!(response.payload["entry"], json!([]));
}

#[tokio::test]
async fn test_query_rejected_by_model_is_not_found() {
    let model = Arc::new(StubModel::new("Patient"));
    let dispatcher = dispatcher(&model);

    for url in [
        "Patient?shoe-size=42",
        "Patient?gender:contains=m",
        "Patient?birthdate=yesterday",
        "Patient?_sort=gender",
        "Patient?_include=friends",
    ] {
        let response = dispatcher.handle_get_request(url).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{url}");
        assert_eq!(issue_code(&response), "not-found", "{url}");
    }
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_unmappable_record_is_not_found() {
    // Stored Observation without the required code element.
    let model = Arc::new(
        StubModel::new("Observation").with_record("o1", json!({"resourceType": "Observation", "status": "final"})),
    );
    let dispatcher = dispatcher(&model);

    let read = dispatcher.handle_get_request("Observation/o1").await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);
    assert!(diagnostics(&read).contains("Observation/o1"));

    let search = dispatcher.handle_get_request("Observation").await;
    assert_eq!(search.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unexpected_failure_is_server_error() {
    let model = Arc::new(StubModel::new("Patient").failing(|| {
        BackendError::QueryError {
            message: "database is locked".to_string(),
        }
        .into()
    }));
    let dispatcher = dispatcher(&model);

    for url in ["Patient/1", "Patient"] {
        let response = dispatcher.handle_get_request(url).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{url}");
        assert_eq!(issue_code(&response), "server-error");
        assert!(diagnostics(&response).contains("database is locked"));
    }
}

#[tokio::test]
async fn test_get_is_idempotent() {
    let model = Arc::new(
        StubModel::new("Patient")
            .with_record("a", json!({"gender": "male"}))
            .with_record("b", json!({"gender": "female"})),
    );
    let dispatcher = dispatcher(&model);

    for url in ["Patient/a", "Patient?_count=1", "Bogus", "patient"] {
        let first = dispatcher.handle_get_request(url).await;
        let second = dispatcher.handle_get_request(url).await;
        assert_eq!(first, second, "{url}");
    }
}

#[tokio::test]
async fn test_search_bundle_uses_base_url() {
    let model = Arc::new(StubModel::new("Patient").with_record("a", json!({})));
    let dispatcher = dispatcher_with(
        vec![model],
        DispatchOptions {
            base_url: "https://fhir.example.com/r4".to_string(),
            ..Default::default()
        },
    );

    let response = dispatcher.handle_get_request("Patient?gender=male").await;
    assert_eq!(
        response.payload["entry"][0]["fullUrl"],
        "https://fhir.example.com/r4/Patient/a"
    );
    assert_eq!(
        response.payload["link"][0]["url"],
        "https://fhir.example.com/r4/Patient?gender=male&_count=20&_offset=0"
    );
}

#[tokio::test]
async fn test_huge_offset_is_an_empty_page() {
    let model = Arc::new(StubModel::new("Patient").with_record("a", json!({})));
    let response = dispatcher(&model)
        .handle_get_request("Patient?_offset=18446744073709551615")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.payload["total"], 1);
    assert_eq!(response.payload["entry"], json!([]));
}

#[tokio::test]
async fn test_configured_max_page_size_above_default() {
    let mut model = StubModel::new("Patient");
    for i in 0..1200 {
        model = model.with_record(&format!("p{}", i), json!({}));
    }
    let dispatcher = dispatcher_with(
        vec![Arc::new(model)],
        DispatchOptions {
            page_limits: PageLimits {
                default_count: 20,
                max_count: 5000,
            },
            ..Default::default()
        },
    );

    let response = dispatcher.handle_get_request("Patient?_count=1500").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.payload["total"], 1200);
    assert_eq!(response.payload["entry"].as_array().unwrap().len(), 1200);
    assert!(
        response.payload["link"][0]["url"]
            .as_str()
            .unwrap()
            .contains("_count=1500")
    );
}

// ============================================================================
// POST Tests
// ============================================================================

#[tokio::test]
async fn test_create() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_post_request("Patient", json!({"resourceType": "Patient", "gender": "other"}))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.payload["gender"], "other");
    assert!(response.payload["id"].is_string());
    assert_eq!(response.payload["meta"]["versionId"], "1");
    assert_eq!(model.calls(), ["after_create"]);
}

#[tokio::test]
async fn test_create_with_id_in_url() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_post_request("Patient/p-7", json!({}))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.payload["id"], "p-7");
}

#[tokio::test]
async fn test_create_missing_required_field() {
    let model = Arc::new(StubModel::new("Observation"));
    let response = dispatcher(&model)
        .handle_post_request("Observation", json!({"resourceType": "Observation", "status": "final"}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(issue_code(&response), "validation");
    assert!(diagnostics(&response).contains("code"));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_create_invalid_body() {
    let model = Arc::new(StubModel::new("Patient"));
    let dispatcher = dispatcher(&model);

    for body in [
        json!([1, 2, 3]),
        json!({"resourceType": "Observation"}),
        json!({"id": "has spaces"}),
        json!({"managingOrganization": {"reference": "Patient/1"}}),
    ] {
        let response = dispatcher.handle_post_request("Patient", body.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(issue_code(&response), "validation", "{body}");
    }
}

#[tokio::test]
async fn test_create_unknown_schema_type() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_post_request("Bogus", json!({}))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(issue_code(&response), "not-found");
    assert_eq!(diagnostics(&response), "Resource \"Bogus\" does not exist.");
}

#[tokio::test]
async fn test_create_without_model_is_enveloped() {
    // Observation is in the schema but this registry has no model for it.
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_post_request(
            "Observation",
            json!({"status": "final", "code": {"text": "heart rate"}}),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.payload["resourceType"], "OperationOutcome");
    assert_eq!(issue_code(&response), "not-found");
}

#[tokio::test]
async fn test_create_malformed_url_is_enveloped() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_post_request("Patient/a/b", json!({}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(issue_code(&response), "bad-request");
}

#[tokio::test]
async fn test_create_persistence_failure_is_unprocessable() {
    let model = Arc::new(StubModel::new("Patient").failing(|| {
        ResourceError::AlreadyExists {
            resource_type: "Patient".to_string(),
            id: "1".to_string(),
        }
        .into()
    }));
    let response = dispatcher(&model)
        .handle_post_request("Patient", json!({"id": "1"}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(issue_code(&response), "validation");
    assert!(!diagnostics(&response).contains("AlreadyExists"));
}

#[tokio::test]
async fn test_create_id_mismatch_is_unprocessable() {
    let model = Arc::new(StubModel::new("Patient"));
    let response = dispatcher(&model)
        .handle_post_request("Patient/a", json!({"id": "b"}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_create_dangling_reference_is_unprocessable() {
    // The stub resolves no references.
    let model = Arc::new(StubModel::new("Observation"));
    let response = dispatcher(&model)
        .handle_post_request(
            "Observation",
            json!({"status": "final", "code": {"text": "x"}, "subject": {"reference": "Patient/ghost"}}),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(diagnostics(&response).contains("Patient/ghost"));
}

#[tokio::test]
async fn test_create_debug_diagnostics() {
    let model = Arc::new(StubModel::new("Patient").failing(|| {
        BackendError::QueryError {
            message: "constraint failed".to_string(),
        }
        .into()
    }));
    let dispatcher = dispatcher_with(
        vec![model],
        DispatchOptions {
            debug: true,
            ..Default::default()
        },
    );

    let response = dispatcher.handle_post_request("Patient", json!({})).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(diagnostics(&response).contains("QueryError"));
    assert!(diagnostics(&response).contains("constraint failed"));
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[tokio::test]
async fn test_configuration_error_is_server_error() {
    let dispatcher = RequestDispatcher::new(
        Arc::new(ModelRegistry::new(BrokenBackend)),
        DispatchOptions::default(),
    );

    let get = dispatcher.handle_get_request("Patient/1").await;
    assert_eq!(get.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(issue_code(&get), "server-error");
    assert_eq!(diagnostics(&get), "The server is improperly configured");

    let post = dispatcher.handle_post_request("Patient", json!({})).await;
    assert_eq!(post.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(issue_code(&post), "server-error");

    // Even an unknown type reports the configuration problem first.
    let unknown = dispatcher.handle_post_request("Bogus", json!({})).await;
    assert_eq!(unknown.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_parse_failure_precedes_configuration_error() {
    let dispatcher = RequestDispatcher::new(
        Arc::new(ModelRegistry::new(BrokenBackend)),
        DispatchOptions::default(),
    );
    let response = dispatcher.handle_get_request("not a type").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registry_loads_once_under_concurrency() {
    let loads = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        model: Arc::new(StubModel::new("Patient").with_record("1", json!({}))),
        loads: Arc::clone(&loads),
    };
    let dispatcher = Arc::new(RequestDispatcher::new(
        Arc::new(ModelRegistry::new(provider)),
        DispatchOptions::default(),
    ));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let url = if i % 2 == 0 { "Patient/1" } else { "Patient" };
                dispatcher.handle_get_request(url).await.status
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}
