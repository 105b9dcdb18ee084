//! Model contract tests.
//!
//! Every scenario runs against both the document and the SQLite backend and
//! must produce identical results.

mod common;

use serde_json::json;

use common::{TestBackend, observation, patient, seed};
use fhirmap_persistence::core::{FetchResult, ResourceModel};
use fhirmap_persistence::error::{ResourceError, StorageError, ValidationError};
use fhirmap_persistence::schema::FhirResource;
use fhirmap_persistence::types::{
    IncludeDirective, Pagination, ResourceQuery, SearchFilter, SearchModifier, SortDirective,
    StoredResource,
};

async fn search_ids(backend: &TestBackend, query: ResourceQuery) -> Vec<String> {
    let model = backend.model(&query.resource_type).await;
    match model.get(&query).await {
        Ok(FetchResult::Collection { resources, .. }) => resources
            .iter()
            .map(|r| r.id().unwrap_or_default().to_string())
            .collect(),
        Ok(FetchResult::Single { .. }) => panic!("[{}] expected a collection", backend.name),
        Err(e) => panic!("[{}] search failed: {}", backend.name, e),
    }
}

async fn search_err(backend: &TestBackend, query: ResourceQuery) -> StorageError {
    let model = backend.model(&query.resource_type).await;
    match model.get(&query).await {
        Ok(_) => panic!("[{}] expected an error", backend.name),
        Err(e) => e,
    }
}

// ============================================================================
// Create Tests
// ============================================================================

#[tokio::test]
async fn test_create_assigns_id_and_version() {
    for backend in TestBackend::all() {
        let created = backend
            .create("Patient", json!({"name": [{"family": "Nobody"}]}))
            .await;

        assert_eq!(created.resource_type(), "Patient");
        assert!(!created.id().is_empty(), "[{}]", backend.name);
        assert_eq!(created.version_id(), "1");
        assert_eq!(created.content()["id"], created.id());
    }
}

#[tokio::test]
async fn test_create_keeps_body_id() {
    for backend in TestBackend::all() {
        let created = backend
            .create("Patient", patient("p-1", "Smith", "Jo", "2000-01-01", "other"))
            .await;
        assert_eq!(created.id(), "p-1", "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_create_uses_query_id() {
    for backend in TestBackend::all() {
        let model = backend.model("Patient").await;
        let resource = FhirResource::construct("Patient", json!({"gender": "male"})).unwrap();

        let created = model
            .create_from_resource(resource, &ResourceQuery::by_id("Patient", "from-url"))
            .await
            .unwrap();
        assert_eq!(created.id(), "from-url", "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_create_rejects_id_mismatch() {
    for backend in TestBackend::all() {
        let model = backend.model("Patient").await;
        let resource = FhirResource::construct("Patient", json!({"id": "a"})).unwrap();

        let err = model
            .create_from_resource(resource, &ResourceQuery::by_id("Patient", "b"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, StorageError::Validation(ValidationError::IdMismatch { .. })),
            "[{}] {:?}",
            backend.name,
            err
        );
    }
}

#[tokio::test]
async fn test_create_duplicate_fails() {
    for backend in TestBackend::all() {
        backend
            .create("Patient", json!({"id": "dup", "gender": "male"}))
            .await;

        let model = backend.model("Patient").await;
        let again = FhirResource::construct("Patient", json!({"id": "dup"})).unwrap();
        let err = model
            .create_from_resource(again, &ResourceQuery::new("Patient"))
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                StorageError::Resource(ResourceError::AlreadyExists { .. })
            ),
            "[{}] {:?}",
            backend.name,
            err
        );
    }
}

#[tokio::test]
async fn test_create_rejects_dangling_reference() {
    for backend in TestBackend::all() {
        let model = backend.model("Observation").await;
        let resource =
            FhirResource::construct("Observation", observation("o9", "Patient/ghost", "x", 1.0))
                .unwrap();

        let err = model
            .create_from_resource(resource, &ResourceQuery::new("Observation"))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                StorageError::Validation(ValidationError::InvalidReference { .. })
            ),
            "[{}] {:?}",
            backend.name,
            err
        );

        // Nothing was saved.
        let missing = model.get_by_primary_key("o9").await.unwrap_err();
        assert!(missing.is_fetch_failure());
    }
}

#[tokio::test]
async fn test_create_rejects_wrong_type() {
    for backend in TestBackend::all() {
        let model = backend.model("Patient").await;
        let practitioner = FhirResource::construct("Practitioner", json!({})).unwrap();

        let err = model
            .create_from_resource(practitioner, &ResourceQuery::new("Patient"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)), "[{}]", backend.name);
    }
}

// ============================================================================
// Read Tests
// ============================================================================

#[tokio::test]
async fn test_get_by_id() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let model = backend.model("Patient").await;

        match model.get(&ResourceQuery::by_id("Patient", "p1")).await.unwrap() {
            FetchResult::Single { resource, included } => {
                assert_eq!(resource.id(), Some("p1"));
                assert_eq!(resource.as_json()["meta"]["versionId"], "1");
                assert!(included.is_empty());
            }
            FetchResult::Collection { .. } => panic!("[{}] expected single", backend.name),
        }
    }
}

#[tokio::test]
async fn test_get_by_id_not_found() {
    for backend in TestBackend::all() {
        let err = search_err(&backend, ResourceQuery::by_id("Patient", "nope")).await;
        assert!(
            matches!(err, StorageError::Resource(ResourceError::NotFound { .. })),
            "[{}] {:?}",
            backend.name,
            err
        );
        assert!(err.is_fetch_failure());
    }
}

#[tokio::test]
async fn test_invalid_stored_record_is_mapping_error() {
    for backend in TestBackend::all() {
        backend.insert_raw(StoredResource::new(
            "Observation",
            "broken",
            json!({"resourceType": "Observation", "status": "final"}),
        ));

        let err = search_err(&backend, ResourceQuery::by_id("Observation", "broken")).await;
        assert!(
            matches!(err, StorageError::Mapping(_)),
            "[{}] {:?}",
            backend.name,
            err
        );
        assert!(err.is_fetch_failure());

        let err = search_err(&backend, ResourceQuery::new("Observation")).await;
        assert!(matches!(err, StorageError::Mapping(_)), "[{}]", backend.name);
    }
}

// ============================================================================
// Search Tests
// ============================================================================

#[tokio::test]
async fn test_search_all() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let ids = search_ids(&backend, ResourceQuery::new("Patient")).await;
        assert_eq!(ids, ["p1", "p2", "p3"], "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_search_string_default_is_prefix() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let query = ResourceQuery::new("Patient").with_filter(SearchFilter::new("family", "CHAL"));
        assert_eq!(search_ids(&backend, query).await, ["p1", "p3"], "[{}]", backend.name);

        let query = ResourceQuery::new("Patient").with_filter(SearchFilter::new("name", "anne"));
        assert_eq!(search_ids(&backend, query).await, ["p2"], "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_search_string_modifiers() {
    for backend in TestBackend::all() {
        seed(&backend).await;

        let contains = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("family", "ALM").with_modifier(SearchModifier::Contains));
        assert_eq!(search_ids(&backend, contains).await, ["p1"], "[{}]", backend.name);

        let exact = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("family", "Chalk").with_modifier(SearchModifier::Exact));
        assert_eq!(search_ids(&backend, exact).await, ["p3"], "[{}]", backend.name);

        let exact_case = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("family", "chalk").with_modifier(SearchModifier::Exact));
        assert!(search_ids(&backend, exact_case).await.is_empty());
    }
}

#[tokio::test]
async fn test_search_token_and_id() {
    for backend in TestBackend::all() {
        seed(&backend).await;

        let male = ResourceQuery::new("Patient").with_filter(SearchFilter::new("gender", "male"));
        assert_eq!(search_ids(&backend, male).await, ["p1", "p3"], "[{}]", backend.name);

        let by_id = ResourceQuery::new("Patient").with_filter(SearchFilter::new("_id", "p2"));
        assert_eq!(search_ids(&backend, by_id).await, ["p2"], "[{}]", backend.name);

        let coded = ResourceQuery::new("Observation")
            .with_filter(SearchFilter::new("code", "http://loinc.org|8867-4"));
        assert_eq!(search_ids(&backend, coded).await, ["o1"], "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_search_date_prefixes() {
    for backend in TestBackend::all() {
        seed(&backend).await;

        let before = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("birthdate", "lt1960"));
        assert_eq!(search_ids(&backend, before).await, ["p2"], "[{}]", backend.name);

        let from = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("birthdate", "ge1974"));
        assert_eq!(search_ids(&backend, from).await, ["p1", "p3"], "[{}]", backend.name);

        let within = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("birthdate", "1974-12"));
        assert_eq!(search_ids(&backend, within).await, ["p1"], "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_search_number() {
    for backend in TestBackend::all() {
        seed(&backend).await;

        let high = ResourceQuery::new("Observation")
            .with_filter(SearchFilter::new("value-quantity", "gt50"));
        assert_eq!(search_ids(&backend, high).await, ["o1"], "[{}]", backend.name);

        let exact = ResourceQuery::new("Observation")
            .with_filter(SearchFilter::new("value-quantity", "36.6"));
        assert_eq!(search_ids(&backend, exact).await, ["o2"], "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_search_reference() {
    for backend in TestBackend::all() {
        seed(&backend).await;

        let typed = ResourceQuery::new("Observation")
            .with_filter(SearchFilter::new("subject", "Patient/p1"));
        assert_eq!(search_ids(&backend, typed).await, ["o1", "o2"], "[{}]", backend.name);

        let bare = ResourceQuery::new("Observation").with_filter(SearchFilter::new("patient", "p1"));
        assert_eq!(search_ids(&backend, bare).await, ["o1", "o2"], "[{}]", backend.name);

        let other = ResourceQuery::new("Observation")
            .with_filter(SearchFilter::new("subject", "Patient/p2"));
        assert!(search_ids(&backend, other).await.is_empty());
    }
}

#[tokio::test]
async fn test_search_missing_and_not() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        backend.create("Patient", json!({"id": "p4"})).await;

        let no_gender = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("gender", "true").with_modifier(SearchModifier::Missing));
        assert_eq!(search_ids(&backend, no_gender).await, ["p4"], "[{}]", backend.name);

        let not_male = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("gender", "male").with_modifier(SearchModifier::Not));
        assert_eq!(
            search_ids(&backend, not_male).await,
            ["p2", "p4"],
            "[{}]",
            backend.name
        );
    }
}

#[tokio::test]
async fn test_search_filters_are_anded() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let query = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("family", "chal"))
            .with_filter(SearchFilter::new("birthdate", "gt1980"));
        assert_eq!(search_ids(&backend, query).await, ["p3"], "[{}]", backend.name);
    }
}

#[tokio::test]
async fn test_search_unknown_parameter_is_validation_error() {
    for backend in TestBackend::all() {
        let query =
            ResourceQuery::new("Patient").with_filter(SearchFilter::new("shoe-size", "42"));
        let err = search_err(&backend, query).await;
        assert!(
            matches!(
                err,
                StorageError::Validation(ValidationError::UnknownSearchParameter { .. })
            ),
            "[{}] {:?}",
            backend.name,
            err
        );
        assert!(err.is_fetch_failure());
    }
}

#[tokio::test]
async fn test_search_unsupported_modifier_is_validation_error() {
    for backend in TestBackend::all() {
        let query = ResourceQuery::new("Patient")
            .with_filter(SearchFilter::new("gender", "male").with_modifier(SearchModifier::Contains));
        let err = search_err(&backend, query).await;
        assert!(
            matches!(
                err,
                StorageError::Validation(ValidationError::UnsupportedModifier { .. })
            ),
            "[{}]",
            backend.name
        );
    }
}

// ============================================================================
// Sort and Pagination Tests
// ============================================================================

#[tokio::test]
async fn test_sort() {
    for backend in TestBackend::all() {
        seed(&backend).await;

        let desc = ResourceQuery::new("Patient").with_sort(SortDirective::parse("-birthdate"));
        assert_eq!(
            search_ids(&backend, desc).await,
            ["p3", "p1", "p2"],
            "[{}]",
            backend.name
        );

        let by_family = ResourceQuery::new("Patient").with_sort(SortDirective::parse("family"));
        assert_eq!(
            search_ids(&backend, by_family).await,
            ["p3", "p1", "p2"],
            "[{}]",
            backend.name
        );

        let bad = ResourceQuery::new("Patient").with_sort(SortDirective::parse("gender"));
        assert!(matches!(
            search_err(&backend, bad).await,
            StorageError::Validation(ValidationError::InvalidSort { .. })
        ));
    }
}

#[tokio::test]
async fn test_pagination() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let model = backend.model("Patient").await;

        let first = ResourceQuery::new("Patient").with_count(2);
        match model.get(&first).await.unwrap() {
            FetchResult::Collection {
                resources,
                total,
                pagination,
                ..
            } => {
                assert_eq!(total, 3, "[{}]", backend.name);
                assert_eq!(resources.len(), 2);
                assert_eq!(pagination, Pagination::new(2));
            }
            FetchResult::Single { .. } => panic!("expected collection"),
        }

        let second = ResourceQuery::new("Patient").with_count(2).with_offset(2);
        assert_eq!(search_ids(&backend, second).await, ["p3"], "[{}]", backend.name);

        let past_end = ResourceQuery::new("Patient").with_offset(10);
        assert!(search_ids(&backend, past_end).await.is_empty());
    }
}

#[tokio::test]
async fn test_paginate_directly() {
    let backend = TestBackend::memory();
    let model = backend.model("Patient").await;
    let matches: Vec<_> = (0..5)
        .map(|i| StoredResource::new("Patient", i.to_string(), json!({})))
        .collect();

    let page = model.paginate(matches, &Pagination::new(2).with_offset(1));
    assert_eq!(page.total, 5);
    let ids: Vec<_> = page.items.iter().map(|r| r.id()).collect();
    assert_eq!(ids, ["1", "2"]);
    assert_eq!(page.pagination.next_page(page.total).unwrap().offset, 3);
    assert_eq!(page.pagination.previous_page().unwrap().offset, 0);
}

#[tokio::test]
async fn test_query_count_is_not_capped_by_model() {
    let backend = TestBackend::memory();
    let model = backend.model("Patient").await;
    for i in 0..1200 {
        backend
            .create("Patient", json!({"id": format!("bulk-{}", i)}))
            .await;
    }

    let query = ResourceQuery::new("Patient").with_count(1500);
    match model.get(&query).await.unwrap() {
        FetchResult::Collection {
            resources,
            total,
            pagination,
            ..
        } => {
            assert_eq!(total, 1200);
            assert_eq!(resources.len(), 1200);
            assert_eq!(pagination.count, 1500);
        }
        FetchResult::Single { .. } => panic!("expected collection"),
    }
}

#[tokio::test]
async fn test_huge_offset_is_an_empty_page() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let query = ResourceQuery::new("Patient").with_offset(usize::MAX);
        assert!(search_ids(&backend, query).await.is_empty(), "[{}]", backend.name);
    }
}

// ============================================================================
// Include Tests
// ============================================================================

#[tokio::test]
async fn test_search_with_include() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let model = backend.model("Observation").await;
        let query =
            ResourceQuery::new("Observation").with_include(IncludeDirective::new("subject"));

        match model.get(&query).await.unwrap() {
            FetchResult::Collection {
                resources,
                included,
                ..
            } => {
                assert_eq!(resources.len(), 2, "[{}]", backend.name);
                assert_eq!(included.len(), 1, "[{}] includes are deduplicated", backend.name);
                assert_eq!(included[0].resource_type(), "Patient");
                assert_eq!(included[0].id(), Some("p1"));
            }
            FetchResult::Single { .. } => panic!("expected collection"),
        }
    }
}

#[tokio::test]
async fn test_read_with_include() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let model = backend.model("Observation").await;
        let query = ResourceQuery::by_id("Observation", "o2").with_include(IncludeDirective {
            source_type: Some("Observation".to_string()),
            relation: "subject".to_string(),
        });

        match model.get(&query).await.unwrap() {
            FetchResult::Single { resource, included } => {
                assert_eq!(resource.id(), Some("o2"));
                assert_eq!(included.len(), 1, "[{}]", backend.name);
            }
            FetchResult::Collection { .. } => panic!("expected single"),
        }
    }
}

#[tokio::test]
async fn test_include_for_other_type_is_ignored() {
    for backend in TestBackend::all() {
        seed(&backend).await;
        let model = backend.model("Patient").await;
        let query = ResourceQuery::new("Patient").with_include(IncludeDirective {
            source_type: Some("Observation".to_string()),
            relation: "subject".to_string(),
        });

        match model.get(&query).await.unwrap() {
            FetchResult::Collection { included, .. } => assert!(included.is_empty()),
            FetchResult::Single { .. } => panic!("expected collection"),
        }
    }
}

#[tokio::test]
async fn test_unknown_include_relation() {
    for backend in TestBackend::all() {
        let query = ResourceQuery::new("Patient").with_include(IncludeDirective::new("friends"));
        let err = search_err(&backend, query).await;
        assert!(
            matches!(
                err,
                StorageError::Validation(ValidationError::UnknownRelation { .. })
            ),
            "[{}]",
            backend.name
        );
    }
}
