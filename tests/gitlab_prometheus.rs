//! Integration tests for `gitlab_service_prometheus` against a mocked GitLab.
//!
//! Each test drives the provider the way a host would and checks the exact
//! HTTP traffic it produces.

use hemmer_provider_gitlab::testing::{
    assert_plan_changes_attribute, assert_plan_no_changes, assert_plan_replaces,
    assert_plan_updates_in_place, ProviderTester,
};
use hemmer_provider_gitlab::{GitlabProvider, ProviderError, ProviderService};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCE: &str = "gitlab_service_prometheus";
const TOKEN: &str = "test-token";
const SERVICE_PATH: &str = "/api/v4/projects/42/services/prometheus";

fn service_body(api_url: &str) -> Value {
    json!({
        "id": 101,
        "title": "Prometheus",
        "slug": "prometheus",
        "created_at": "2024-03-01T10:15:30.000Z",
        "updated_at": "2024-03-02T08:00:00.000Z",
        "active": true,
        "properties": {
            "api_url": api_url,
            "google_iap_audience_client_id": null
        }
    })
}

/// What GitLab answers for an integration after `DELETE`: the record stays,
/// disabled and with its properties cleared.
fn disabled_body() -> Value {
    json!({"id": 101, "title": "Prometheus", "active": false, "properties": {}})
}

fn is_remote_not_found(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Remote(api) if api.is_not_found())
}

fn resource_config(api_url: &str) -> Value {
    json!({"project": "42", "api_url": api_url})
}

async fn configured(server: &MockServer) -> ProviderTester<GitlabProvider> {
    let tester = ProviderTester::new(GitlabProvider::new());
    tester
        .configure(json!({"token": TOKEN, "base_url": server.uri()}))
        .await
        .expect("configure should succeed");
    tester
}

async fn mount_get(server: &MockServer, api_url: &str) {
    Mock::given(method("GET"))
        .and(path(SERVICE_PATH))
        .and(header("PRIVATE-TOKEN", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_body(api_url)))
        .mount(server)
        .await;
}

mod create {
    use super::*;

    #[tokio::test]
    async fn test_create_sends_all_fields_and_reads_back() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .and(header("PRIVATE-TOKEN", TOKEN))
            .and(body_json(json!({
                "api_url": "https://prom.example/api",
                "google_iap_audience_client_id": "",
                "google_iap_service_account_json": ""
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_get(&server, "https://prom.example/api").await;

        let tester = configured(&server).await;
        let state = tester
            .lifecycle_create(RESOURCE, resource_config("https://prom.example/api"))
            .await
            .expect("create should succeed");

        assert_eq!(state["id"], "101");
        assert_eq!(state["project"], "42");
        assert_eq!(state["api_url"], "https://prom.example/api");
        assert_eq!(state["title"], "Prometheus");
        assert_eq!(state["active"], true);
        assert_eq!(state["created_at"], "2024-03-01T10:15:30Z");
        assert_eq!(state["updated_at"], "2024-03-02T08:00:00Z");
    }

    #[tokio::test]
    async fn test_create_sends_iap_settings() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .and(body_json(json!({
                "api_url": "https://prom.example/api",
                "google_iap_audience_client_id": "audience.apps.googleusercontent.com",
                "google_iap_service_account_json": "{\"type\":\"service_account\"}"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_get(&server, "https://prom.example/api").await;

        let tester = configured(&server).await;
        let state = tester
            .create(
                RESOURCE,
                json!({
                    "project": "42",
                    "api_url": "https://prom.example/api",
                    "google_iap_audience_client_id": "audience.apps.googleusercontent.com",
                    "google_iap_service_account_json": "{\"type\":\"service_account\"}"
                }),
            )
            .await
            .expect("create should succeed");

        // GitLab does not echo the key back; the configured value is kept.
        assert_eq!(
            state["google_iap_service_account_json"],
            "{\"type\":\"service_account\"}"
        );
    }

    #[tokio::test]
    async fn test_create_namespaced_project() {
        let server = MockServer::start().await;
        let encoded = "/api/v4/projects/group%2Fproject/services/prometheus";

        Mock::given(method("PUT"))
            .and(path(encoded))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(encoded))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let state = tester
            .create(
                RESOURCE,
                json!({"project": "group/project", "api_url": "https://prom.example/api"}),
            )
            .await
            .expect("create should succeed");

        assert_eq!(state["id"], "101");
        assert_eq!(state["project"], "group/project");
    }

    #[tokio::test]
    async fn test_create_accepts_bare_true_answer() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;
        mount_get(&server, "https://prom.example/api").await;

        let tester = configured(&server).await;
        let state = tester
            .create(RESOURCE, resource_config("https://prom.example/api"))
            .await
            .expect("create should succeed");

        assert_eq!(state["id"], "101");
        assert_eq!(state["active"], true);
    }

    #[tokio::test]
    async fn test_create_propagates_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"message": "500 Internal Server Error"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let err = tester
            .create(RESOURCE, resource_config("https://prom.example/api"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Remote(_)));
        assert!(err.to_string().contains("500"), "{err}");
    }

    #[tokio::test]
    async fn test_create_fails_when_read_back_is_missing() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "404 Service Not Found"})),
            )
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let err = tester
            .create(RESOURCE, resource_config("https://prom.example/api"))
            .await
            .unwrap_err();
        assert!(is_remote_not_found(&err), "{err}");
    }
}

mod read {
    use super::*;

    fn existing_state() -> Value {
        json!({
            "id": "101",
            "project": "42",
            "api_url": "https://old.example/api",
            "google_iap_audience_client_id": "",
            "google_iap_service_account_json": ""
        })
    }

    #[tokio::test]
    async fn test_read_refreshes_drifted_values() {
        let server = MockServer::start().await;
        mount_get(&server, "https://drifted.example/api").await;

        let tester = configured(&server).await;
        let state = tester.read(RESOURCE, existing_state()).await.unwrap();

        assert_eq!(state["api_url"], "https://drifted.example/api");
        assert_eq!(state["id"], "101");
    }

    #[tokio::test]
    async fn test_read_missing_service_returns_null() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "404 Service Not Found"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let state = tester.read(RESOURCE, existing_state()).await.unwrap();
        assert_eq!(state, Value::Null);
    }

    #[tokio::test]
    async fn test_read_disabled_service_returns_null() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(disabled_body()))
            .expect(1)
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let state = tester.read(RESOURCE, existing_state()).await.unwrap();
        assert_eq!(state, Value::Null);
    }

    #[tokio::test]
    async fn test_read_propagates_other_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "403 Forbidden"})),
            )
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let err = tester.read(RESOURCE, existing_state()).await.unwrap_err();
        assert!(!is_remote_not_found(&err));
        assert!(err.to_string().contains("403 Forbidden"), "{err}");
    }
}

mod update_delete {
    use super::*;

    #[tokio::test]
    async fn test_update_resends_every_field() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .and(body_json(json!({
                "api_url": "https://prom.example/api",
                "google_iap_audience_client_id": "audience-2",
                "google_iap_service_account_json": ""
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_get(&server, "https://prom.example/api").await;

        let tester = configured(&server).await;
        let prior = json!({
            "id": "101",
            "project": "42",
            "api_url": "https://prom.example/api",
            "title": "Prometheus",
            "active": true
        });
        let config = json!({
            "project": "42",
            "api_url": "https://prom.example/api",
            "google_iap_audience_client_id": "audience-2"
        });

        let plan = tester.plan_update(RESOURCE, prior.clone(), config).await.unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "google_iap_audience_client_id");

        let state = tester.update(RESOURCE, prior, plan.planned_state).await.unwrap();
        assert_eq!(state["id"], "101");
        assert_eq!(state["google_iap_audience_client_id"], "audience-2");
    }

    #[tokio::test]
    async fn test_delete_then_read_is_absent() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(SERVICE_PATH))
            .and(header("PRIVATE-TOKEN", TOKEN))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(disabled_body()))
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let state = json!({"id": "101", "project": "42", "api_url": "https://prom.example/api"});

        tester.delete(RESOURCE, state.clone()).await.unwrap();
        assert_eq!(tester.read(RESOURCE, state).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_delete_propagates_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let err = tester
            .delete(RESOURCE, json!({"id": "101", "project": "42"}))
            .await
            .unwrap_err();
        assert!(is_remote_not_found(&err), "{err}");
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_crud() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .expect(2)
            .mount(&server)
            .await;
        mount_get(&server, "https://prom.example/api").await;
        Mock::given(method("DELETE"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let updated = tester
            .lifecycle_crud(
                RESOURCE,
                resource_config("https://prom.example/api"),
                json!({
                    "project": "42",
                    "api_url": "https://prom.example/api",
                    "google_iap_audience_client_id": "audience"
                }),
            )
            .await
            .expect("lifecycle should succeed");

        assert_eq!(updated["id"], "101");
        assert_eq!(updated["google_iap_audience_client_id"], "audience");
    }

    #[tokio::test]
    async fn test_plan_after_create_is_stable() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(SERVICE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(service_body("https://prom.example/api")),
            )
            .mount(&server)
            .await;
        mount_get(&server, "https://prom.example/api").await;

        let tester = configured(&server).await;
        let config = resource_config("https://prom.example/api");
        let state = tester.lifecycle_create(RESOURCE, config.clone()).await.unwrap();

        let plan = tester.plan_update(RESOURCE, state.clone(), config).await.unwrap();
        assert_plan_no_changes(&plan);

        let plan = tester
            .plan_update(RESOURCE, state, resource_config("https://other.example/api"))
            .await
            .unwrap();
        assert_plan_replaces(&plan);
        assert_plan_changes_attribute(&plan, "api_url");
    }

    #[tokio::test]
    async fn test_import_by_project() {
        let server = MockServer::start().await;
        mount_get(&server, "https://prom.example/api").await;

        let tester = configured(&server).await;
        let imported = tester.import_resource(RESOURCE, "42").await.unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, RESOURCE);
        assert_eq!(imported[0].state["id"], "101");
        assert_eq!(imported[0].state["project"], "42");
        assert_eq!(imported[0].state["api_url"], "https://prom.example/api");
    }

    #[tokio::test]
    async fn test_import_missing_service() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let err = tester.import_resource(RESOURCE, "42").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_import_disabled_service() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(disabled_body()))
            .mount(&server)
            .await;

        let tester = configured(&server).await;
        let err = tester.import_resource(RESOURCE, "42").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_operations_require_configuration() {
        let provider = GitlabProvider::new();
        let err = provider
            .create(RESOURCE, resource_config("https://prom.example/api"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
