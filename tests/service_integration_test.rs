use httpmock::prelude::*;
use profile_intake::adapters::http::API_KEY_HEADER;
use profile_intake::app::ProfileSource;
use profile_intake::config::{AgentConfig, AppConfig, FetchConfig, NormalizerConfig, StoreConfig};
use profile_intake::domain::ports::ProfileStore;
use profile_intake::{build_service, CsvSheetStore, IntakeError, NormalizedProfile};
use serde_json::json;
use tempfile::TempDir;

fn app_config(server: &MockServer, store_path: &str, api_key: Option<&str>) -> AppConfig {
    AppConfig {
        agent: AgentConfig {
            api_base: server.base_url(),
            api_key: api_key.map(str::to_string),
            agent_id: Some("7".to_string()),
        },
        normalizer: NormalizerConfig {
            remote_prefix: format!("{}/", server.base_url()),
            current_year: Some(2026),
            ..NormalizerConfig::default()
        },
        fetch: FetchConfig {
            timeout_seconds: 5,
            retry_attempts: 0,
            retry_delay_ms: 10,
        },
        store: StoreConfig {
            path: store_path.to_string(),
        },
    }
}

fn store_path(dir: &TempDir) -> String {
    dir.path()
        .join("sheet")
        .join("profiles.csv")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_list_prefers_sheet_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    let agent_mock = server.mock(|when, then| {
        when.method(GET).path("/agents/fetch-output");
        then.status(200).json_body(json!({"output": [{"username": "never"}]}));
    });

    let stored = NormalizedProfile {
        id: "ig_pb_0".to_string(),
        username: "@stored".to_string(),
        ..NormalizedProfile::default()
    };
    CsvSheetStore::new(&path)
        .replace_profiles(&[stored])
        .await
        .unwrap();

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let response = service.list_profiles().await;

    assert_eq!(response.source, ProfileSource::SheetStore);
    assert_eq!(response.total, 1);
    assert_eq!(response.profiles[0].username, "@stored");
    agent_mock.assert_hits(0);
}

#[tokio::test]
async fn test_list_falls_back_to_agent_and_writes_back() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    let agent_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/agents/fetch-output")
            .query_param("id", "7")
            .header(API_KEY_HEADER, "key");
        then.status(200).json_body(json!({
            "status": "finished",
            "output": [
                {"username": "alice_j", "bio": "29 lawyer toronto"},
                {"bio": "no handle here, sorry"}
            ]
        }));
    });

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let response = service.list_profiles().await;

    agent_mock.assert();
    assert_eq!(response.source, ProfileSource::Agent);
    assert_eq!(response.total, 1);
    assert_eq!(response.profiles[0].age, Some(29));

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["source"], "phantombuster");
    assert!(body.get("message").is_none());

    let saved = CsvSheetStore::new(&path).load_profiles().await.unwrap();
    assert_eq!(saved, response.profiles);
}

#[tokio::test]
async fn test_list_without_credentials_is_empty_with_message() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();

    let service = build_service(&app_config(&server, &path, None)).unwrap();
    let response = service.list_profiles().await;

    assert!(response.profiles.is_empty());
    assert_eq!(response.total, 0);
    assert_eq!(response.source, ProfileSource::Unknown);
    assert!(response.message.is_some());
}

#[tokio::test]
async fn test_list_survives_agent_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch-output");
        then.status(500);
    });

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let response = service.list_profiles().await;

    assert!(response.profiles.is_empty());
    assert!(response.message.is_some());
}

#[tokio::test]
async fn test_refresh_uses_agent_folders() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch").query_param("id", "7");
        then.status(200).json_body(json!({
            "name": "Follower Collector",
            "orgS3Folder": "org1",
            "s3Folder": "abc"
        }));
    });
    let csv_mock = server.mock(|when, then| {
        when.method(GET).path("/org1/abc/result.csv");
        then.status(200)
            .body("username,fullName,bio\nkim,Kim K,\"doctor, 41\"\n,No Body,\"hi, there\"\nlee,Lee,\n");
    });

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let report = service.refresh_profiles().await.unwrap();

    csv_mock.assert();
    assert_eq!(report.result_url, server.url("/org1/abc/result.csv"));
    assert_eq!(report.rows_parsed, 3);
    assert_eq!(report.profiles_saved, 2);
    assert_eq!(report.dropped, 1);

    let saved = CsvSheetStore::new(&path).load_profiles().await.unwrap();
    let names: Vec<&str> = saved.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(names, vec!["@kim", "@lee"]);
    assert_eq!(saved[0].profession.as_deref(), Some("Doctor"));
}

#[tokio::test]
async fn test_refresh_finds_url_in_output_when_metadata_lacks_folders() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch");
        then.status(200).json_body(json!({"name": "Follower Collector"}));
    });
    let csv_url = server.url("/org1/xyz/result.csv");
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch-output");
        then.status(200)
            .json_body(json!({"output": format!("Results: {}", csv_url)}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/org1/xyz/result.csv");
        then.status(200).body("username\nmo\n");
    });

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let report = service.refresh_profiles().await.unwrap();

    assert_eq!(report.result_url, csv_url);
    assert_eq!(report.profiles_saved, 1);
}

#[tokio::test]
async fn test_refresh_without_result_url_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch");
        then.status(200).json_body(json!({}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch-output");
        then.status(200).json_body(json!({"output": "Agent has not run yet"}));
    });

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let err = service.refresh_profiles().await.unwrap_err();

    assert!(matches!(err, IntakeError::NoResultUrl { .. }));
}

#[tokio::test]
async fn test_refresh_rejects_empty_result_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/agents/fetch");
        then.status(200)
            .json_body(json!({"orgS3Folder": "org1", "s3Folder": "abc"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/org1/abc/result.csv");
        then.status(200).body("username,bio\n");
    });

    let service = build_service(&app_config(&server, &path, Some("key"))).unwrap();
    let err = service.refresh_profiles().await.unwrap_err();

    assert!(matches!(err, IntakeError::InvalidResultFile { .. }));
    assert!(!std::path::Path::new(&path).exists());
}

#[tokio::test]
async fn test_refresh_without_credentials_is_source_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let path = store_path(&temp_dir);
    let server = MockServer::start();

    let service = build_service(&app_config(&server, &path, None)).unwrap();
    let err = service.refresh_profiles().await.unwrap_err();

    assert!(err.is_source_unavailable());
}
