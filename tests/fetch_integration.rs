use httpmock::{Method::GET, MockServer};
use reset_monitor::config::{Config, NotifyMethod};
use reset_monitor::http::{self, FetchError};

fn test_config(api_url: String) -> Config {
    Config {
        api_url,
        method: NotifyMethod::Webhook,
        smtp_host: "smtp.gmail.com".into(),
        smtp_port: 587,
        smtp_user: None,
        smtp_password: None,
        recipient_email: None,
        webhook_url: None,
        sleep_buffer_secs: 5,
        max_retry_delay_secs: 300,
        timeout_secs: 10,
        user_agent: "reset-monitor-tests".into(),
    }
}

#[tokio::test]
async fn fetch_status_returns_payload_on_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/status");
            then.status(200).json_body(serde_json::json!({
                "five_hour": {"resets_at": "2025-06-01T17:00:00+00:00", "utilization": 80}
            }));
        })
        .await;

    let cfg = test_config(server.url("/status"));
    let client = http::build_client(&cfg).unwrap();
    let payload = http::fetch_status(&client, &cfg).await.unwrap();

    mock.assert_async().await;
    assert!(payload.get("five_hour").is_some());
}

#[tokio::test]
async fn fetch_status_maps_server_error_to_status() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/status");
            then.status(500).body("boom");
        })
        .await;

    let cfg = test_config(server.url("/status"));
    let client = http::build_client(&cfg).unwrap();
    let err = http::fetch_status(&client, &cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 500));
}

#[tokio::test]
async fn fetch_status_rejects_malformed_body() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/status");
            then.status(200).body("definitely not json");
        })
        .await;

    let cfg = test_config(server.url("/status"));
    let client = http::build_client(&cfg).unwrap();
    let err = http::fetch_status(&client, &cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn fetch_status_maps_connection_refused_to_transport() {
    // nothing listens on this port
    let cfg = test_config("http://127.0.0.1:9/status".into());
    let client = http::build_client(&cfg).unwrap();
    let err = http::fetch_status(&client, &cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}
