//! Integration tests for the HTTP backend client against a mock server.

use futures::StreamExt;
use quantai_client::{ApiError, BackendClient, BackendPort, BackendSettings, Timeframe};
use reqwest::Url;
use serde_json::json;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> BackendClient {
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    BackendClient::new(BackendSettings::new(base)).unwrap()
}

#[tokio::test]
async fn quick_stats_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/quick-stats/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ticker": "AAPL",
            "name": "Apple Inc.",
            "price": 189.5,
            "changePercent": -1.25,
            "market_cap": 2.9e12,
            "metrics": {"pe_ratio": 29.1, "beta": 1.2},
            "chartData": [{"date": "01/02", "close": 185.0}, {"date": "01/03", "close": 189.5}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stats = client(&server).await.quick_stats("AAPL").await.unwrap();
    assert_eq!(stats.name, "Apple Inc.");
    assert_eq!(stats.chart_data.len(), 2);
    assert!(stats.metrics.contains_key("pe_ratio"));
}

#[tokio::test]
async fn chart_sends_period_and_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chart/TSLA"))
        .and(query_param("period", "5d"))
        .and(query_param("interval", "30m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"time": 1_700_000_000, "close": 240.1},
            {"time": 1_700_000_900, "close": 241.0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let candles = client(&server)
        .await
        .chart("TSLA", Timeframe::OneWeek)
        .await
        .unwrap();
    assert_eq!(candles.len(), 2);
}

#[tokio::test]
async fn search_passes_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "tes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"symbol": "TSLA", "name": "Tesla, Inc.", "exchange": "NMS"},
            {"symbol": "TSCO", "name": "Tesco"}
        ])))
        .mount(&server)
        .await;

    let hits = client(&server).await.search("tes").await.unwrap();
    assert_eq!(hits[0].symbol, "TSLA");
    assert_eq!(hits[1].exchange, "N/A");
}

#[tokio::test]
async fn user_profile_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user-profile"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isPro": true,
            "autoAnalysis": null,
            "analysisCount": 4
        })))
        .mount(&server)
        .await;

    let profile = client(&server).await.user_profile("tok-1").await.unwrap();
    assert!(profile.is_pro);
    assert!(!profile.auto_analysis);
    assert_eq!(profile.analysis_count, 4);
}

#[test_case(401 ; "unauthorized")]
#[test_case(403 ; "forbidden")]
#[tokio::test]
async fn analysis_auth_failures_are_access_denied(status: u16) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/NVDA"))
        .respond_with(ResponseTemplate::new(status).set_body_string("{\"detail\":\"Upgrade required\"}"))
        .mount(&server)
        .await;

    let err = match client(&server).await.open_analysis("NVDA", "tok").await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert!(err.is_access_denied());
    assert_eq!(err, ApiError::AccessDenied { status });
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/quick-stats/ZZZZ"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client(&server).await.quick_stats("ZZZZ").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 500,
            body: "upstream down".into(),
        }
    );
    assert!(!err.is_access_denied());
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).await.search("x").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn analysis_body_is_streamed() {
    let body = concat!(
        "data: {\"type\":\"status\",\"message\":\"Bull agent thinking...\"}\n\n",
        "data: {\"type\":\"error\",\"message\":\"Rate limited\"}\n\n",
    );
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/AAPL"))
        .and(header("authorization", "Bearer tok"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut chunks = client(&server).await.open_analysis("AAPL", "tok").await.unwrap();
    let mut received = Vec::new();
    while let Some(chunk) = chunks.next().await {
        received.extend(chunk.unwrap());
    }
    assert_eq!(received, body.as_bytes());
}

#[tokio::test]
async fn set_user_pro_patches_flag() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/admin/users/user-42"))
        .and(header("authorization", "Bearer admin-tok"))
        .and(body_json(json!({"isPro": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .set_user_pro("admin-tok", "user-42", true)
        .await
        .unwrap();
}

#[tokio::test]
async fn admin_users_decodes_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"uid": "a", "email": "a@x.io", "displayName": "Ada", "isPro": true,
             "createdAt": "2024-05-01T10:00:00Z", "analysisCount": 12},
            {"uid": "b", "email": null, "isPro": null}
        ])))
        .mount(&server)
        .await;

    let users = client(&server).await.admin_users("tok").await.unwrap();
    assert_eq!(users[0].label(), "Ada");
    assert_eq!(users[1].label(), "b");
    assert!(!users[1].is_pro);
}
