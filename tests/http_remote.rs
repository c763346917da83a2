use holdings_sync::error::RemoteError;
use holdings_sync::{HoldingRecord, HttpRemoteSource, RemoteSource};
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> HttpRemoteSource {
    let url = Url::parse(&format!("{}/", server.uri())).unwrap();
    HttpRemoteSource::new(url, Duration::from_millis(500))
}

#[tokio::test]
async fn decodes_and_normalizes_holdings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "userHolding": [
                    {"symbol": "TCS", "quantity": 10, "avgPrice": 2000.0, "ltp": 2200.0, "close": 2100.0},
                    {"symbol": "INFY", "quantity": 5, "ltp": 1600.0},
                    {"quantity": 99},
                    {"symbol": "TCS", "quantity": 12, "avgPrice": 2000.0, "ltp": 2200.0, "close": 2100.0, "extra": true}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let holdings = source(&server).fetch_holdings().await.unwrap().unwrap();

    assert_eq!(
        holdings,
        vec![
            HoldingRecord::new("TCS", 12, 2000.0, 2200.0, 2100.0),
            HoldingRecord::new("INFY", 5, 0.0, 1600.0, 0.0),
        ]
    );
}

#[tokio::test]
async fn missing_data_is_no_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;

    assert!(source(&server).fetch_holdings().await.unwrap().is_none());
}

#[tokio::test]
async fn empty_body_is_no_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(source(&server).fetch_holdings().await.unwrap().is_none());
}

#[tokio::test]
async fn blank_or_garbled_body_is_no_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string(" \n\t"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    for route in ["blank", "garbled"] {
        let url = Url::parse(&format!("{}/{}", server.uri(), route)).unwrap();
        let remote = HttpRemoteSource::new(url, Duration::from_millis(500));
        assert!(remote.fetch_holdings().await.unwrap().is_none(), "{}", route);
    }
}

#[tokio::test]
async fn server_error_is_status_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = source(&server).fetch_holdings().await.unwrap_err();
    assert!(matches!(err, RemoteError::Status(502)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"userHolding": []}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = source(&server).fetch_holdings().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(ref e) if e.is_timeout()));
}
