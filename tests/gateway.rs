use httpmock::prelude::*;
use pulse_dashboard::gateway::{Gateway, GatewayError, GatewayRequest};
use serde_json::json;
use std::time::Duration;

fn gateway() -> Gateway {
    Gateway::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn success_returns_parsed_json() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/geo").query_param("q", "Oslo");
            then.status(200)
                .json_body(json!([{"name": "Oslo", "lat": 59.9, "lon": 10.7}]));
        })
        .await;

    let request = GatewayRequest::get(&server.url("/geo"))
        .unwrap()
        .param("q", "Oslo");
    let value = gateway().fetch(&request).await.unwrap();

    assert_eq!(value[0]["name"], "Oslo");
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/onecall");
            then.status(500).json_body(json!({"message": "upstream exploded"}));
        })
        .await;

    let request = GatewayRequest::get(&server.url("/onecall")).unwrap();
    let err = gateway().fetch(&request).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::HttpStatus {
            status: 500,
            status_text: "Internal Server Error".into(),
            message: Some("upstream exploded".into()),
        }
    );
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/query");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let request = GatewayRequest::get(&server.url("/query")).unwrap();
    let err = gateway().fetch(&request).await.unwrap_err();

    assert_eq!(err, GatewayError::decode("parse error"));
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let request = GatewayRequest::get(&format!("http://127.0.0.1:{port}/geo")).unwrap();
    let err = gateway().fetch(&request).await.unwrap_err();

    assert_eq!(err, GatewayError::Network);
    assert_eq!(err.status_code(), None);
}
