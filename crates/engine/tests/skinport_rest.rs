use std::time::Duration;

use common::{Error, PriceProvider, Window};
use engine::SkinportClient;
use strategy::ProviderConfig;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDLINE: &str = "AK-47 | Redline (Field-Tested)";

fn client(server: &MockServer) -> SkinportClient {
    SkinportClient::new("id", "secret", &ProviderConfig::default())
        .unwrap()
        .with_base_url(server.uri())
}

fn items_body() -> serde_json::Value {
    serde_json::json!([
        { "market_hash_name": REDLINE, "currency": "EUR", "min_price": 7.5, "quantity": 42 },
        { "market_hash_name": "Sticker | Unlisted", "currency": "EUR", "min_price": null, "quantity": 0 }
    ])
}

#[tokio::test]
async fn current_price_uses_basic_auth_and_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("app_id", "730"))
        .and(query_param("currency", "EUR"))
        .and(header("authorization", "Basic aWQ6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_body()))
        .mount(&server)
        .await;

    let sample = client(&server).current_price(REDLINE).await.unwrap();
    assert_eq!(sample.price, 7.5);
    assert_eq!(sample.volume, 42);
}

#[tokio::test]
async fn missing_and_unlisted_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_body()))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(client.current_price("Nope").await, Err(Error::UnknownItem(_))));
    assert!(matches!(
        client.current_price("Sticker | Unlisted").await,
        Err(Error::InvalidInput(_))
    ));

    let listings = client.list_items().await.unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[1].min_price, None);
}

#[tokio::test]
async fn sales_history_maps_window_summaries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sales/history"))
        .and(query_param("market_hash_name", REDLINE))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "market_hash_name": REDLINE,
            "currency": "EUR",
            "last_24_hours": { "min": 8.1, "max": 9.9, "avg": 9.1, "median": 9.0, "volume": 42 },
            "last_7_days":   { "min": 7.9, "max": 9.9, "avg": 9.05, "median": 9.0, "volume": 300 },
            "last_30_days":  { "min": null, "max": null, "avg": null, "median": null, "volume": 0 },
            "last_90_days":  { "min": 7.0, "max": 12.0, "avg": 9.5, "median": 9.4, "volume": 3000 }
        }])))
        .mount(&server)
        .await;

    let history = client(&server).sales_history(REDLINE, Window::Days30).await.unwrap();
    assert!(history.sales.is_empty());
    assert_eq!(history.summaries.len(), 3);

    let h24 = history.summary(Window::Hours24).unwrap();
    assert_eq!(h24.volume, 42);
    assert_eq!(h24.mean, Some(9.1));

    let d30 = history.summary(Window::Days30).unwrap();
    assert_eq!(d30.median, None);
    assert_eq!(d30.volume, 0);
}

#[tokio::test]
async fn too_many_requests_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .mount(&server)
        .await;

    let err = client(&server).list_items().await.unwrap_err();
    match err {
        Error::RateLimited { retry_after } => assert_eq!(retry_after, Some(Duration::from_secs(120))),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn status_codes_map_to_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sales/history"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(client.list_items().await, Err(Error::Auth(_))));
    assert!(matches!(
        client.sales_history(REDLINE, Window::Days7).await,
        Err(Error::Http(_))
    ));
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server).list_items().await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}
