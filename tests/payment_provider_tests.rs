/// Checkout provider client tests against a mocked payment API.
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use title_lookup_api::models::SearchMode;
use title_lookup_api::payments::{CheckoutProvider, PaymentVerifier};

#[tokio::test]
async fn create_session_sends_price_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("unit_amount%5D=300"))
        .and(body_string_contains("metadata%5Bsearch_type%5D=director"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "url": "https://checkout.example/session/cs_test_123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CheckoutProvider::with_base(server.uri(), "sk_test".to_string()).unwrap();
    let session = provider
        .create_session(SearchMode::Director, "Jane Doe", "http://localhost:3000")
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_123");
    assert!(session.url.contains("cs_test_123"));
}

#[tokio::test]
async fn retrieve_session_reads_payment_status_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "payment_status": "paid",
            "metadata": {
                "search_type": "number",
                "search_value": "OC123456"
            }
        })))
        .mount(&server)
        .await;

    let provider = CheckoutProvider::with_base(server.uri(), "sk_test".to_string()).unwrap();
    let session = provider.retrieve_session("cs_test_123").await.unwrap();

    assert!(session.paid);
    assert_eq!(session.search_type, "number");
    assert_eq!(session.search_value, "OC123456");

    // Unpaid sessions must not count as entitlements.
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_unpaid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_unpaid",
            "payment_status": "unpaid"
        })))
        .mount(&server)
        .await;
    let unpaid = provider.retrieve_session("cs_unpaid").await.unwrap();
    assert!(!unpaid.paid);
}

#[tokio::test]
async fn retrieve_unknown_session_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = CheckoutProvider::with_base(server.uri(), "sk_test".to_string()).unwrap();
    assert!(provider.retrieve_session("cs_missing").await.is_err());
}
