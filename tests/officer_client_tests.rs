/// Officer directory client tests against a mocked registry.
use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use title_lookup_api::errors::AppError;
use title_lookup_api::officers::OfficerDirectoryClient;

async fn client(server: &MockServer) -> OfficerDirectoryClient {
    OfficerDirectoryClient::new(server.uri(), "test-key".to_string()).unwrap()
}

#[tokio::test]
async fn search_sends_basic_auth_with_empty_password() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/officers"))
        .and(basic_auth("test-key", ""))
        .and(query_param("q", "Jane Doe"))
        .and(query_param("items_per_page", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let officers = client(&server)
        .await
        .search_officers(" Jane Doe ", 50)
        .await
        .unwrap();
    assert!(officers.is_empty());
}

#[tokio::test]
async fn search_maps_upstream_statuses_to_domain_errors() {
    for (status, check) in [
        (401, AppError::UpstreamAuth(String::new())),
        (429, AppError::UpstreamRateLimited(String::new())),
        (400, AppError::UpstreamBadRequest(String::new())),
        (503, AppError::UpstreamUnavailable(String::new())),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/officers"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream detail"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .search_officers("Jane Doe", 50)
            .await
            .unwrap_err();

        let matched = matches!(
            (&err, &check),
            (AppError::UpstreamAuth(_), AppError::UpstreamAuth(_))
                | (AppError::UpstreamRateLimited(_), AppError::UpstreamRateLimited(_))
                | (AppError::UpstreamBadRequest(_), AppError::UpstreamBadRequest(_))
                | (AppError::UpstreamUnavailable(_), AppError::UpstreamUnavailable(_))
        );
        assert!(matched, "status {} mapped to {:?}", status, err);
    }
}

#[tokio::test]
async fn bad_request_error_carries_upstream_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/officers"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error":"q parameter required"}"#),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .search_officers("Jane Doe", 50)
        .await
        .unwrap_err();
    match err {
        AppError::UpstreamBadRequest(msg) => assert!(msg.contains("q parameter required")),
        other => panic!("expected UpstreamBadRequest, got {:?}", other),
    }
}

#[tokio::test]
async fn search_drops_corporate_officers_and_classifies_individuals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/officers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "title": "ACME SECRETARIAL SERVICES LTD",
                    "links": { "self": "/officers/corp/appointments" }
                },
                {
                    "title": "Jane DOE",
                    "date_of_birth": { "month": 6, "year": 1975 },
                    "appointment_count": 3,
                    "links": { "self": "/officers/abc/appointments" }
                },
                {
                    "title": "John ROE",
                    "description_identifiers": ["born-on"],
                    "links": { "self": "/officers/def/appointments" }
                },
                {
                    "title": "Richard MILES"
                }
            ]
        })))
        .mount(&server)
        .await;

    let officers = client(&server)
        .await
        .search_officers("doesn't matter", 50)
        .await
        .unwrap();

    assert_eq!(officers.len(), 3);
    assert!(officers.iter().all(|o| o.name != "ACME SECRETARIAL SERVICES LTD"));

    let jane = &officers[0];
    assert!(jane.is_individual, "date_of_birth implies individual");
    assert_eq!(jane.appointment_count, 3);
    assert_eq!(
        jane.appointments_link.as_deref(),
        Some("/officers/abc/appointments")
    );

    let john = &officers[1];
    assert!(john.is_individual, "born-on descriptor implies individual");

    let richard = &officers[2];
    assert!(!richard.is_individual);
    assert!(richard.appointments_link.is_none());
}

#[tokio::test]
async fn appointments_uses_link_verbatim_and_filters_blank_numbers() {
    let server = MockServer::start().await;
    // The search link already targets the appointments resource; the client
    // must not append another suffix.
    Mock::given(method("GET"))
        .and(path("/officers/abc/appointments"))
        .and(basic_auth("test-key", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "appointed_to": {
                        "company_number": "SC123456",
                        "company_name": "HIGHLAND HOMES",
                        "company_status": "active"
                    },
                    "officer_role": "director",
                    "appointed_on": "2012-03-01",
                    "resigned_on": "2018-11-30"
                },
                {
                    "appointed_to": { "company_number": "", "company_name": "NO NUMBER" },
                    "officer_role": "secretary"
                },
                {
                    "officer_role": "director"
                }
            ]
        })))
        .mount(&server)
        .await;

    let appointments = client(&server)
        .await
        .appointments("/officers/abc/appointments")
        .await;

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].company_number, "SC123456");
    assert_eq!(appointments[0].officer_role, "director");
    assert_eq!(appointments[0].resigned_on, "2018-11-30");
}

#[tokio::test]
async fn appointments_failures_are_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/officers/broken/appointments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let c = client(&server).await;
    assert!(c.appointments("/officers/broken/appointments").await.is_empty());
    // Unmocked path -> 404 -> still just empty.
    assert!(c.appointments("/officers/missing/appointments").await.is_empty());
    // Empty link is a no-op.
    assert!(c.appointments("").await.is_empty());
}
