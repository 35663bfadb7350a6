use std::time::Duration;
use termgate_vsac_client::{Error, ValueSetQuery, VsacClient, VsacEndpoints};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> VsacClient {
    VsacClient::with_endpoints(
        VsacEndpoints {
            ticket_base_url: server.uri(),
            service_url: "http://umlsks.nlm.nih.gov".to_string(),
            base_url: format!("{}/vsac", server.uri()),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn grant_is_extracted_from_created_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cas/v1/api-key"))
        .and(body_string_contains("apikey=secret-key"))
        .respond_with(ResponseTemplate::new(201).set_body_string(
            r#"<html><form action="https://utslogin.nlm.nih.gov/cas/v1/api-key/TGT-42-abc-cas" method="POST"></form></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let grant = client_for(&server).request_grant("secret-key").await.unwrap();
    assert_eq!(grant, "TGT-42-abc-cas");
}

#[tokio::test]
async fn rejected_grant_yields_no_ticket() {
    for status in [400, 401, 404] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cas/v1/tickets/TGT-stale"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let ticket = client_for(&server)
            .request_service_ticket("TGT-stale")
            .await
            .unwrap();
        assert_eq!(ticket, None, "status {status}");
    }
}

#[tokio::test]
async fn ticket_server_fault_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cas/v1/tickets/TGT-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .request_service_ticket("TGT-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status { status: 500, .. }), "got {err:?}");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn issued_ticket_is_returned_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cas/v1/tickets/TGT-1"))
        .and(body_string_contains("service=http%3A%2F%2Fumlsks.nlm.nih.gov"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ST-9-xyz-cas\n"))
        .mount(&server)
        .await;

    let ticket = client_for(&server).request_service_ticket("TGT-1").await.unwrap();
    assert_eq!(ticket.as_deref(), Some("ST-9-xyz-cas"));
}

#[tokio::test]
async fn code_lookup_error_body_with_client_status_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vsac/CodeSystem/LOINC/Version/2.72/Code/0000-0/Info"))
        .and(query_param("ticket", "ST-1"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"status": "error", "errors": {"resultSet": [{"errCode": "802", "errDesc": "Code not found"}]}}"#,
        ))
        .mount(&server)
        .await;

    let info = client_for(&server)
        .code_info("/CodeSystem/LOINC/Version/2.72/Code/0000-0/Info", "ST-1")
        .await
        .unwrap();

    assert_eq!(info.status, "error");
    let errors = info.errors.unwrap().result_set;
    assert_eq!(errors[0].err_code, "802");
    assert_eq!(errors[0].err_desc, "Code not found");
}

#[tokio::test]
async fn code_lookup_without_json_body_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vsac/CodeSystem/LOINC/Version/2.72/Code/1/Info"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .code_info("/CodeSystem/LOINC/Version/2.72/Code/1/Info", "ST-1")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn missing_value_set_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vsac/svs/RetrieveMultipleValueSets"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let query = ValueSetQuery {
        oid: "1.2.3".to_string(),
        ..Default::default()
    };
    let err = client_for(&server)
        .retrieve_value_set(&query, "ST-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValueSetNotFound(ref oid) if oid == "1.2.3"));
}
