//! Tests du client HTTP contre un serveur local minimal

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use rural_client::api::PropertyUpdate;
use rural_client::notify::ChannelConfig;
use rural_client::{AnalysisStatus, ApiClient, ApiError, AuthError, AuthToken, Dashboard};
use rural_csv::{PropertyRecord, PropertyType};

fn token() -> AuthToken {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(br#"{"exp":4102444800,"email":"maria@example.com"}"#);
    AuthToken::parse(&format!("{}.{}.sig", header, body)).unwrap()
}

/// Lit une requête HTTP complète puis envoie la réponse donnée
async fn respond(socket: &mut TcpStream, status: u16, body: &str) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }

    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.ok();

    String::from_utf8_lossy(&buf).to_string()
}

/// Répond une seule fois puis retourne la requête brute reçue
async fn serve_once(status: u16, body: impl Into<String>) -> (String, JoinHandle<String>) {
    let (base_url, handle) = serve_sequence(vec![(status, body.into())]).await;
    let handle = tokio::spawn(async move { handle.await.unwrap().remove(0) });
    (base_url, handle)
}

/// Répond aux connexions successives dans l'ordre donné
async fn serve_sequence(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/prod", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(respond(&mut socket, status, &body).await);
        }
        requests
    });

    (base_url, handle)
}

fn record() -> PropertyRecord {
    PropertyRecord {
        name: "Fazenda Santa Rita".into(),
        property_type: PropertyType::Fazenda,
        description: None,
        area: 152.3,
        perimeter: 5230.0,
        coordinates: vec![[-47.1, -22.1], [-47.1, -22.2], [-47.2, -22.2], [-47.2, -22.1]],
    }
}

#[tokio::test]
async fn test_list_properties_sends_bearer_token() {
    let (base_url, server) = serve_once(
        200,
        r#"{"properties":[{"id":"prop_1","name":"Sítio Alegre","type":"sitio","area":3.5,"perimeter":800,"coordinates":[],"analysisStatus":"completed"}],"count":1}"#,
    )
    .await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let properties = api.list_properties().await.unwrap();

    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].property_type, PropertyType::Sitio);
    assert_eq!(properties[0].analysis_status, AnalysisStatus::Completed);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /prod/properties HTTP/1.1"));
    assert!(request
        .to_ascii_lowercase()
        .contains(&format!("authorization: bearer {}", token().as_str().to_ascii_lowercase())));
}

#[tokio::test]
async fn test_import_properties() {
    let (base_url, server) = serve_once(200, r#"{"imported":1}"#).await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let imported = api.import_properties(&[record()]).await.unwrap();
    assert_eq!(imported, 1);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /prod/properties/import HTTP/1.1"));
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["properties"][0]["name"], "Fazenda Santa Rita");
    assert_eq!(json["properties"][0]["type"], "fazenda");
    assert!(json["properties"][0].get("description").is_none());
}

#[tokio::test]
async fn test_update_sends_partial_body() {
    let (base_url, server) = serve_once(
        200,
        r#"{"message":"ok","property":{"id":"prop_9","name":"Novo Nome"}}"#,
    )
    .await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let update = PropertyUpdate {
        name: Some("Novo Nome".into()),
        ..Default::default()
    };
    let property = api.update_property("prop_9", &update).await.unwrap();
    assert_eq!(property.name, "Novo Nome");

    let request = server.await.unwrap();
    assert!(request.starts_with("PUT /prod/properties/prop_9 HTTP/1.1"));
    assert!(request.ends_with(r#"{"name":"Novo Nome"}"#));
}

#[tokio::test]
async fn test_error_body_is_surfaced() {
    let (base_url, _server) = serve_once(400, r#"{"error":"Invalid coordinates"}"#).await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    match api.create_property(&record()).await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid coordinates");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_without_body_uses_status() {
    let (base_url, _server) = serve_once(500, "Internal Server Error").await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    match api.delete_property("prop_1").await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "HTTP 500");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let (base_url, _server) = serve_once(401, r#"{"message":"Unauthorized"}"#).await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let err = api.get_analysis("prop_1").await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(AuthError::Rejected(401))));
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let (base_url, _server) = serve_once(200, "not json").await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let err = api.list_properties().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_generate_report_decodes_pdf() {
    let pdf = STANDARD.encode(b"%PDF-1.4 fake");
    let body = format!(r#"{{"pdf":"{}","filename":"relatorio_2024.pdf"}}"#, pdf);
    let (base_url, server) = serve_once(200, body).await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let report = api
        .generate_report(&["prop_1".to_string(), "prop_2".to_string()])
        .await
        .unwrap();

    assert_eq!(report.filename, "relatorio_2024.pdf");
    assert_eq!(report.pdf, b"%PDF-1.4 fake");

    let request = server.await.unwrap();
    assert!(request.ends_with(r#"{"propertyIds":["prop_1","prop_2"]}"#));
}

#[tokio::test]
async fn test_import_succeeds_when_reload_fails() {
    let (base_url, server) = serve_sequence(vec![
        (200, r#"{"imported":1}"#.to_string()),
        (500, r#"{"error":"boom"}"#.to_string()),
    ])
    .await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let mut dashboard = Dashboard::new(api, ChannelConfig::default());
    dashboard.stage(rural_csv::ImportBatch {
        records: vec![record()],
        errors: Vec::new(),
    });

    let imported = dashboard.submit_import().await.unwrap();
    assert_eq!(imported, 1);
    assert!(dashboard.staged().is_none());
    assert!(dashboard.state().properties().is_empty());

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /prod/properties/import HTTP/1.1"));
    assert!(requests[1].starts_with("GET /prod/properties HTTP/1.1"));
}

#[tokio::test]
async fn test_rejected_import_stays_staged() {
    let (base_url, _server) = serve_once(400, r#"{"error":"Invalid coordinates"}"#).await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let mut dashboard = Dashboard::new(api, ChannelConfig::default());
    dashboard.stage(rural_csv::ImportBatch {
        records: vec![record()],
        errors: Vec::new(),
    });

    assert!(dashboard.submit_import().await.is_err());
    assert!(dashboard.staged().is_some());
}

#[tokio::test]
async fn test_create_then_delete_updates_local_list() {
    let (base_url, server) = serve_sequence(vec![
        (
            201,
            r#"{"message":"ok","property":{"id":"prop_7","name":"Fazenda Santa Rita","type":"fazenda","area":152.3,"perimeter":5230}}"#
                .to_string(),
        ),
        (200, r#"{"message":"deleted"}"#.to_string()),
    ])
    .await;

    let api = ApiClient::new(&base_url, token()).unwrap();
    let mut dashboard = Dashboard::new(api, ChannelConfig::default());

    let created = dashboard.create_property(&record()).await.unwrap();
    assert_eq!(created.id, "prop_7");
    assert_eq!(dashboard.state().properties().len(), 1);
    assert_eq!(dashboard.select_all(), vec!["prop_7".to_string()]);

    dashboard.delete_property("prop_7").await.unwrap();
    assert!(dashboard.state().find("prop_7").is_none());
    assert!(!dashboard.state().is_selected("prop_7"));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /prod/properties HTTP/1.1"));
    assert!(requests[1].starts_with("DELETE /prod/properties/prop_7 HTTP/1.1"));
}

