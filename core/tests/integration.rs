//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background thread with its
//! own tokio runtime, then drives the blocking `KuraiClient` over real HTTP.
//! This checks that the encodings the builder picks are the ones the server
//! accepts, and that real error responses are classified as expected.

use std::time::Duration;

use kurai_core::{
    AnalyticsPeriod, Attachment, ClientConfig, DocumentQuery, EmailReply, ErrorKind,
    FinishQueueItem, GridQuery, HttpMethod, ItemStatus, KuraiClient, NextItemQuery,
    OutgoingEmail, Priority, QueueItemUpdate,
};
use serde_json::json;

/// Start a fresh mock server and return its base URL.
fn spawn_mock_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/")
}

fn client(base_url: &str) -> KuraiClient {
    let config = ClientConfig::new(base_url, mock_server::MOCK_API_KEY)
        .unwrap()
        .with_timeout(Duration::from_secs(5));
    KuraiClient::new(config).unwrap()
}

#[test]
fn list_areas_is_idempotent() {
    let client = client(&spawn_mock_server());

    let first = client.list_areas().unwrap();
    let second = client.list_areas().unwrap();
    assert_eq!(first, second);
    assert_eq!(first["areas"][0]["nombre"], "Facturas");
}

#[test]
fn health_check_reports_bad_key() {
    let base_url = spawn_mock_server();
    assert!(client(&base_url).health_check().is_ok());

    let wrong = KuraiClient::new(ClientConfig::new(&base_url, "lx-wrong").unwrap()).unwrap();
    let report = wrong.health_check();
    assert!(!report.api_accessible);
    assert_eq!(
        report.error.as_deref(),
        Some("Kurai Error [401]: Invalid API key")
    );
}

#[test]
fn wrong_key_is_an_authentication_error() {
    let base_url = spawn_mock_server();
    let wrong = KuraiClient::new(ClientConfig::new(&base_url, "lx-wrong").unwrap()).unwrap();

    let err = wrong.list_areas().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status_code(), Some(401));
}

#[test]
fn document_lifecycle() {
    let client = client(&spawn_mock_server());

    // Step 1: upload from disk.
    let path = std::env::temp_dir().join(format!("kurai-upload-{}.pdf", std::process::id()));
    std::fs::write(&path, b"%PDF-1.4 test").unwrap();
    let uploaded = client.upload_document(&path, 1, "January invoice").unwrap();
    std::fs::remove_file(&path).unwrap();
    let document = &uploaded["document"];
    assert_eq!(document["status"], "uploaded");
    assert_eq!(document["size"], 13);
    assert_eq!(document["description"], "January invoice");
    let id = document["id"].as_u64().unwrap();

    // Step 2: upload and process from memory.
    let file = Attachment::new("file", "contrato.png", vec![0u8; 32]);
    let processed = client.upload_document_bytes(file, 2, "", true).unwrap();
    assert_eq!(processed["document"]["status"], "processing");
    let second = processed["document"]["id"].as_u64().unwrap();

    // Step 3: read back.
    let extracted = client.get_document_extracted_data(id).unwrap();
    assert_eq!(extracted["document_id"], id);
    let batch = client.get_documents_extracted_data_batch(&[id, second]).unwrap();
    assert_eq!(batch["results"].as_array().unwrap().len(), 2);
    let url = client.get_document_url(id).unwrap();
    assert!(url["url"].as_str().unwrap().ends_with(".pdf"));

    // Step 4: filtered listing.
    let query = DocumentQuery {
        area_id: Some(2),
        ..DocumentQuery::default()
    };
    let listed = client.list_processed_documents(&query).unwrap();
    assert_eq!(listed["total"], 1);

    // Step 5: delete and confirm it is gone.
    let deleted = client.bulk_delete_documents(&[id]).unwrap();
    assert_eq!(deleted["deleted"], 1);
    let err = client.get_document_url(id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), format!("Not found: document {id} does not exist"));
}

#[test]
fn upload_into_unknown_area_is_not_found() {
    let client = client(&spawn_mock_server());
    let file = Attachment::new("file", "x.pdf", vec![1]);

    let err = client.upload_document_bytes(file, 42, "", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.response_data()["detail"], "area 42 does not exist");
}

#[test]
fn queue_lifecycle() {
    let client = client(&spawn_mock_server());

    // Step 1: add items; an unknown level is sent as Medium.
    let low = client
        .add_queue_item("facturas", json!({"n": 1}), Priority::from_level(0))
        .unwrap();
    assert_eq!(low["item"]["priority"], "Low");
    let medium = client
        .add_queue_item("facturas", json!({"n": 2}), Priority::from_level(9))
        .unwrap();
    assert_eq!(medium["item"]["priority"], "Medium");
    let medium_id = medium["item"]["id"].as_str().unwrap().to_string();

    // Step 2: next item honours priority and marks it in progress.
    let mut query = NextItemQuery::new("facturas");
    query.mark_as_processing = true;
    let next = client.get_next_queue_item(&query).unwrap();
    assert_eq!(next["item"]["id"], medium_id.as_str());
    assert_eq!(next["item"]["status"], "In Progress");

    // Step 3: update data and stage.
    let mut update = QueueItemUpdate::new(medium_id.clone());
    update.data = Some(json!({"extra": true}));
    update.stage = Some("OCR".to_string());
    let updated = client.update_queue_item(&update).unwrap();
    assert_eq!(updated["item"]["data"], json!({"n": 2, "extra": true}));
    assert_eq!(updated["item"]["etapa"], "OCR");

    // Step 4: finish through the urlencoded PATCH.
    let mut finish = FinishQueueItem::new(medium_id.clone());
    finish.output = Some(json!({"total": "$1,500.00"}));
    finish.stage = Some("Procesamiento completado".to_string());
    let finished = client.finish_queue_item(&finish).unwrap();
    assert_eq!(finished["item"]["status"], "Successful");
    assert_eq!(finished["item"]["progress"], 100);
    assert_eq!(finished["item"]["output"]["total"], "$1,500.00");

    // Step 5: analytics.
    let analytics = client.get_queue_analytics(AnalyticsPeriod::Month).unwrap();
    assert_eq!(analytics["period"], "30d");
    assert_eq!(analytics["summary"]["processed_items"], 1);
    assert_eq!(analytics["summary"]["pending_items"], 1);

    // Step 6: nothing left in progress.
    let mut query = NextItemQuery::new("facturas");
    query.status = ItemStatus::InProgress;
    let err = client.get_next_queue_item(&query).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Step 7: bulk delete.
    let deleted = client.bulk_delete_queue_items(&[medium_id]).unwrap();
    assert_eq!(deleted["deleted"], 1);
}

#[test]
fn finish_validation_never_reaches_the_server() {
    // Nothing listens here; a dispatched request would be a Connection error.
    let client = client(&closed_port_url());

    let mut finish = FinishQueueItem::new("ca9cf1c9-9d9b-4b24-8547-63d1c5265fbf");
    finish.progress = 101;
    assert_eq!(
        client.finish_queue_item(&finish).unwrap_err().kind(),
        ErrorKind::Validation
    );
    finish.progress = 50;
    finish.stage = Some("e".repeat(256));
    assert_eq!(
        client.finish_queue_item(&finish).unwrap_err().kind(),
        ErrorKind::Validation
    );
}

#[test]
fn bad_uuid_is_a_validation_error_from_the_server() {
    let client = client(&spawn_mock_server());

    let err = client
        .finish_queue_item(&FinishQueueItem::new("not-a-uuid"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.message(),
        "Validation error: `not-a-uuid` is not a valid item id"
    );
}

#[test]
fn grid_queries() {
    let client = client(&spawn_mock_server());

    let info = client.get_grid_info(1).unwrap();
    assert_eq!(info["grid"]["nombre"], "Clientes");

    let query = GridQuery {
        filters: vec![("estado".to_string(), "inactivo".to_string())],
        ..GridQuery::default()
    };
    let data = client.get_grid_data(1, &query).unwrap();
    assert_eq!(data["total"], 1);
    assert_eq!(data["data"][0]["cliente"], "Globex");

    let err = client.get_grid_info(9).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn email_encodings() {
    let client = client(&spawn_mock_server());

    let email = client.get_email_by_id("mail-1").unwrap();
    assert_eq!(email["email"]["subject"], "Factura enero");

    let reply = EmailReply::new("mail-1", "Recibido");
    let sent = client.reply_to_email(&reply).unwrap();
    assert_eq!(sent["encoding"], "json");

    let mut reply = EmailReply::new("mail-1", "Adjunto");
    reply.attachments = vec![Attachment::new("archivos", "a.txt", b"hola".to_vec())];
    let sent = client.reply_to_email(&reply).unwrap();
    assert_eq!(sent["encoding"], "multipart");
    assert_eq!(sent["attachments"], json!(["a.txt"]));

    let mut email = OutgoingEmail::new(
        vec!["a@test.com".to_string(), "b@test.com".to_string()],
        "Reporte",
        "<p>Adjunto</p>",
    );
    email.attachments = vec![
        Attachment::new("archivos", "uno.pdf", vec![1]),
        Attachment::new("archivos", "dos.pdf", vec![2]),
    ];
    let sent = client.send_email(&email).unwrap();
    assert_eq!(sent["encoding"], "multipart");
    assert_eq!(sent["fields"]["to"], "a@test.com, b@test.com");
    assert_eq!(sent["attachments"], json!(["uno.pdf", "dos.pdf"]));

    let sent = client
        .send_notification_email(&["u@test.com".to_string()], "queue_completed", None)
        .unwrap();
    assert_eq!(sent["fields"]["template_data"], json!({}));
}

#[test]
fn status_codes_are_classified() {
    let client = client(&spawn_mock_server());
    let cases = [
        (400, ErrorKind::Validation),
        (401, ErrorKind::Authentication),
        (404, ErrorKind::NotFound),
        (429, ErrorKind::RateLimit { retry_after: Some(120) }),
        (500, ErrorKind::Server),
        (503, ErrorKind::Server),
        (409, ErrorKind::Generic),
    ];
    for (status, kind) in cases {
        let err = client
            .execute(HttpMethod::Get, &format!("/mock/status/{status}"), Vec::new(), None)
            .unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
        assert_eq!(err.message(), format!("Mock error: status {status}"));
        assert_eq!(err.status_code(), Some(status));
    }
}

#[test]
fn malformed_error_body_uses_status_message() {
    let client = client(&spawn_mock_server());

    let err = client
        .execute(HttpMethod::Post, "/mock/malformed/500", Vec::new(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.message(), "Error HTTP 500");
    assert!(err.response_data().is_empty());
}

#[test]
fn malformed_success_body_is_not_silently_empty() {
    let client = client(&spawn_mock_server());

    let err = client
        .execute(HttpMethod::Get, "/mock/malformed/200", Vec::new(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.status_code(), Some(200));
}

#[test]
fn refused_connection_is_a_connection_error() {
    let client = client(&closed_port_url());

    let err = client.list_areas().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.status_code(), None);
}

#[test]
fn concurrent_calls_share_one_client() {
    let client = client(&spawn_mock_server());

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = &client;
                scope.spawn(move || {
                    if i % 2 == 0 {
                        client.list_areas().map(|_| ())
                    } else {
                        let file = Attachment::new("file", "t.pdf", vec![i as u8]);
                        client.upload_document_bytes(file, 1, "", false).map(|_| ())
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    });
}

/// URL of a port that was just released, so nothing is listening on it.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
