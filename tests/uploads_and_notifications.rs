#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::TestPortal;
use journal_portal::models::Role;

const BOUNDARY: &str = "----portal-test-boundary";

fn multipart_request(field: &str, content_type: &str, bytes: &[u8]) -> TestRequest {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"manuscript\"\r\nContent-Type: {}\r\n\r\n",
            field, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    TestRequest::post()
        .uri("/api/uploads")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

#[actix_web::test]
async fn author_uploads_a_pdf_into_the_manuscript_store() {
    let portal = TestPortal::new();
    portal.add_user("author@example.org", Role::Author);
    let app = portal_app!(portal);
    let author = login!(app, "author@example.org");

    let (status, body) = send!(
        app,
        multipart_request("file", "application/pdf", b"%PDF-1.4 fake manuscript").cookie(author)
    );
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/media/manuscripts/"));
    assert!(url.ends_with(".pdf"));

    let on_disk = portal
        .config
        .manuscripts_path()
        .join(url.trim_start_matches("/media/manuscripts/"));
    assert_eq!(std::fs::read(on_disk).unwrap(), b"%PDF-1.4 fake manuscript");
}

#[actix_web::test]
async fn uploads_are_checked_for_role_type_and_size() {
    let portal = TestPortal::new();
    portal.add_user("author@example.org", Role::Author);
    portal.add_user("reviewer@example.org", Role::Reviewer);
    let app = portal_app!(portal);

    let (status, _) = send!(app, multipart_request("file", "application/pdf", b"%PDF"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reviewer = login!(app, "reviewer@example.org");
    let (status, _) = send!(app, multipart_request("file", "application/pdf", b"%PDF").cookie(reviewer));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let author = login!(app, "author@example.org");
    let (status, body) = send!(
        app,
        multipart_request("file", "image/svg+xml", b"<svg/>").cookie(author.clone())
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unsupported file type"));

    // The test portal caps uploads at 1MB.
    let oversized = vec![b'x'; 1024 * 1024 + 1];
    let (status, body) = send!(
        app,
        multipart_request("file", "application/pdf", &oversized).cookie(author.clone())
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("too large"));

    let (status, body) = send!(
        app,
        multipart_request("attachment", "application/pdf", b"%PDF").cookie(author)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file was uploaded");
}

#[actix_web::test]
async fn notifications_belong_to_their_recipient() {
    let portal = TestPortal::new();
    portal.add_user("author@example.org", Role::Author);
    portal.add_user("other@example.org", Role::Author);
    let app = portal_app!(portal);

    let author = login!(app, "author@example.org");
    submit!(app, author, "Paediatric HIV retention");
    submit!(app, author, "Adolescent mental health");

    let (status, body) = send!(app, TestRequest::get().uri("/api/notifications").cookie(author.clone()));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unreadCount"], 2);
    let notifications = body["notifications"].as_array().unwrap();
    assert!(notifications[0]["message"]
        .as_str()
        .unwrap()
        .contains("Adolescent mental health"));
    let first_id = notifications[0]["id"].as_str().unwrap().to_string();

    let other = login!(app, "other@example.org");
    let (status, _) = send!(
        app,
        TestRequest::post()
            .uri(&format!("/api/notifications/{}/read", first_id))
            .cookie(other.clone())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send!(app, TestRequest::get().uri("/api/notifications").cookie(other));
    assert!(body["notifications"].as_array().unwrap().is_empty());

    let (status, _) = send!(
        app,
        TestRequest::post()
            .uri(&format!("/api/notifications/{}/read", first_id))
            .cookie(author.clone())
    );
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send!(
        app,
        TestRequest::get().uri("/api/notifications?unreadOnly=true").cookie(author.clone())
    );
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
    assert_eq!(body["unreadCount"], 1);

    let (status, body) = send!(
        app,
        TestRequest::post().uri("/api/notifications/read-all").cookie(author.clone())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, body) = send!(app, TestRequest::get().uri("/api/notifications").cookie(author));
    assert_eq!(body["notifications"].as_array().unwrap().len(), 2);
    assert_eq!(body["unreadCount"], 0);

    let (status, _) = send!(app, TestRequest::get().uri("/api/notifications"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
