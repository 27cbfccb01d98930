#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use chrono::{Datelike, Utc};
use common::TestPortal;
use journal_portal::models::Role;
use serde_json::json;

#[actix_web::test]
async fn publishing_assigns_sequential_dois() {
    let portal = TestPortal::new();
    let author_user = portal.add_user("author@example.org", Role::Author);
    portal.add_user("editor@example.org", Role::Editor);
    let first = portal.accepted_submission(&author_user, "Cord care practices", &["neonatal"], None);
    let second = portal.accepted_submission(&author_user, "Kangaroo mother care", &["neonatal"], None);
    let app = portal_app!(portal);

    let author = login!(app, "author@example.org");
    let (status, _) = send!(
        app,
        TestRequest::post().uri(&format!("/api/submissions/{}/publish", first)).cookie(author.clone())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let editor = login!(app, "editor@example.org");
    let year = Utc::now().year();
    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri(&format!("/api/submissions/{}/publish", first))
            .cookie(editor.clone())
            .set_json(json!({ "volume": 3, "issue": 2, "pages": "101-109" }))
    );
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["publication"]["doi"], format!("10.5555/gsjp.{}.0001", year));
    assert_eq!(body["publication"]["volume"], 3);
    assert_eq!(body["publication"]["viewsCount"], 0);

    let (status, body) = send!(
        app,
        TestRequest::post().uri(&format!("/api/submissions/{}/publish", second)).cookie(editor.clone())
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["publication"]["doi"], format!("10.5555/gsjp.{}.0002", year));
    assert!(body["publication"]["volume"].is_null());

    let (status, _) = send!(
        app,
        TestRequest::post().uri(&format!("/api/submissions/{}/publish", first)).cookie(editor)
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(portal.count("SELECT COUNT(*) FROM publications", &[]), 2);

    let (_, body) = send!(app, TestRequest::get().uri("/api/notifications").cookie(author));
    let published = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "ARTICLE_PUBLISHED")
        .count();
    assert_eq!(published, 2);
}

#[actix_web::test]
async fn only_accepted_manuscripts_can_be_published() {
    let portal = TestPortal::new();
    portal.add_user("author@example.org", Role::Author);
    portal.add_user("editor@example.org", Role::Editor);
    let app = portal_app!(portal);

    let author = login!(app, "author@example.org");
    let id = submit!(app, author, "Unreviewed manuscript");
    let editor = login!(app, "editor@example.org");
    let (status, body) = send!(
        app,
        TestRequest::post().uri(&format!("/api/submissions/{}/publish", id)).cookie(editor)
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot change status from SUBMITTED to PUBLISHED");
    assert_eq!(portal.count("SELECT COUNT(*) FROM publications", &[]), 0);
}

#[actix_web::test]
async fn public_listing_filters_published_articles() {
    let portal = TestPortal::new();
    let author_user = portal.add_user("author@example.org", Role::Author);
    portal.add_user("editor@example.org", Role::Editor);
    let malaria = portal.accepted_submission(&author_user, "Bed net use", &["Malaria", "prevention"], None);
    let nutrition = portal.accepted_submission(&author_user, "School feeding", &["nutrition"], None);
    portal.accepted_submission(&author_user, "Not yet published", &["malaria"], None);
    let app = portal_app!(portal);

    let editor = login!(app, "editor@example.org");
    for (id, volume) in [(&malaria, 1), (&nutrition, 2)] {
        let (status, _) = send!(
            app,
            TestRequest::post()
                .uri(&format!("/api/submissions/{}/publish", id))
                .cookie(editor.clone())
                .set_json(json!({ "volume": volume, "issue": 1 }))
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send!(app, TestRequest::get().uri("/api/articles"));
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["School feeding", "Bed net use"]);
    assert_eq!(body["articles"][0]["authorName"], "author");

    let (_, body) = send!(app, TestRequest::get().uri("/api/articles?keyword=MALARIA"));
    assert_eq!(body["articles"].as_array().unwrap().len(), 1);
    assert_eq!(body["articles"][0]["title"], "Bed net use");

    let (_, body) = send!(app, TestRequest::get().uri("/api/articles?volume=2"));
    assert_eq!(body["articles"].as_array().unwrap().len(), 1);
    assert_eq!(body["articles"][0]["title"], "School feeding");

    let (_, body) = send!(app, TestRequest::get().uri(&format!("/api/articles?year={}", Utc::now().year() - 1)));
    assert!(body["articles"].as_array().unwrap().is_empty());

    let (status, _) = send!(app, TestRequest::get().uri("/api/articles?volume=first"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn every_view_and_download_is_counted() {
    let portal = TestPortal::new();
    let author_user = portal.add_user("author@example.org", Role::Author);
    portal.add_user("editor@example.org", Role::Editor);
    let with_file = portal.accepted_submission(
        &author_user,
        "Sickle cell screening",
        &["haematology"],
        Some("/media/manuscripts/aa/bb/screening.pdf"),
    );
    let without_file = portal.accepted_submission(&author_user, "Letter to the editor", &[], None);
    let app = portal_app!(portal);

    let editor = login!(app, "editor@example.org");
    let (_, body) = send!(
        app,
        TestRequest::post().uri(&format!("/api/submissions/{}/publish", with_file)).cookie(editor.clone())
    );
    let article_id = body["publication"]["id"].as_str().unwrap().to_string();
    let (_, body) = send!(
        app,
        TestRequest::post().uri(&format!("/api/submissions/{}/publish", without_file)).cookie(editor)
    );
    let bare_id = body["publication"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/articles/{}", article_id);
    let (status, body) = send!(app, TestRequest::get().uri(&uri));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["article"]["viewsCount"], 1);
    assert_eq!(body["article"]["authors"][0]["name"], "author");
    let (_, body) = send!(app, TestRequest::get().uri(&uri));
    assert_eq!(body["article"]["viewsCount"], 2);
    assert_eq!(
        portal.count("SELECT views_count FROM publications WHERE id = ?1", &[&article_id]),
        2
    );

    let (status, body) = send!(app, TestRequest::post().uri(&format!("{}/download", uri)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "/media/manuscripts/aa/bb/screening.pdf");
    assert_eq!(body["downloadsCount"], 1);

    let (status, _) = send!(app, TestRequest::post().uri(&format!("/api/articles/{}/download", bare_id)));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        portal.count("SELECT downloads_count FROM publications WHERE id = ?1", &[&bare_id]),
        0
    );

    let (status, body) = send!(app, TestRequest::get().uri("/api/articles/unknown"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Article not found");
}
