use crate::helper::publication_helpers;
use crate::helper::HelperError;
use crate::models::db_operations::publications_db_operations::ArticleFilter;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct ArticleQuery {
    volume: Option<u32>,
    issue: Option<u32>,
    year: Option<i32>,
    keyword: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/articles", web::get().to(list_articles))
        .route("/articles/{id}", web::get().to(view_article))
        .route("/articles/{id}/download", web::post().to(download_article));
}

async fn list_articles(pool: web::Data<DbPool>, query: web::Query<ArticleQuery>) -> Result<HttpResponse, HelperError> {
    let query = query.into_inner();
    let filter = ArticleFilter {
        volume: query.volume,
        issue: query.issue,
        year: query.year,
        keyword: query.keyword.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
    };
    let articles = publication_helpers::list_articles(&pool, &filter)?;
    Ok(HttpResponse::Ok().json(json!({ "articles": articles })))
}

async fn view_article(pool: web::Data<DbPool>, id: web::Path<String>) -> Result<HttpResponse, HelperError> {
    let article = publication_helpers::view_article(&pool, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "article": article })))
}

async fn download_article(pool: web::Data<DbPool>, id: web::Path<String>) -> Result<HttpResponse, HelperError> {
    let (url, downloads) = publication_helpers::download_article(&pool, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "url": url, "downloadsCount": downloads })))
}
