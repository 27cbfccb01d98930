use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use journal_portal::{build_pool, config::Config, routes, storage::LocalManuscriptStore, AppState};
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

async fn root_handler() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[derive(Parser, Debug)]
#[command(name = "portal_server", author, version, about = "Starts the journal portal web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

/// `*` allows any origin; otherwise a comma-separated allow list. An empty list
/// leaves only same-origin requests working.
fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

fn build_session(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .build()
}

fn load_session_key(hex_key: &str) -> Key {
    let bytes = hex::decode(hex_key).expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    Key::try_from(bytes.as_slice())
        .expect("FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let db_path = config.portal_db_path();
    if !db_path.exists() {
        log::error!(
            "FATAL: {} not found. Run 'cargo run --bin setup_cli -- --env-file <path> db setup'",
            db_path.display()
        );
        std::process::exit(1);
    }
    fs::create_dir_all(config.manuscripts_path())?;

    let pool = build_pool(&db_path).expect("FATAL: Failed to create Rusqlite connection pool.");
    let app_state = web::Data::new(AppState {
        manuscript_store: Arc::new(LocalManuscriptStore::new(
            config.manuscripts_path(),
            "/media/manuscripts",
        )),
    });
    let session_key = load_session_key(&config.session_secret_key);

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("{} portal listening on http://{}", config.journal.name, server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .wrap(build_session(session_key.clone(), config.use_secure_cookies))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(app_state.clone())
            .configure(routes::config_api)
            // Uploaded manuscripts are served read-only.
            .service(actix_files::Files::new("/media", &config.media_path))
            .route("/", web::get().to(root_handler))
    })
    .bind(server_address)?
    .run()
    .await
}
