use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use journal_portal::config::Config;
use journal_portal::helper::auth_helpers::{
    create_account, normalize_email, validate_password, RegisterRequest, Registration,
};
use journal_portal::helper::notification_helpers::{author_submission_link, notify, reviewer_review_link};
use journal_portal::helper::review_helpers::mark_overdue_reviews;
use journal_portal::helper::{begin_write, HelperError};
use journal_portal::models::db_operations::{
    notifications_db_operations, reviews_db_operations, submissions_db_operations, users_db_operations,
};
use journal_portal::models::{
    ActivityAction, ArticleType, AuthorInfo, NewSubmission, NotificationKind, Role, SubmissionStatus,
};
use journal_portal::setup::db_setup;
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

const SEED_PASSWORD: &str = "Password123";

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "Administration CLI for the journal portal.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// Loads demo accounts and one manuscript under review into an empty database.
    Seed,
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup,
}

#[derive(Subcommand, Debug)]
enum UserAction {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
        /// AUTHOR, REVIEWER, EDITOR or ADMIN
        #[arg(long)]
        role: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        institution: Option<String>,
    },
    List {
        #[arg(long)]
        role: Option<String>,
    },
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand, Debug)]
enum ReviewsAction {
    /// Moves every pending review past its due date to OVERDUE.
    MarkOverdue,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_database(&config),
        },
        Commands::User { action } => match action {
            UserAction::Create { email, password, full_name, role, country, institution } => {
                let request = RegisterRequest {
                    email: Some(email),
                    password: Some(password),
                    full_name: Some(full_name),
                    role: Some(role.to_uppercase()),
                    country: Some(country),
                    institution,
                    ..Default::default()
                };
                create_user(&config, request);
            }
            UserAction::List { role } => list_users(&config, role.as_deref()),
            UserAction::ChangePassword { email, new_password } => {
                change_password(&config, &email, &new_password);
            }
        },
        Commands::Reviews { action } => match action {
            ReviewsAction::MarkOverdue => mark_overdue(&config),
        },
        Commands::Seed => seed(&config),
    }
}

fn open_existing(db_path: &Path) -> Option<Connection> {
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Portal database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(db_path) {
        Ok(conn) => {
            if let Err(e) = conn.execute_batch("PRAGMA foreign_keys = ON;") {
                eprintln!("❌ Error configuring database connection: {}", e);
                return None;
            }
            Some(conn)
        }
        Err(e) => {
            eprintln!("❌ Error opening portal database: {}", e);
            None
        }
    }
}

fn setup_database(config: &Config) {
    let db_path = config.portal_db_path();
    println!("\nSetting up portal database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create portal database file.");
    match db_setup::setup_portal_db(&mut conn) {
        Ok(_) => println!("✅ Portal database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up portal database: {}", e),
    }
}

fn create_user(config: &Config, request: RegisterRequest) {
    let Some(mut conn) = open_existing(&config.portal_db_path()) else {
        return;
    };
    let registration = match request.validate() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            return;
        }
    };

    let result = begin_write(&mut conn).and_then(|tx| {
        let user = create_account(
            &tx,
            &registration,
            config.security.password_hash_cost,
            &config.journal.name,
        )?;
        tx.commit()?;
        Ok(user)
    });

    match result {
        Ok(user) => println!("✅ {} account '{}' created with id {}.", user.role, user.email, user.id),
        Err(e) => eprintln!("❌ Error creating user: {}", e),
    }
}

fn list_users(config: &Config, role: Option<&str>) {
    let Some(conn) = open_existing(&config.portal_db_path()) else {
        return;
    };
    let role = match role.map(|r| r.trim().to_uppercase().parse::<Role>()).transpose() {
        Ok(role) => role,
        Err(e) => {
            eprintln!("❌ Error: {}. Use AUTHOR, REVIEWER, EDITOR or ADMIN.", e);
            return;
        }
    };

    match users_db_operations::read_all_users(&conn, role) {
        Ok(users) if users.is_empty() => println!("No users found."),
        Ok(users) => {
            println!("Listing Users:");
            for user in users {
                println!("- {:<9} {} ({})", user.role.as_str(), user.email, user.full_name);
            }
        }
        Err(e) => eprintln!("❌ Error fetching users: {}", e),
    }
}

fn change_password(config: &Config, email: &str, new_password: &str) {
    let Some(conn) = open_existing(&config.portal_db_path()) else {
        return;
    };
    let email = match normalize_email(email).and_then(|email| {
        validate_password(new_password)?;
        Ok(email)
    }) {
        Ok(email) => email,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            return;
        }
    };

    match users_db_operations::update_password(&conn, &email, new_password, config.security.password_hash_cost) {
        Ok(0) => eprintln!("❌ Error: No user with email '{}' found.", email),
        Ok(_) => println!("✅ Password for '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}

fn mark_overdue(config: &Config) {
    let Some(conn) = open_existing(&config.portal_db_path()) else {
        return;
    };
    match mark_overdue_reviews(&conn) {
        Ok(0) => println!("ℹ️ No reviews are past their due date."),
        Ok(n) => println!("✅ Marked {} review(s) as OVERDUE.", n),
        Err(e) => eprintln!("❌ Error marking overdue reviews: {}", e),
    }
}

fn seed(config: &Config) {
    let Some(mut conn) = open_existing(&config.portal_db_path()) else {
        return;
    };
    match users_db_operations::count_users(&conn) {
        Ok(0) => {}
        Ok(_) => {
            println!("ℹ️ The portal database already has users. Skipping seed.");
            return;
        }
        Err(e) => {
            eprintln!("❌ Error reading users: {}", e);
            return;
        }
    }

    match seed_demo_data(&mut conn, config) {
        Ok(()) => {
            println!("✅ Demo data created.");
            println!("\nTest accounts (password '{}'):", SEED_PASSWORD);
            println!("- Admin:    admin@gsjpediatrics.org");
            println!("- Editor:   editor@gsjpediatrics.org");
            println!("- Reviewer: reviewer1@example.com");
            println!("- Author:   author@example.com");
        }
        Err(e) => eprintln!("❌ Error seeding database: {}", e),
    }
}

fn demo_account(
    email: &str,
    full_name: &str,
    role: Role,
    institution: &str,
    country: &str,
    specialties: &[&str],
) -> Registration {
    Registration {
        email: email.to_string(),
        password: SEED_PASSWORD.to_string(),
        full_name: full_name.to_string(),
        role,
        institution: Some(institution.to_string()),
        country: country.to_string(),
        orcid: None,
        specialties: specialties.iter().map(|s| s.to_string()).collect(),
    }
}

fn seed_demo_data(conn: &mut Connection, config: &Config) -> Result<(), HelperError> {
    let cost = config.security.password_hash_cost;
    let journal = &config.journal.name;
    let tx = begin_write(conn)?;

    let admin = demo_account(
        "admin@gsjpediatrics.org",
        "Admin User",
        Role::Admin,
        "GSJP Editorial Office",
        "Benin",
        &[],
    );
    let editor = demo_account(
        "editor@gsjpediatrics.org",
        "Prof. Amina Diallo",
        Role::Editor,
        "Université Cheikh Anta Diop",
        "Senegal",
        &["Pediatric Infectious Diseases", "Tropical Medicine"],
    );
    let reviewer = demo_account(
        "reviewer1@example.com",
        "Dr. Carlos Mendoza",
        Role::Reviewer,
        "Universidad Nacional de Colombia",
        "Colombia",
        &["Neonatology", "Pediatric Cardiology"],
    );
    let author = demo_account(
        "author@example.com",
        "Dr. Marie Kouassi",
        Role::Author,
        "CHU de Cocody",
        "Ivory Coast",
        &["Pediatric Nutrition"],
    );

    create_account(&tx, &admin, cost, journal)?;
    let editor = create_account(&tx, &editor, cost, journal)?;
    let reviewer = create_account(&tx, &reviewer, cost, journal)?;
    let author = create_account(&tx, &author, cost, journal)?;

    let submission = submissions_db_operations::create_submission(
        &tx,
        &NewSubmission {
            author_id: author.id.clone(),
            title: "Prevalence of Malnutrition in Children Under 5 in West Africa: A Systematic Review"
                .to_string(),
            abstract_text: "Background: Malnutrition remains a major public health challenge in West Africa..."
                .to_string(),
            keywords: Some(
                ["malnutrition", "West Africa", "children", "systematic review"]
                    .iter()
                    .map(|k| k.to_string())
                    .collect(),
            ),
            article_type: ArticleType::SystematicReview,
            manuscript_file_url: None,
            figures_urls: None,
            word_count: Some(5200),
            corresponding_author: Some(AuthorInfo {
                name: author.full_name.clone(),
                email: Some(author.email.clone()),
                institution: author.institution.clone(),
                orcid: None,
            }),
            co_authors: None,
            ethical_approval_number: None,
            funding_info: None,
            conflicts_of_interest: None,
        },
    )?;
    notify(
        &tx,
        &author.id,
        NotificationKind::SubmissionReceived,
        "Submission Received",
        &format!("Your manuscript \"{}\" has been successfully submitted.", submission.title),
        Some(&author_submission_link(&submission.id)),
    )?;
    notifications_db_operations::log_activity(
        &tx,
        &submission.id,
        &author.id,
        ActivityAction::SubmissionCreated,
        &json!({ "title": submission.title, "articleType": submission.article_type }),
    )?;

    let now = Utc::now();
    let due_date = now + Duration::days(config.journal.review_due_days);
    let review = reviews_db_operations::create_review(&tx, &submission.id, &reviewer.id, &editor.id, now, due_date)?;
    submissions_db_operations::update_status(&tx, &submission.id, SubmissionStatus::UnderReview)?;
    notify(
        &tx,
        &reviewer.id,
        NotificationKind::ReviewInvitation,
        "New Review Invitation",
        &format!(
            "You have been invited to review \"{}\". Please respond by {}.",
            submission.title,
            due_date.format("%Y-%m-%d")
        ),
        Some(&reviewer_review_link(&review.id)),
    )?;
    notifications_db_operations::log_activity(
        &tx,
        &submission.id,
        &editor.id,
        ActivityAction::ReviewersAssigned,
        &json!({ "reviewerIds": [reviewer.id], "dueDate": due_date }),
    )?;

    tx.commit()?;
    Ok(())
}
