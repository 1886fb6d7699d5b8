use std::env;

use anyhow::anyhow;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cursuri_frontend::{auth::LoginCredentials, state::MarkerPalette, App, Config};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cursuri_frontend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        supabase_url = %config.supabase_url,
        supabase_anon_key = %mask_secret(&config.supabase_anon_key),
        courses_page_size = config.courses_page_size,
        request_timeout_secs = config.request_timeout_secs,
        student_tables = config.student_tables.len(),
        "Loaded configuration from environment/.env"
    );

    let app = App::new(config)?;
    let _subscription = app.start().await;

    if let (Ok(email), Ok(password)) = (env::var("CURSURI_EMAIL"), env::var("CURSURI_PASSWORD")) {
        let outcome = app.auth().login(LoginCredentials { email, password }).await;
        if let Some(error) = outcome.error.filter(|_| !outcome.success) {
            return Err(anyhow!("login failed ({:?}): {}", error.kind, error.message));
        }
    }

    let session = app.session().snapshot();
    match &session.student {
        Some(student) => tracing::info!(
            name = %student.full_name(),
            group = %student.group,
            year = student.year,
            "signed in"
        ),
        None if session.is_authenticated() => tracing::warn!("signed in without a student profile"),
        None => tracing::info!("not signed in, listing every course"),
    }

    let courses = app.course_list();
    courses.load_more().await?;
    for course in courses.snapshot().courses {
        tracing::info!(
            id = ?course.id,
            name = %course.display_name(),
            date = ?course.date,
            time = ?course.time,
            room = ?course.room,
            "course"
        );
    }

    let calendar = app.calendar(MarkerPalette::ByType);
    calendar.load().await?;
    let today = calendar.select_today();
    tracing::info!(
        marked_days = calendar.snapshot().marked_dates.len(),
        today = today.len(),
        "calendar loaded"
    );
    for course in today {
        tracing::info!(name = %course.display_name(), time = ?course.time, "today");
    }

    Ok(())
}
