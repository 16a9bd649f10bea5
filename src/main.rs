use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use librarysphere::infrastructure::AppState;
use librarysphere::services::LendingPolicy;
use librarysphere::{config, db, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "librarysphere=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = config::Config::from_env().map_err(|e| e.to_string())?;

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .map_err(|e| format!("Failed to initialize database: {}", e))?;

    // Check for seed flag
    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&db).await {
            tracing::error!("Failed to seed data: {}", e);
        } else {
            tracing::info!("Demo data seeded successfully.");
        }
    }

    let policy = LendingPolicy {
        loan_period_days: config.loan_period_days,
        reservation_hold_days: config.reservation_hold_days,
    };
    tracing::info!(
        loan_period_days = policy.loan_period_days,
        reservation_hold_days = policy.reservation_hold_days,
        "Lending policy loaded"
    );

    let state = AppState::with_policy(db, policy);
    server::serve(state, config.port, &config.cors_allowed_origins).await
}
