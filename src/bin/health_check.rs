//! Validates collaborator connectivity before a real run.
//! Exit code 0 when every check passes, 1 otherwise.

use gold_silver_intel::health::run_health_check;
use gold_silver_intel::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = AppConfig::load()?;
    let report = run_health_check(&cfg).await;

    if report.all_passed() {
        println!("health check passed");
        Ok(())
    } else {
        println!("health check completed with warnings");
        std::process::exit(1);
    }
}
