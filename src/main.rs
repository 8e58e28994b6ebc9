use detraf_recon::{create_pool, export, AppConfig, ReconService};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let period = std::env::args().nth(1).ok_or("usage: detraf-recon <YYYYMM>")?;

    let config = AppConfig::load()?;
    info!("starting reconciliation for period {period}");

    let pool = create_pool(&config.database.url).await?;
    info!("database pool created");

    let service = ReconService::new(pool);
    let output = service.run(&period).await?;

    let results_csv = export::export_results(&output.results, &config.export.dir)?;
    let outdated_csv = export::export_outdated(&output.outdated, &config.export.dir)?;

    let s = &output.summary;
    println!(
        "{} records: {} reconciled, {} error, {} lost ({} unparseable)",
        s.total, s.reconciled, s.errors, s.lost, s.unparseable
    );
    println!("reports: {} | {}", results_csv.display(), outdated_csv.display());

    Ok(())
}
