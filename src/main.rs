use pulse_dashboard::{logging, Dashboard, Settings};
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "settings.json".to_string());
    let mut settings = Settings::load(&path)?;
    settings.apply_env();
    logging::init(settings.debug_logging, settings.log_file.as_ref().map(PathBuf::from));

    let missing = settings.missing_api_keys();
    if !missing.is_empty() {
        tracing::warn!("no API key configured for: {}", missing.join(", "));
    }

    let dashboard = Dashboard::from_settings(&settings)?;
    tracing::info!(widgets = ?dashboard.layout().items(), "refreshing dashboard");
    dashboard.data().refresh_defaults(&settings).await;

    let snapshot = dashboard.data().snapshot();
    match (&snapshot.weather.data, &snapshot.weather.error) {
        (_, Some(err)) => tracing::error!("weather: {err}"),
        (Some(report), None) => tracing::info!("weather: {}", report.summary()),
        _ => {}
    }
    match (&snapshot.news.data, &snapshot.news.error) {
        (_, Some(err)) => tracing::error!("news: {err}"),
        (Some(page), None) => {
            tracing::info!("news: {} articles", page.articles.len());
            for article in page.articles.iter().take(5) {
                tracing::info!("  {}", article.title.as_deref().unwrap_or_default());
            }
        }
        _ => {}
    }
    match (&snapshot.stock.data, &snapshot.stock.error) {
        (_, Some(err)) => tracing::error!("finance: {err}"),
        (Some(series), None) => tracing::info!(
            "finance: {} {} candles, change {:.2}%",
            series.symbol,
            series.candles.len(),
            series.change_percent().unwrap_or_default()
        ),
        _ => {}
    }
    match (&snapshot.quote.data, &snapshot.quote.error) {
        (_, Some(err)) => tracing::error!("quote: {err}"),
        (Some(quote), None) => tracing::info!(
            "quote: {} {:.2} ({:+.2}%)",
            quote.symbol,
            quote.price,
            quote.change_percent
        ),
        _ => {}
    }

    dashboard.shutdown();
    Ok(())
}
