use pulse_dashboard::providers::TimeRange;
use pulse_dashboard::settings::{ALPHAVANTAGE_KEY_ENV, NEWS_KEY_ENV, OPENWEATHER_KEY_ENV};
use pulse_dashboard::Settings;
use serial_test::serial;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().unwrap();
    let settings = Settings::load(dir.path().join("settings.json")).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.retry.max_attempts, 3);
    assert_eq!(settings.retry.policy().delay_for(1), Duration::from_millis(2000));
    assert_eq!(settings.notification_duration(), Duration::from_millis(3000));
    assert_eq!(settings.widgets.len(), 6);
}

#[test]
fn partial_file_fills_remaining_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"finance": {"default_symbol": "MSFT", "default_range": "1Y"}, "retry": {"max_attempts": 5}}"#,
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.finance.default_symbol, "MSFT");
    assert_eq!(settings.finance.default_range, TimeRange::Year);
    assert_eq!(settings.finance.base_url, "https://www.alphavantage.co/query");
    assert_eq!(settings.retry.max_attempts, 5);
    assert_eq!(settings.retry.base_delay_ms, 1000);
    assert_eq!(settings.news.country, "us");
}

#[test]
fn invalid_json_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Settings::load(&path).is_err());
}

#[test]
fn save_then_load_keeps_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut settings = Settings::default();
    settings.weather.default_city = "Lisbon".into();
    settings.widgets = vec!["finance".into(), "weather".into()];
    settings.debug_logging = true;
    settings.save(&path).unwrap();

    assert_eq!(Settings::load(&path).unwrap(), settings);
}

#[test]
#[serial]
fn env_keys_override_file_keys() {
    let mut settings = Settings::default();
    settings.news.api_key = "from-file".into();

    std::env::set_var(OPENWEATHER_KEY_ENV, "weather-env");
    std::env::set_var(NEWS_KEY_ENV, "  ");
    std::env::remove_var(ALPHAVANTAGE_KEY_ENV);
    settings.apply_env();
    std::env::remove_var(OPENWEATHER_KEY_ENV);
    std::env::remove_var(NEWS_KEY_ENV);

    assert_eq!(settings.weather.api_key, "weather-env");
    assert_eq!(settings.news.api_key, "from-file");
    assert_eq!(settings.missing_api_keys(), vec!["finance"]);
}
