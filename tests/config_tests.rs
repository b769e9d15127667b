mod common;

use common::setup_test_env;
use tax_tracker::{config::Config, storage::StorePaths};

#[test]
fn config_round_trips_through_backups() {
    let (_, config_manager) = setup_test_env();
    let mut config = Config::default();
    config.set("home_currency", "usd").unwrap();
    config.set("default_vat_rate", "20").unwrap();
    config_manager.save(&config).unwrap();

    let name = config_manager.backup(&config, Some("Before year end")).unwrap();
    assert!(name.ends_with("_before-year-end.json"));

    config.set("locale", "tr-TR").unwrap();
    config_manager.save(&config).unwrap();
    assert_eq!(config_manager.load().unwrap().locale, "tr-TR");

    let restored = config_manager.restore(&name).unwrap();
    assert_eq!(restored.locale, "en-US");
    assert_eq!(restored.home_currency.as_str(), "USD");
    assert_eq!(config_manager.load().unwrap(), restored);
    assert_eq!(config_manager.list_backups().unwrap(), vec![name]);
}

#[test]
fn invalid_settings_are_rejected() {
    let mut config = Config::default();
    assert!(config.set("backup_retention", "0").is_err());
    assert!(config.set("default_vat_rate", "120").is_err());
    assert!(config.set("home_currency", "euro").is_err());
    assert!(config.set("colour", "true").is_err());
    assert_eq!(config, Config::default());
}

#[test]
fn store_paths_prefer_configured_directories() {
    let (_, config_manager) = setup_test_env();
    let mut config = Config::default();
    let fallback = config_manager.default_data_dir();
    assert_eq!(config.store_paths(fallback.clone()).data_dir, fallback);

    config.set("data_dir", "/srv/tax").unwrap();
    config.set("legacy_data_dir", "/srv/old").unwrap();
    let paths = config.store_paths(fallback);
    assert_eq!(
        paths,
        StorePaths::new("/srv/tax").with_legacy_dir(Some("/srv/old".into()))
    );
}
