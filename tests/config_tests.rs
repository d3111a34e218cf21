use std::env;

use serial_test::serial;
use staffhelp::config::{get_config, init_config};

#[test]
#[serial]
fn config_loads_once_database_url_is_set() {
    env::set_var("DATABASE_URL", "sqlite::memory:");

    let config = get_config().expect("config should load");

    assert_eq!(config.database.url, "sqlite::memory:");
    // Key shape defaults give the XXXXX-XXXXX-XXXXX format.
    assert_eq!(config.license.key_segments, 3);
    assert_eq!(config.license.key_segment_length, 5);
    assert!(config.server.port > 0);
}

#[test]
#[serial]
fn config_is_cached_after_first_load() {
    env::set_var("DATABASE_URL", "sqlite::memory:");

    let first = init_config().expect("config should load");
    let second = get_config().expect("config should load");

    // Same 'static instance both times.
    assert!(std::ptr::eq(first, second));
}
