use pager_core::{PagingConfig, PagingError, DEFAULT_PAGE_SIZE};
use pretty_assertions::assert_eq;

#[test]
fn defaults_derive_from_page_size() {
    let config = PagingConfig::default();
    assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(config.prefetch_distance, DEFAULT_PAGE_SIZE);
    assert_eq!(config.initial_load_size, DEFAULT_PAGE_SIZE * 3);
    assert!(config.enable_placeholders);
    assert_eq!(config.max_size, None);
    assert_eq!(config.jump_threshold, None);
    assert!(config.validate().is_ok());
}

#[test]
fn validate_rejects_unusable_configs() {
    let cases = [
        PagingConfig::new(0),
        PagingConfig::new(10)
            .with_placeholders(false)
            .with_prefetch_distance(0),
        PagingConfig::new(10).with_max_size(29),
        PagingConfig::new(10).with_jump_threshold(0),
    ];
    for config in cases {
        assert!(
            matches!(config.validate(), Err(PagingError::InvalidConfig(_))),
            "{config:?} should be rejected"
        );
    }
}

#[test]
fn validate_accepts_boundary_values() {
    assert!(PagingConfig::new(10).with_max_size(30).validate().is_ok());
    assert!(PagingConfig::new(10)
        .with_prefetch_distance(0)
        .validate()
        .is_ok());
}

#[test]
fn missing_json_fields_use_defaults() {
    let config: PagingConfig =
        serde_json::from_str(r#"{ "page_size": 5, "max_size": 200 }"#).expect("parse config");

    assert_eq!(config.page_size, 5);
    assert_eq!(config.max_size, Some(200));
    assert_eq!(config.prefetch_distance, PagingConfig::default().prefetch_distance);
    assert!(config.enable_placeholders);
}

#[test]
fn config_round_trips_through_json() {
    let config = PagingConfig::new(8).with_jump_threshold(64);
    let json = serde_json::to_string(&config).expect("serialize");
    let parsed: PagingConfig = serde_json::from_str(&json).expect("parse");
    assert_eq!(parsed, config);
}
