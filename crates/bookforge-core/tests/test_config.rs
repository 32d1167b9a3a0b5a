use bookforge_core::config::BookforgeConfig;
use bookforge_core::pipeline::Backoff;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let json = r#"{
        "text_service": { "api_key": "sk-text" },
        "image_service": { "api_key": "sk-image" }
    }"#;

    let config = BookforgeConfig::from_json_str(json).expect("Failed to parse config");

    assert_eq!(config.text_service.model, "gpt-4o-mini");
    assert_eq!(config.image_service.model, "dall-e-3");
    assert_eq!(config.image_service.size, "1024x1024");
    assert!(config.text_service.base_url.is_none());

    // pipeline defaults reproduce the baseline behaviour
    assert_eq!(config.pipeline.illustration_attempts, 3);
    assert_eq!(config.pipeline.retry_delay_ms, 2000);
    assert_eq!(config.pipeline.throttle_delay_ms, 1000);
    assert_eq!(config.pipeline.illustration_concurrency, 1);
    assert_eq!(config.pipeline.settle_delay_ms, 1000);
    assert_eq!(config.pipeline.structure_attempts, 1);
    assert!(config.pipeline.cover_enabled);
    assert!(config.quota.ledger_path.is_none());
}

#[test]
fn test_parse_full_config() {
    let json = r#"{
        "text_service": {
            "api_key": "sk-text",
            "model": "gpt-4o",
            "base_url": "http://localhost:8080/v1",
            "timeout_secs": 30,
            "temperature": 0.5
        },
        "image_service": {
            "api_key": "sk-image",
            "size": "1792x1024"
        },
        "pipeline": {
            "illustration_attempts": 5,
            "retry_delay_ms": 250,
            "illustration_concurrency": 4,
            "cover_enabled": false
        },
        "quota": { "ledger_path": "/var/lib/bookforge/quota.json" }
    }"#;

    let config = BookforgeConfig::from_json_str(json).expect("Failed to parse config");

    assert_eq!(config.text_service.model, "gpt-4o");
    assert_eq!(config.text_service.base_url.as_deref(), Some("http://localhost:8080/v1"));
    assert_eq!(config.text_service.timeout_secs, 30);
    assert_eq!(config.image_service.size, "1792x1024");
    assert_eq!(config.pipeline.illustration_concurrency, 4);
    assert!(!config.pipeline.cover_enabled);
    assert_eq!(config.quota.ledger_path.as_deref(), Some("/var/lib/bookforge/quota.json"));

    let policy = config.pipeline.illustration_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_millis(250)));
    assert_eq!(policy.attempt_timeout, Some(Duration::from_secs(120)));
}

#[test]
fn test_missing_api_key_is_rejected() {
    let json = r#"{
        "text_service": { "api_key": "" },
        "image_service": { "api_key": "sk-image" }
    }"#;

    let err = BookforgeConfig::from_json_str(json).unwrap_err();
    assert!(err.to_string().contains("Text service API key"));
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let json = r#"{
        "text_service": { "api_key": "sk-text" },
        "image_service": { "api_key": "sk-image" },
        "pipeline": { "illustration_concurrency": 0 }
    }"#;

    assert!(BookforgeConfig::from_json_str(json).is_err());
}

#[test]
fn test_zero_attempts_is_rejected() {
    let json = r#"{
        "text_service": { "api_key": "sk-text" },
        "image_service": { "api_key": "sk-image" },
        "pipeline": { "illustration_attempts": 0 }
    }"#;

    assert!(BookforgeConfig::from_json_str(json).is_err());
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bookforge.json");
    std::fs::write(
        &path,
        r#"{
            "text_service": { "api_key": "sk-file-text" },
            "image_service": { "api_key": "sk-file-image" },
            "pipeline": { "settle_delay_ms": 0 }
        }"#,
    )
    .unwrap();

    let config = BookforgeConfig::from_file(&path).expect("Failed to load config file");
    assert_eq!(config.image_service.api_key, "sk-file-image");
    assert_eq!(config.pipeline.timings().settle_delay, Duration::ZERO);
}

#[test]
fn test_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = BookforgeConfig::from_file(temp_dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_immediate_pipeline_has_no_delays() {
    use bookforge_core::config::PipelineConfig;

    let timings = PipelineConfig::immediate().timings();
    assert_eq!(timings.throttle_delay, Duration::ZERO);
    assert_eq!(timings.settle_delay, Duration::ZERO);
    assert_eq!(
        PipelineConfig::immediate().illustration_policy().backoff,
        Backoff::Fixed(Duration::ZERO)
    );
}
