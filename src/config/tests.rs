//! Config module tests

use std::time::Duration;

use super::*;

const MINIMAL: &str = r#"
[registry]
service_urls = ["http://registry:8761/eureka/"]
"#;

#[test]
fn test_substitute_env_vars_simple() {
    std::env::set_var("TEST_VAR_SIMPLE", "hello");
    let result = substitute_env_vars("value = \"${TEST_VAR_SIMPLE}\"");
    assert_eq!(result, "value = \"hello\"");
    std::env::remove_var("TEST_VAR_SIMPLE");
}

#[test]
fn test_substitute_env_vars_with_default() {
    std::env::remove_var("TEST_VAR_UNSET");
    let result = substitute_env_vars("value = \"${TEST_VAR_UNSET:-default_value}\"");
    assert_eq!(result, "value = \"default_value\"");

    std::env::set_var("TEST_VAR_SET", "env_value");
    let result = substitute_env_vars("value = \"${TEST_VAR_SET:-default_value}\"");
    assert_eq!(result, "value = \"env_value\"");
    std::env::remove_var("TEST_VAR_SET");
}

#[test]
fn test_substitute_env_vars_missing_no_default() {
    std::env::remove_var("TEST_VAR_MISSING");
    let result = substitute_env_vars("value = \"${TEST_VAR_MISSING}\"");
    assert_eq!(result, "value = \"\"");
}

#[test]
fn test_load_config_with_env_substitution() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sidecar.toml");

    std::env::set_var("TEST_REGISTRY_HOST", "10.20.0.2");

    let config_content = r#"
[registry]
service_urls = ["http://${TEST_REGISTRY_HOST}:8761/eureka/"]

[server]
port = ${TEST_SERVER_PORT:-9000}
"#;

    std::fs::write(&config_path, config_content).unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(
        config.registry.service_urls,
        vec!["http://10.20.0.2:8761/eureka/".to_string()]
    );
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.locator.retry_interval, Duration::from_secs(1));
    assert_eq!(config.locator.max_attempts, 0);

    std::env::remove_var("TEST_REGISTRY_HOST");
}

#[test]
fn test_load_config_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sidecar.toml");
    std::fs::write(&config_path, MINIMAL).unwrap();

    std::env::set_var("SIDECAR__JMX_PORT", "9010");
    let config = Config::load(&config_path).unwrap();
    std::env::remove_var("SIDECAR__JMX_PORT");

    assert_eq!(config.jmx_port, Some(9010));
}

#[test]
fn test_load_missing_file_requires_registry() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_read_without_file_uses_env_only() {
    std::env::set_var("SIDECAR__LOCATOR__MAX_ATTEMPTS", "7");
    let config = Config::read(None).unwrap();
    std::env::remove_var("SIDECAR__LOCATOR__MAX_ATTEMPTS");

    assert_eq!(config.locator.max_attempts, 7);
    assert_eq!(config.server.port, 8080);
    assert!(config.registry.service_urls.is_empty());
    assert!(config.validate().is_err());
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.context_path, "/");
    assert!(config.management.port.is_none());
    assert!(config.instance.prefer_ip_address);
    assert!(!config.instance.secure_port_enabled);
    assert_eq!(config.instance.health_check_url_path, "/actuator/health");
    assert_eq!(config.instance.status_page_url_path, "/actuator/info");
    assert!(config.registry.register);
    assert_eq!(config.locator.retry_interval, Duration::from_secs(1));
}

#[test]
fn test_parse_minimal_config() {
    let config = Config::parse(MINIMAL).unwrap();
    assert_eq!(config.registry.endpoints().unwrap().len(), 1);
    assert!(config.should_register());
}

#[test]
fn test_parse_full_config() {
    let toml = r#"
jmx_port = 9010

[log]
level = "debug"

[application]
name = "monitoring"

[registry]
service_urls = ["http://registry-a:8761/eureka/", "https://registry-b/eureka/"]

[server]
port = 8443
context_path = "/monitoring"

[management]
port = 9090
context_path = "/manage"

[instance]
hostname = "monitoring.internal"
secure_port_enabled = true
health_check_url_path = "/actuator/health"
status_page_url_path = "/actuator/info"

[instance.metadata]
zone = "europe-west1-b"

[locator]
retry_interval = "250ms"
max_attempts = 120
"#;

    let config = Config::parse(toml).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.application.name.as_deref(), Some("monitoring"));
    assert_eq!(config.registry.service_urls.len(), 2);
    assert_eq!(config.server.port, 8443);
    assert_eq!(config.management.port, Some(9090));
    assert_eq!(config.management.context_path.as_deref(), Some("/manage"));
    assert_eq!(
        config.instance.hostname.as_deref(),
        Some("monitoring.internal")
    );
    assert!(config.instance.secure_port_enabled);
    assert_eq!(
        config.instance.metadata.get("zone").map(String::as_str),
        Some("europe-west1-b")
    );
    assert_eq!(config.jmx_port, Some(9010));
    assert_eq!(config.locator.retry_interval, Duration::from_millis(250));
    assert_eq!(config.locator.max_attempts, 120);
}

#[test]
fn test_bootstrap_context_never_registers() {
    let toml = r#"
[application]
config_name = "bootstrap"

[registry]
service_urls = ["http://registry:8761/eureka/"]
register = true
"#;

    let config = Config::parse(toml).unwrap();
    assert!(!config.should_register());
}

#[test]
fn test_register_disabled() {
    let toml = r#"
[registry]
service_urls = ["http://registry:8761/eureka/"]
register = false
"#;

    let config = Config::parse(toml).unwrap();
    assert!(!config.should_register());
}

#[test]
fn test_invalid_registry_url() {
    let toml = r#"
[registry]
service_urls = ["registry:8761"]
"#;

    assert!(Config::parse(toml).is_err());
}

#[test]
fn test_invalid_server_port() {
    let toml = r#"
[registry]
service_urls = ["http://registry:8761/eureka/"]

[server]
port = 0
"#;

    assert!(Config::parse(toml).is_err());
}

#[test]
fn test_invalid_ip_override() {
    let toml = r#"
[registry]
service_urls = ["http://registry:8761/eureka/"]

[instance]
ip_address = "not-an-ip"
"#;

    assert!(Config::parse(toml).is_err());
}

#[test]
fn test_invalid_health_path() {
    let toml = r#"
[registry]
service_urls = ["http://registry:8761/eureka/"]

[instance]
health_check_url_path = "actuator/health"
"#;

    assert!(Config::parse(toml).is_err());
}

#[test]
fn test_zero_retry_interval_rejected() {
    let toml = r#"
[registry]
service_urls = ["http://registry:8761/eureka/"]

[locator]
retry_interval = "0s"
"#;

    assert!(Config::parse(toml).is_err());
}
