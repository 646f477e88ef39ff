use pplog::{Config, Level};
use serde::Deserialize;

#[derive(Deserialize)]
struct AppConfig {
    log: Config,
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[log]
console = true
file = true
log_dir = "/var/log/app"
file_name = "app.log"
level = "Warn"
max_size = 100
compress = true
"#;
    let root: AppConfig = toml::from_str(toml_str).unwrap();
    let config = root.log;
    assert!(config.console);
    assert!(config.file);
    assert_eq!(config.log_dir, "/var/log/app");
    assert_eq!(config.effective_level(), Level::Warn);
    assert_eq!(config.max_backups, 0);

    let config = config.normalized();
    assert_eq!(config.max_size, 100);
    assert_eq!(config.max_backups, 3);
    assert_eq!(config.max_age, 30);
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
log:
  console: true
  level: DPanic
  max_age: 7
"#;
    let root: AppConfig = serde_yaml::from_str(yaml).unwrap();
    let config = root.log.normalized();
    assert!(config.console);
    assert!(!config.file);
    assert_eq!(config.effective_level(), Level::DPanic);
    assert_eq!(config.max_age, 7);
    assert_eq!(config.log_dir, "./logs");
}

#[test]
fn test_empty_sections_use_defaults() {
    let root: AppConfig = toml::from_str("[log]\n").unwrap();
    assert_eq!(root.log, Config::default());
    assert_eq!(root.log.effective_level(), Level::Info);
}
