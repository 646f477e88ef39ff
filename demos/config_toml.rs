//! Load logger settings from a TOML document and route `tracing` macros
//! through the resulting logger.

use serde::Deserialize;

#[derive(Deserialize)]
struct AppConfig {
    log: pplog::Config,
}

const CONFIG: &str = r#"
[log]
console = true
level = "Info"
max_backups = 5
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root: AppConfig = toml::from_str(CONFIG)?;
    let (logger, _sugar) = pplog::new_logger(root.log)?;
    logger.init_global()?;

    tracing::debug!("hidden at Info");
    tracing::info!(user = "bob", action = "logout", "User session ended");
    tracing::error!(error_code = 500, "Database error occurred");

    Ok(())
}
