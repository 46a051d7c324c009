use std::path::PathBuf;

use secrecy::ExposeSecret;

use premia_core::{AppConfig, ConfigOverrides, LoadOptions};

/// Render the effective configuration (defaults, file, and environment
/// already applied) with secrets redacted.
pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        overrides: ConfigOverrides::default(),
    }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines =
        vec!["effective config (precedence: overrides > env > file > default):".to_string()];

    lines.push(format!("source.base_url = {}", config.source.base_url));
    lines.push(format!(
        "source.bearer_token = {}",
        redact_token(config.source.bearer_token.expose_secret())
    ));
    lines.push(format!(
        "source.request_timeout_secs = {}",
        config.source.request_timeout_secs
    ));
    lines.push(format!("logging.level = {}", config.logging.level));
    lines.push(format!("logging.format = {:?}", config.logging.format));

    for (vertical, vertical_config) in config.verticals() {
        let key = vertical.key();
        lines.push(format!(
            "verticals.{key} = interval {}s, timeout {}s, fast_path {}, products [{}], fields {}",
            vertical_config.poll_interval_secs,
            vertical_config.session_timeout_secs,
            vertical_config
                .fast_path_background_secs
                .map_or("off".to_string(), |secs| format!("{secs}s")),
            vertical_config
                .allowed_product_ids
                .iter()
                .map(|id| id.0.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            vertical_config.coverage_fields.len(),
        ));
    }

    lines.join("\n")
}

fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "(unset)".to_string();
    }
    if token.len() <= 8 {
        return "********".to_string();
    }
    format!("{}…{}", &token[..4], &token[token.len() - 2..])
}
