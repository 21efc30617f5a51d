use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pizzabot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// Config key, rendered value and the env var that can override it.
type Field = (&'static str, String, &'static [&'static str]);

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = match &config.llm.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    let cors_origins = if config.server.cors_origins.is_empty() {
        "<none>".to_string()
    } else {
        config.server.cors_origins.join(",")
    };

    vec![
        field("database.url", config.database.url.clone(), &["PIZZABOT_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PIZZABOT_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PIZZABOT_DATABASE_TIMEOUT_SECS"],
        ),
        field("llm.provider", format!("{:?}", config.llm.provider), &["PIZZABOT_LLM_PROVIDER"]),
        field("llm.model", config.llm.model.clone(), &["PIZZABOT_LLM_MODEL"]),
        field("llm.base_url", config.llm.effective_base_url(), &["PIZZABOT_LLM_BASE_URL"]),
        field("llm.api_key", api_key, &["PIZZABOT_LLM_API_KEY"]),
        field("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["PIZZABOT_LLM_TIMEOUT_SECS"]),
        field("llm.temperature", config.llm.temperature.to_string(), &["PIZZABOT_LLM_TEMPERATURE"]),
        field("server.bind_address", config.server.bind_address.clone(), &["PIZZABOT_SERVER_BIND_ADDRESS"]),
        field("server.port", config.server.port.to_string(), &["PIZZABOT_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["PIZZABOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field("server.cors_origins", cors_origins, &["PIZZABOT_SERVER_CORS_ORIGINS"]),
        field("agent.max_steps", config.agent.max_steps.to_string(), &["PIZZABOT_AGENT_MAX_STEPS"]),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["PIZZABOT_LOGGING_LEVEL", "PIZZABOT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["PIZZABOT_LOGGING_FORMAT", "PIZZABOT_LOG_FORMAT"],
        ),
    ]
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    ["pizzabot.toml", "config/pizzabot.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short recognizable prefix such as `sk-` or `gsk_`.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(|c: char| c == '-' || c == '_') {
        Some(index) if index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}
