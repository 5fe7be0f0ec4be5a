use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::validator;
use crate::config::ClientConfig;

/// Load and validate config from YAML file
pub fn file_to_config(path: &Path) -> Result<ClientConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read config '{}': {}", path.display(), e))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ClientConfig> {
    let mut client_config: ClientConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    // Apply defaults
    if client_config.logging.is_none() {
        client_config.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }

    debug!("validating config ...");
    validator::validate_client_config(&client_config)
        .map_err(|errors| anyhow!("config is not valid: {}", errors.join("; ")))?;

    Ok(client_config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.into_owned())
}
