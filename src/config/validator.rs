//! Configuration validation with aggregated errors.
//! Every issue found is collected so one run reports all of them.

use http::HeaderName;
use reqwest::Url;
use tracing::error;

use crate::config::settings::{ApiConfig, NavigationConfig, StorageConfig, StorageStrategy};
use crate::config::ClientConfig;

pub fn validate_client_config(cfg: &ClientConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_api(&cfg.api, &mut errors);
    validate_storage(&cfg.storage, &mut errors);
    validate_navigation(&cfg.navigation, &mut errors);

    if let Some(logging) = &cfg.logging {
        if !matches!(
            logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(format!(
                "logging.level '{}' must be one of trace, debug, info, warn, error",
                logging.level
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    if api.base_url.trim().is_empty() {
        errors.push("api.base_url must not be empty".to_string());
    } else {
        match Url::parse(&api.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!(
                "api.base_url scheme '{}' is not supported, use http or https",
                url.scheme()
            )),
            Err(e) => errors.push(format!("api.base_url '{}' is invalid: {}", api.base_url, e)),
        }
    }

    if api.request_id_header.trim().is_empty() {
        errors.push("api.request_id_header must not be empty".to_string());
    } else if HeaderName::from_bytes(api.request_id_header.as_bytes()).is_err() {
        errors.push(format!(
            "api.request_id_header '{}' is not a valid header name",
            api.request_id_header
        ));
    }

    if api.timeout_ms == 0 {
        errors.push("api.timeout_ms must be greater than 0".to_string());
    }
}

fn validate_storage(storage: &StorageConfig, errors: &mut Vec<String>) {
    if storage.strategy == StorageStrategy::LocalPersistent && storage.refresh_path.is_none() {
        errors.push("storage.refresh_path is required when strategy is local_persistent".to_string());
    }
    if storage.strategy == StorageStrategy::CookiePreferred && storage.refresh_path.is_some() {
        errors.push(
            "storage.refresh_path is only allowed when strategy is local_persistent".to_string(),
        );
    }
}

fn validate_navigation(navigation: &NavigationConfig, errors: &mut Vec<String>) {
    if navigation.login_location.trim().is_empty() {
        errors.push("navigation.login_location must not be empty".to_string());
    }
    if navigation.forbidden_location.trim().is_empty() {
        errors.push("navigation.forbidden_location must not be empty".to_string());
    }
    if navigation.banned_code.trim().is_empty() {
        errors.push("navigation.banned_code must not be empty".to_string());
    }
}
