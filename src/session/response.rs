use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::session::error::ApiError;

/// Decoded 2xx body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        match self {
            ResponseBody::Json(value) => serde_json::from_value(value),
            ResponseBody::Text(text) => serde_json::from_str(&text),
        }
    }
}

/// JSON when the response declares it, raw text otherwise.
pub(crate) async fn decode_success(url: &Url, response: Response) -> Result<ResponseBody, ApiError> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let text = response.text().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })?;

    if !is_json {
        return Ok(ResponseBody::Text(text));
    }
    // e.g. 204 with a json content type
    if text.trim().is_empty() {
        return Ok(ResponseBody::Json(Value::Null));
    }
    serde_json::from_str(&text)
        .map(ResponseBody::Json)
        .map_err(|e| ApiError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
}
