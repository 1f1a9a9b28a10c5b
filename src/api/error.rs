use std::collections::BTreeMap;

/// Errors from the listings backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never got an HTTP answer (DNS, TLS, timeout, reset).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// 401 with no way to refresh, e.g. before logging in.
    #[error("not authenticated")]
    Unauthorized,

    /// The refresh token was rejected; the user has to log in again.
    #[error("session expired, log in again")]
    SessionExpired,

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other 4xx, typically with per-field messages.
    #[error("request rejected ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    /// 5xx or an unexpected status.
    #[error("backend error ({status}): {body}")]
    Server { status: u16, body: String },

    /// A 2xx body that does not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL cannot be turned into a request URL.
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    /// A 2xx body that decoded but lacks the field we asked for.
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err)
    }
}

impl ApiError {
    /// Whether the caller has to send the user back to the login step.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::SessionExpired)
    }

    /// Build an error from a non-success status and its raw body.
    pub fn from_status(status: u16, path: &str, body: String) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(path.to_string()),
            400..=499 => {
                let fields = parse_field_errors(&body);
                let message = if fields.is_empty() {
                    body
                } else {
                    fields
                        .iter()
                        .map(|(field, errors)| format!("{field}: {}", errors.join(" ")))
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                ApiError::Validation {
                    status,
                    message,
                    fields,
                }
            }
            _ => ApiError::Server { status, body },
        }
    }
}

// Field error bodies look like {"email": ["already taken"], "detail": "..."}.
fn parse_field_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
        return BTreeMap::new();
    };

    map.into_iter()
        .filter_map(|(field, value)| {
            let messages = match value {
                serde_json::Value::String(s) => vec![s],
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => return None,
            };
            (!messages.is_empty()).then_some((field, messages))
        })
        .collect()
}
