//! Shared HTTP error mapping for the parse and chat services.

use crate::error::GuardError;
use reqwest::{Response, StatusCode};

/// Longest slice of an error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Map a reqwest transport failure to a network-class error.
pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> GuardError {
    GuardError::Network {
        service: service.to_string(),
        detail: err.to_string(),
    }
}

/// Pass successful responses through; turn everything else into an error.
///
/// 401 and 403 mean the bearer credential was rejected. Any other non-2xx
/// status is the service reporting an error payload.
pub(crate) async fn check_status(service: &str, response: Response) -> Result<Response, GuardError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = truncate(body.trim(), MAX_ERROR_BODY_CHARS);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GuardError::Auth {
            service: service.to_string(),
            status: status.as_u16(),
            detail,
        });
    }

    Err(GuardError::Model {
        service: service.to_string(),
        detail: format!("HTTP {status}: {detail}"),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}
