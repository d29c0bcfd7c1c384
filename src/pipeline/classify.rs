//! Response classification for `POST /convert`.
//!
//! The backend reports plan problems as free-form French or English detail
//! messages, so the status code alone is not enough: a 403 is either a row
//! limit or an exhausted quota depending on the wording, and a "file too
//! large" message wins over whatever status it arrived with.
//!
//! ## Precedence
//!
//! 1. 401 → session expired
//! 2. 403 → row-limit pattern ? row limit : quota exhausted (`used/limit` parsed)
//! 3. 400, 413 or a too-large message → too large
//! 4. any other non-2xx → server error
//!
//! 2xx is not a failure. Transport failures never reach this module; the
//! workflow maps them to [`ConversionFailure::Unknown`] directly.

use crate::error::ConversionFailure;
use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the response header carrying `|`-delimited warnings.
pub const WARNINGS_HEADER: &str = "X-Report-Warnings";

const GENERIC_SERVER_ERROR: &str = "The server could not generate the presentation.";
const GENERIC_QUOTA_MESSAGE: &str = "Your monthly conversion quota is used up.";
const GENERIC_TOO_LARGE: &str = "The file is too large for the service.";

static RE_ROW_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\blignes?\b|\brows?\b|row[\s_-]?limit|d[ée]passe la limite|exceeds the limit)")
        .unwrap()
});

static RE_TOO_LARGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(trop volumineux|too large|taille maximale|file size|payload too large)")
        .unwrap()
});

static RE_USED_LIMIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").unwrap());

/// Does the detail describe a per-file row limit?
pub fn is_row_limit(detail: &str) -> bool {
    RE_ROW_LIMIT.is_match(detail)
}

/// Does the detail describe an oversized upload?
pub fn is_too_large(detail: &str) -> bool {
    RE_TOO_LARGE.is_match(detail)
}

/// Extract the first `used/limit` pair from a detail message.
///
/// `"Quota 7/10 atteint"` → `(Some(7), Some(10))`; no pair → `(None, None)`.
pub fn parse_usage_pair(detail: &str) -> (Option<u32>, Option<u32>) {
    RE_USED_LIMIT
        .captures(detail)
        .and_then(|caps| {
            let used = caps[1].parse().ok()?;
            let limit = caps[2].parse().ok()?;
            Some((Some(used), Some(limit)))
        })
        .unwrap_or((None, None))
}

/// Classify an HTTP status plus optional detail. `None` means success.
pub fn classify_response(status: u16, detail: Option<&str>) -> Option<ConversionFailure> {
    if (200..300).contains(&status) {
        return None;
    }
    let detail = detail.map(str::trim).filter(|d| !d.is_empty());

    let failure = match status {
        401 => ConversionFailure::SessionExpired,
        403 => match detail {
            Some(d) if is_row_limit(d) => ConversionFailure::RowLimitExceeded {
                message: d.to_string(),
            },
            _ => {
                let (used, limit) = detail.map(parse_usage_pair).unwrap_or((None, None));
                ConversionFailure::QuotaExhausted {
                    message: detail.unwrap_or(GENERIC_QUOTA_MESSAGE).to_string(),
                    used,
                    limit,
                }
            }
        },
        _ if status == 400 || status == 413 || detail.is_some_and(is_too_large) => {
            ConversionFailure::TooLarge {
                message: detail.unwrap_or(GENERIC_TOO_LARGE).to_string(),
            }
        }
        _ => ConversionFailure::ServerError {
            status,
            message: detail.unwrap_or(GENERIC_SERVER_ERROR).to_string(),
        },
    };
    Some(failure)
}

/// Split the warnings header on `|`, trimming and dropping empties.
pub fn parse_warnings(header: Option<&str>) -> Vec<String> {
    header
        .map(|raw| {
            raw.split('|')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a raw header value: UTF-8 first, Latin-1 otherwise.
pub fn decode_header(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

/// Pull the human-readable detail out of an error body.
///
/// FastAPI sends `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": ...}, ...]}` for validation errors. Non-JSON bodies
/// are returned as-is.
pub fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Some(body.to_string());
    };
    match value.get("detail") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        Some(other) => Some(other.to_string()),
        None => Some(body.to_string()),
    }
}
