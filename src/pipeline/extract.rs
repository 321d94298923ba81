//! Figure extraction: ask the chat model for the summed 채권최고액 and read
//! the reply as a non-negative integer.
//!
//! The reply is parsed strictly. Thousands separators, surrounding whitespace
//! and an outer code fence are tolerated; anything else (prose, units,
//! Korean numerals, signs, decimals) is an [`GuardError::Extraction`] rather
//! than a guessed or truncated value.

use crate::error::GuardError;
use crate::pipeline::chat::{ChatModel, Message};
use crate::prompts::{extraction_user_prompt, EXTRACTION_SYSTEM_PROMPT};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Build the two-message extraction request for `parsed_text`.
pub fn extraction_messages(parsed_text: &str) -> Vec<Message> {
    vec![
        Message::system(EXTRACTION_SYSTEM_PROMPT),
        Message::user(extraction_user_prompt(parsed_text)),
    ]
}

/// Return the total registered claim ceiling found in `parsed_text`, in KRW.
///
/// The full text is embedded in the prompt without a length cap.
pub async fn extract_debt_total(model: &dyn ChatModel, parsed_text: &str) -> Result<u64, GuardError> {
    debug!(
        "Extracting claim ceiling from {} chars via {}",
        parsed_text.chars().count(),
        model.name()
    );
    let reply = model.complete(&extraction_messages(parsed_text)).await?;
    let total = parse_figure(&reply)?;
    info!("Extracted claim ceiling total: {}", total);
    Ok(total)
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?\s*```$").unwrap());

/// Parse a model reply into a KRW amount.
///
/// ```rust
/// use solarguard::pipeline::extract::parse_figure;
///
/// assert_eq!(parse_figure(" 250,000,000\n").unwrap(), 250_000_000);
/// assert!(parse_figure("약 2억5천만원").is_err());
/// ```
pub fn parse_figure(reply: &str) -> Result<u64, GuardError> {
    let trimmed = reply.trim();
    let unfenced = match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    };
    let cleaned = unfenced.replace(',', "");
    let cleaned = cleaned.trim();

    // u64::from_str accepts a leading '+'; a bare figure never has one.
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GuardError::Extraction {
            reply: reply.to_string(),
        });
    }

    cleaned.parse::<u64>().map_err(|_| GuardError::Extraction {
        reply: reply.to_string(),
    })
}
