//! Report generation: turn the figures into the four-part 전세 안심 보고서.
//!
//! The model writes the report; this module only assembles the prompt and
//! accepts whatever text comes back. [`PropertyTerms`] guards the one input
//! the model cannot handle, a zero market price, before any call is made.

use crate::error::GuardError;
use crate::pipeline::chat::{ChatModel, Message};
use crate::prompts::report_prompt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// The caller's side of the deal, in KRW.
///
/// Deserialisation goes through [`PropertyTerms::new`], so a zero market
/// price is rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTerms")]
pub struct PropertyTerms {
    market_price: u64,
    deposit: u64,
}

#[derive(Deserialize)]
struct RawTerms {
    market_price: u64,
    deposit: u64,
}

impl TryFrom<RawTerms> for PropertyTerms {
    type Error = GuardError;

    fn try_from(raw: RawTerms) -> Result<Self, Self::Error> {
        PropertyTerms::new(raw.market_price, raw.deposit)
    }
}

impl PropertyTerms {
    /// Fails with [`GuardError::Validation`] when `market_price` is zero.
    pub fn new(market_price: u64, deposit: u64) -> Result<Self, GuardError> {
        if market_price == 0 {
            return Err(GuardError::Validation(
                "market price must be greater than zero".into(),
            ));
        }
        Ok(Self {
            market_price,
            deposit,
        })
    }

    pub fn market_price(&self) -> u64 {
        self.market_price
    }

    pub fn deposit(&self) -> u64 {
        self.deposit
    }

    /// `(debt + deposit) / market price` as a percentage.
    pub fn debt_ratio_percent(&self, debt_total: u64) -> f64 {
        let exposure = debt_total as u128 + self.deposit as u128;
        exposure as f64 * 100.0 / self.market_price as f64
    }
}

/// First `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, so Korean text is never split mid-character.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the single-message report request.
pub fn report_messages(terms: &PropertyTerms, debt_total: u64, excerpt: &str) -> Vec<Message> {
    vec![Message::user(report_prompt(
        terms.market_price,
        terms.deposit,
        debt_total,
        excerpt,
    ))]
}

/// Ask the model for the narrative report. Any reply text is accepted.
pub async fn generate_report(
    model: &dyn ChatModel,
    terms: &PropertyTerms,
    debt_total: u64,
    excerpt: &str,
) -> Result<String, GuardError> {
    let narrative = model
        .complete(&report_messages(terms, debt_total, excerpt))
        .await?;
    info!("Report generated: {} chars", narrative.chars().count());
    Ok(narrative)
}

/// The fixed three-value risk classification the report must state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    /// 안전
    Safe,
    /// 주의
    Caution,
    /// 위험
    Risk,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Safe => "안전",
            RiskTier::Caution => "주의",
            RiskTier::Risk => "위험",
        }
    }

    /// Best-effort read of the tier the model stated in its report.
    ///
    /// Only the "위험 등급" heading line is considered, with any parenthesised
    /// option list removed. The tier is the label right after the heading's
    /// separator, or else the one following a later "등급은" in the same line.
    /// Failing both, the line must name exactly one tier. Returns `None` when
    /// the report does not follow the requested layout or is ambiguous.
    pub fn from_narrative(narrative: &str) -> Option<Self> {
        let heading = RE_TIER_HEADING.find(narrative)?;
        let line = narrative[heading.end()..].lines().next().unwrap_or("");
        let line = RE_PARENTHESISED.replace_all(line, " ");

        if let Some(caps) = RE_LEADING_TIER.captures(&line) {
            // "안전 / 주의 / 위험" echoed back is a list, not an answer.
            if caps.get(2).is_some() {
                return None;
            }
            return Self::from_label(&caps[1]);
        }
        if let Some(caps) = RE_NAMED_TIER.captures(&line) {
            return Self::from_label(&caps[1]);
        }

        let mut named = RE_TIER_WORD
            .find_iter(&line)
            .filter_map(|m| Self::from_label(m.as_str()));
        let first = named.next()?;
        if named.all(|t| t == first) {
            Some(first)
        } else {
            None
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "안전" => Some(RiskTier::Safe),
            "주의" => Some(RiskTier::Caution),
            "위험" => Some(RiskTier::Risk),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static RE_TIER_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"위험\s*등급").unwrap());

static RE_PARENTHESISED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)\n]*\)|（[^）\n]*）").unwrap());

/// Tier label directly after the heading's separator; group 2 marks a list.
static RE_LEADING_TIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s*:：\-–_]*(안전|주의|위험)\**\s*([/|,·]|또는)?").unwrap()
});

static RE_NAMED_TIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"등급\s*(?:은|는|이|:)\s*\**\s*(안전|주의|위험)").unwrap());

static RE_TIER_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"안전|주의|위험").unwrap());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn zero_market_price_rejected() {
        let err = PropertyTerms::new(0, 350_000_000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn zero_deposit_allowed() {
        assert!(PropertyTerms::new(500_000_000, 0).is_ok());
    }

    #[test]
    fn ratio_for_reference_scenario() {
        let terms = PropertyTerms::new(500_000_000, 350_000_000).unwrap();
        let ratio = terms.debt_ratio_percent(250_000_000);
        assert!((ratio - 120.0).abs() < 1e-9, "got {ratio}");
    }

    #[test]
    fn ratio_does_not_overflow() {
        let terms = PropertyTerms::new(u64::MAX, u64::MAX).unwrap();
        let ratio = terms.debt_ratio_percent(u64::MAX);
        assert!((ratio - 200.0).abs() < 1e-6, "got {ratio}");
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let text = "갑구".repeat(300);
        let ex = excerpt(&text, 500);
        assert_eq!(ex.chars().count(), 500);
        assert!(text.starts_with(ex));
    }

    #[test]
    fn excerpt_of_short_text_is_whole_text() {
        assert_eq!(excerpt("짧은 글", 500), "짧은 글");
        assert_eq!(excerpt("", 500), "");
    }

    #[test]
    fn report_request_is_one_user_message() {
        use crate::pipeline::chat::Role;
        let terms = PropertyTerms::new(500_000_000, 350_000_000).unwrap();
        let msgs = report_messages(&terms, 250_000_000, "요약");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::User);
        assert!(msgs[0].content.contains("250000000원"));
    }

    #[test]
    fn tier_read_from_heading_line() {
        let report = "## 전세 안심 보고서\n1. 위험 등급: **위험**\n2. 부채 비율: 120%";
        assert_eq!(RiskTier::from_narrative(report), Some(RiskTier::Risk));

        let report = "1. 위험 등급 - 주의 (안전하지 않음)";
        assert_eq!(RiskTier::from_narrative(report), Some(RiskTier::Caution));

        let report = "**위험 등급:** 안전";
        assert_eq!(RiskTier::from_narrative(report), Some(RiskTier::Safe));
    }

    #[test]
    fn tier_skips_echoed_option_list() {
        let report = "1. 위험 등급: (안전 / 주의 / 위험) 중 위험";
        assert_eq!(RiskTier::from_narrative(report), Some(RiskTier::Risk));

        let report = "1. 위험 등급: 안전 / 주의 / 위험";
        assert_eq!(RiskTier::from_narrative(report), None);
    }

    #[test]
    fn tier_read_from_prose_after_heading() {
        let report = "1. **위험 등급**: 이 매물은 안전하다고 보기 어렵습니다. 등급은 위험입니다.";
        assert_eq!(RiskTier::from_narrative(report), Some(RiskTier::Risk));

        let report = "1. 위험 등급: 전체적으로 주의가 필요합니다.";
        assert_eq!(RiskTier::from_narrative(report), Some(RiskTier::Caution));
    }

    #[test]
    fn tier_absent_when_line_is_ambiguous() {
        let report = "1. 위험 등급: 보증금은 안전하지만 선순위 채권은 위험합니다.";
        assert_eq!(RiskTier::from_narrative(report), None);
    }

    #[test]
    fn terms_deserialise_through_validation() {
        let terms: PropertyTerms =
            serde_json::from_str(r#"{"market_price":500000000,"deposit":350000000}"#).unwrap();
        assert_eq!(terms.market_price(), 500_000_000);

        let err = serde_json::from_str::<PropertyTerms>(
            r#"{"market_price":0,"deposit":350000000}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("market price must be greater than zero"));

        let raw = RawTerms {
            market_price: 0,
            deposit: 350_000_000,
        };
        let err = PropertyTerms::try_from(raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn tier_absent_when_layout_ignored() {
        assert_eq!(RiskTier::from_narrative("이 매물은 괜찮아 보입니다."), None);
        assert_eq!(RiskTier::from_narrative("위험 등급:\n안전"), None);
    }
}
