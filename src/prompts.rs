//! Prompt text for the two chat calls.
//!
//! All wording sent to the model lives here so it can be reviewed and tested
//! without a live endpoint. The prompts are Korean because the documents,
//! the legal context, and the readers of the report are.

/// System instruction for the figure-extraction call.
///
/// Constrains the reply to a bare JSON number so [`crate::pipeline::extract::parse_figure`]
/// can read it without interpretation.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "너는 문서에서 숫자 데이터만 정확히 뽑아내는 추출 전문가야. \
결과는 반드시 JSON 숫자 하나로만 답해. 쉼표, 단위, 설명, 코드 블록 없이 숫자만 출력해.";

/// User instruction for the figure-extraction call, embedding the whole
/// parsed document.
///
/// Every 채권최고액 entry must be summed, and a document without any entry
/// must produce `0` rather than prose.
pub fn extraction_user_prompt(parsed_text: &str) -> String {
    format!(
        "다음 등기부등본 마크다운 내용에서 '채권최고액' 항목을 모두 찾아 그 합계를 원 단위 숫자로만 출력해줘. \
채권최고액이 여러 건이면 첫 번째 값이 아니라 모든 값을 더한 합계를 출력하고, \
채권최고액이 하나도 없으면 0을 출력해.\n\n{parsed_text}"
    )
}

/// Single user prompt for the report-generation call.
///
/// The four numbered sections are mandatory: risk tier from a fixed set,
/// the (debt + deposit) / market price ratio, a legal explanation under
/// Korean law, and recommended special contract clauses.
pub fn report_prompt(market_price: u64, deposit: u64, debt_total: u64, excerpt: &str) -> String {
    format!(
        r#"당신은 부동산 전문 AI 에이전트 'SolarGuard'입니다.
제공된 데이터를 바탕으로 임차인을 위한 '전세 안심 보고서'를 작성하세요.

[데이터 정보]
- 매물 시세: {market_price}원
- 임차 전세금: {deposit}원
- 등기부상 선순위 채권(융자): {debt_total}원
- 원문 내용 요약: {excerpt}... (생략)

[보고서 필수 포함 항목]
1. 위험 등급: (안전 / 주의 / 위험) 중 택1
2. 부채 비율: (채권 + 전세금)이 시세의 몇 %인지 계산
3. 상세 분석: 왜 위험한지 또는 왜 안전한지 설명 (한국 법령 기준)
4. 추천 특약: 계약 시 반드시 넣어야 할 특약 문구 제안"#
    )
}
