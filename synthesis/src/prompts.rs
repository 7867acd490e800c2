//! Prompt construction for synthesis and guardrail validation.
//!
//! Guideline excerpts are numbered and tagged with their heading path and
//! page. The excerpt budget counts characters of each entry; entries are
//! added whole and the first entry that would exceed the budget stops
//! the list.

use clinrag_search::{FusedResult, HighRiskAlert, Severity};

/// Format fused results as numbered excerpts within `max_chars`.
pub fn format_context(results: &[FusedResult], max_chars: usize) -> String {
    let mut entries: Vec<String> = Vec::new();
    let mut total = 0;

    for (idx, result) in results.iter().enumerate() {
        let candidate = &result.candidate;
        let page = match candidate.page {
            Some(page) if page > 0 => format!(" (p.{page})"),
            _ => String::new(),
        };
        let entry = format!(
            "[{}] {}{page}\n{}",
            idx + 1,
            candidate.heading_path(),
            candidate.content
        );

        let len = entry.chars().count();
        if total + len > max_chars {
            break;
        }
        total += len;
        entries.push(entry);
    }

    entries.join("\n\n")
}

/// Render alerts as danger and caution lines. Empty when there are none.
pub fn format_alerts(alerts: &[HighRiskAlert]) -> String {
    let join = |severity: Severity| {
        alerts
            .iter()
            .filter(|a| a.severity == severity)
            .map(|a| a.term.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = Vec::new();
    let high = join(Severity::High);
    if !high.is_empty() {
        lines.push(format!("DANGER SIGNS DETECTED: {high}"));
    }
    let medium = join(Severity::Medium);
    if !medium.is_empty() {
        lines.push(format!("Caution terms found: {medium}"));
    }
    lines.join("\n")
}

/// Build the grounded synthesis prompt.
pub fn synthesis_prompt(
    query: &str,
    results: &[FusedResult],
    alerts: &[HighRiskAlert],
    max_context_chars: usize,
) -> String {
    let context = format_context(results, max_context_chars);
    let alert_text = format_alerts(alerts);

    let alert_section = if alert_text.is_empty() {
        String::new()
    } else {
        format!(
            "\n⚠️ SAFETY ALERTS:\n{alert_text}\nYou MUST prominently address these safety concerns in your response.\n"
        )
    };

    format!(
        "You are a clinical decision support assistant for Community Health Workers (CHWs). \
Your role is to synthesize clinical guidelines into clear, actionable guidance.

CLINICAL GUIDELINE EXCERPTS:
{context}
{alert_section}
CHW QUESTION: {query}

INSTRUCTIONS:
1. Answer ONLY using information from the guideline excerpts above
2. Use simple, clear language appropriate for CHWs with basic medical training
3. Structure your response with clear sections when appropriate
4. Include specific dosages, age ranges, and treatment steps when available
5. If danger signs are mentioned, list them prominently at the top
6. If the guidelines do not contain enough information to answer, say so clearly
7. NEVER fabricate clinical information not present in the excerpts
8. Include relevant page references using [p.X] format

Provide a concise clinical summary (150-300 words):"
    )
}

/// Build the guardrail prompt asking for one verdict per criterion.
pub fn guardrail_prompt(
    query: &str,
    summary: &str,
    results: &[FusedResult],
    max_context_chars: usize,
) -> String {
    let context = format_context(results, max_context_chars);

    format!(
        "You are a clinical safety validator. Your job is to verify that a generated clinical \
summary is grounded in source guidelines and is safe for Community Health Workers.

SOURCE GUIDELINES:
{context}

QUESTION: {query}

GENERATED SUMMARY:
{summary}

VALIDATION CRITERIA:
1. GROUNDING: Every clinical claim in the summary must be supported by the source guidelines
2. ACCURACY: Dosages, age ranges, and treatment steps must exactly match the sources
3. COMPLETENESS: Critical safety information (danger signs, referral criteria) must not be omitted
4. NO FABRICATION: The summary must not contain clinical information absent from the sources
5. APPROPRIATE SCOPE: The summary should not recommend actions beyond CHW scope of practice

For each criterion, evaluate PASS or FAIL with a brief explanation.

Respond in this exact format:
GROUNDING: [PASS/FAIL] - [explanation]
ACCURACY: [PASS/FAIL] - [explanation]
COMPLETENESS: [PASS/FAIL] - [explanation]
NO_FABRICATION: [PASS/FAIL] - [explanation]
APPROPRIATE_SCOPE: [PASS/FAIL] - [explanation]

OVERALL: [PASS/FAIL]
REASON: [one sentence summary if FAIL]"
    )
}
