use procdesign::core::models::design::{DEFAULT_PROPERTY_METHOD, ProcessDesign};
use procdesign::core::models::material::feed_stream_id;
use procdesign::engine::proposer::{ProposalError, ProposalRequest};
use std::fmt::Write;

/// Previous iterations listed in the user prompt. Older ones are summarized by count.
const HISTORY_WINDOW: usize = 5;

pub fn system_prompt() -> String {
    format!(
        "\
You are a chemical process design engineer. Given raw materials and product specifications, \
you propose a steady-state flowsheet that a process simulator can run.

Reply with a single JSON object and nothing else:
{{
  \"rationale\": \"one or two sentences\",
  \"property_method\": \"{method}\",
  \"units\": [
    {{\"id\": \"R1\", \"type\": \"RStoic\", \"parameters\": {{\"temperature\": 350.0}}}}
  ],
  \"connections\": [
    {{\"stream\": \"{feed}\", \"destination\": \"R1\"}},
    {{\"stream\": \"S1\", \"source\": \"R1\", \"destination\": \"F1\"}},
    {{\"stream\": \"PRODUCT\", \"source\": \"F1\"}}
  ]
}}

Rules:
- Block types are simulator block names such as RStoic, RGibbs, Flash2, RadFrac, Heater, Mixer, FSplit, Pump.
- Raw material i (counting from 1, in the order given) enters through stream FEED_i. Feed streams have no source.
- A stream with no destination leaves the process. Every unit needs at least one inlet and one outlet.
- Temperatures are in K and pressures in Pa.
- If property_method is omitted, {method} is used.",
        method = DEFAULT_PROPERTY_METHOD,
        feed = feed_stream_id(0),
    )
}

pub fn user_prompt(request: &ProposalRequest<'_>) -> String {
    let mut text = String::new();

    let _ = writeln!(text, "Raw materials:");
    for (index, material) in request.materials.iter().enumerate() {
        let _ = writeln!(
            text,
            "- {}: {}",
            feed_stream_id(index),
            material.describe()
        );
    }

    let _ = writeln!(text, "\nProduct specifications:");
    for spec in request.specifications {
        let _ = writeln!(text, "- {}", spec.describe());
    }

    let records = request.history.records();
    if !records.is_empty() {
        let _ = writeln!(text, "\nPrevious attempts:");
        let skipped = records.len().saturating_sub(HISTORY_WINDOW);
        if skipped > 0 {
            let _ = writeln!(text, "- ({} earlier attempt(s) omitted)", skipped);
        }
        for record in &records[skipped..] {
            let design = record
                .design
                .as_ref()
                .map(ProcessDesign::summary)
                .unwrap_or_else(|| "no design".to_string());
            let _ = writeln!(
                text,
                "- Iteration {}: {} ({})",
                record.iteration, record.verdict.outcome, design
            );
        }
    }

    if let Some(feedback) = request.feedback {
        let _ = writeln!(text, "\nFeedback on the latest attempt:\n{}", feedback.render());
    }

    let _ = write!(
        text,
        "\nPropose design number {} as a single JSON object.",
        request.iteration
    );
    text
}

/// Reads a design out of a model reply. Markdown code fences and surrounding prose are tolerated.
pub fn parse_design(content: &str) -> Result<ProcessDesign, ProposalError> {
    let body = strip_code_fence(content.trim());
    let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
        return Err(ProposalError::Malformed(
            "reply does not contain a JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(ProposalError::Malformed(
            "reply does not contain a JSON object".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(&body[start..=end])
        .map_err(|e| ProposalError::Malformed(format!("reply is not valid JSON: {}", e)))?;
    if value.get("units").is_none() {
        return Err(ProposalError::Malformed(
            "reply JSON has no \"units\" array".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| ProposalError::Malformed(format!("reply does not match the design schema: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip the info string (`json`) on the opening fence line.
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}
