//
//  response.rs
//  RouteLens
//
//  Pull the prediction JSON out of a model response.
//

use std::sync::OnceLock;

use regex::Regex;

use super::PredictedPayload;
use crate::error::{Result, RouteLensError};

fn brace_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").ok()).as_ref()
}

/// Drop a surrounding ```json ... ``` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag line.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the payload, falling back to the outermost `{...}` block when the
/// model wrapped its JSON in prose.
pub fn parse_prediction(raw: &str) -> Result<PredictedPayload> {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<PredictedPayload>(body) {
        Ok(payload) => Ok(payload),
        Err(direct) => {
            let block = brace_block()
                .and_then(|re| re.find(body))
                .ok_or_else(|| RouteLensError::Completion(format!("no JSON object in response: {direct}")))?;
            Ok(serde_json::from_str(block.as_str())?)
        }
    }
}
