//! In-prompt override directive.
//!
//! A last user message that starts with the `@big` token asks for
//! capacity-class routing and bypasses admission restrictions, the same as
//! `force_big: true` on the request.

use crate::api::types::ChatCompletionRequest;

pub const FORCE_DIRECTIVE: &str = "@big";

/// Split a leading `@big` token off `text`.
///
/// Returns whether the directive was present and the remaining text with
/// leading whitespace trimmed. `@bigger` is not a directive.
pub fn extract_force_directive(text: &str) -> (bool, String) {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix(FORCE_DIRECTIVE) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            (true, rest.trim_start().to_string())
        }
        _ => (false, text.to_string()),
    }
}

/// Strip the directive from the last user message in place.
///
/// Only the leading text is inspected and rewritten; any further content
/// parts are forwarded untouched. Returns true when the directive was present.
pub fn apply_force_directive(request: &mut ChatCompletionRequest) -> bool {
    let Some(idx) = request.last_user_index() else {
        return false;
    };
    let Some(text) = request.messages[idx].leading_text_mut() else {
        return false;
    };
    let (forced, rest) = extract_force_directive(text);
    if forced {
        *text = rest;
    }
    forced
}
