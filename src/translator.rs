//! Diagnostic translation
//!
//! Turns raw compiler diagnostics into the strings callers see.

use crate::compiler::diagnostic::{MessageChain, RawDiagnostic};

const NEW_LINE: &str = "\n";
const INDENT: &str = "  ";

/// Flatten a message chain: each nested cause goes on its own line, indented
/// two spaces per nesting level.
pub fn flatten_message(chain: &MessageChain) -> String {
    let mut out = String::new();
    flatten_into(chain, 0, &mut out);
    out
}

fn flatten_into(chain: &MessageChain, depth: usize, out: &mut String) {
    if depth > 0 {
        out.push_str(NEW_LINE);
        out.push_str(&INDENT.repeat(depth));
    }
    out.push_str(&chain.text);
    for cause in &chain.next {
        flatten_into(cause, depth + 1, out);
    }
}

/// Render one diagnostic, 1-based position prefix when anchored
pub fn translate(diagnostic: &RawDiagnostic) -> String {
    let message = flatten_message(&diagnostic.message);
    match &diagnostic.anchor {
        Some(anchor) => format!(
            "(on line {}, at position {}): {}",
            anchor.line + 1,
            anchor.character + 1,
            message
        ),
        None => message,
    }
}

pub fn translate_all(diagnostics: &[RawDiagnostic]) -> Vec<String> {
    diagnostics.iter().map(translate).collect()
}
