//! Parser for `tsc --pretty false` diagnostic output
//!
//! tsc prints one header line per diagnostic, either
//! `file(line,col): error TS2322: message` or `error TS5023: message`,
//! followed by indented continuation lines for chained causes (two spaces per
//! nesting level). Positions in the text are 1-based; parsed anchors are
//! 0-based like the compiler's own position metadata.
use crate::compiler::diagnostic::{Anchor, DiagnosticCategory, MessageChain, Phase, RawDiagnostic};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

fn anchored_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>.+)\((?P<line>\d+),(?P<col>\d+)\): (?P<cat>error|warning|suggestion|message) TS(?P<code>\d+): (?P<msg>.*)$",
        )
        .expect("anchored header pattern is valid")
    })
}

fn global_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<cat>error|warning|suggestion|message) TS(?P<code>\d+): (?P<msg>.*)$")
            .expect("global header pattern is valid")
    })
}

/// Emit-phase codes: declaration emit (TS4xxx) and unwritable output (TS5033)
fn phase_for_code(code: u32) -> Phase {
    match code {
        4000..=4999 | 5033 => Phase::Emit,
        _ => Phase::PreEmit,
    }
}

fn parse_header(line: &str) -> Option<RawDiagnostic> {
    if let Some(caps) = anchored_header().captures(line) {
        let line_no: u32 = caps["line"].parse().ok()?;
        let col_no: u32 = caps["col"].parse().ok()?;
        let code: u32 = caps["code"].parse().ok()?;
        return Some(RawDiagnostic {
            category: DiagnosticCategory::parse(&caps["cat"])?,
            code,
            phase: phase_for_code(code),
            anchor: Some(Anchor {
                file: PathBuf::from(&caps["file"]),
                line: line_no.saturating_sub(1),
                character: col_no.saturating_sub(1),
            }),
            message: MessageChain::new(&caps["msg"]),
        });
    }

    let caps = global_header().captures(line)?;
    let code: u32 = caps["code"].parse().ok()?;
    Some(RawDiagnostic {
        category: DiagnosticCategory::parse(&caps["cat"])?,
        code,
        phase: phase_for_code(code),
        anchor: None,
        message: MessageChain::new(&caps["msg"]),
    })
}

/// Parse every diagnostic in `output`, in the order tsc printed them.
pub fn parse_output(output: &str) -> Vec<RawDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut current: Option<RawDiagnostic> = None;

    for line in output.lines() {
        let line = line.trim_end_matches('\r');

        if let Some(diagnostic) = parse_header(line) {
            diagnostics.extend(current.replace(diagnostic));
            continue;
        }

        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent > 0 && !line.trim().is_empty() {
            if let Some(diagnostic) = current.as_mut() {
                let depth = (indent / 2).max(1);
                diagnostic.message.attach_at_depth(depth, line.trim_start_matches(' '));
                continue;
            }
        }

        diagnostics.extend(current.take());
        if !line.trim().is_empty() {
            log::trace!("Ignoring tsc output line: {}", line);
        }
    }

    diagnostics.extend(current);
    diagnostics
}
