use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity the compiler attached to a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Suggestion,
    Message,
}

impl DiagnosticCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "suggestion" => Some(Self::Suggestion),
            "message" => Some(Self::Message),
            _ => None,
        }
    }
}

/// Compiler phase a diagnostic came from. Pre-emit sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    PreEmit,
    Emit,
}

/// Position of a diagnostic inside a source file, 0-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub file: PathBuf,
    pub line: u32,
    pub character: u32,
}

/// Diagnostic text with its nested causes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageChain {
    pub text: String,
    pub next: Vec<MessageChain>,
}

impl MessageChain {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            next: Vec::new(),
        }
    }

    pub fn with_cause(mut self, cause: MessageChain) -> Self {
        self.next.push(cause);
        self
    }

    /// Attach `text` as a cause `depth` levels below this node, under the
    /// most recently attached branch. Missing levels collapse upward.
    pub fn attach_at_depth(&mut self, depth: usize, text: impl Into<String>) {
        let mut node = self;
        for _ in 1..depth {
            if node.next.is_empty() {
                break;
            }
            let last = node.next.len() - 1;
            node = &mut node.next[last];
        }
        node.next.push(MessageChain::new(text));
    }
}

/// One compiler-reported issue, as the compiler binding produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDiagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub phase: Phase,
    /// `None` for file-less diagnostics such as option errors
    pub anchor: Option<Anchor>,
    pub message: MessageChain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_at_depth_builds_tree() {
        let mut chain = MessageChain::new("root");
        chain.attach_at_depth(1, "a");
        chain.attach_at_depth(2, "a.1");
        chain.attach_at_depth(1, "b");

        assert_eq!(chain.next.len(), 2);
        assert_eq!(chain.next[0].next, vec![MessageChain::new("a.1")]);
        assert!(chain.next[1].next.is_empty());
    }

    #[test]
    fn test_attach_too_deep_collapses() {
        let mut chain = MessageChain::new("root");
        chain.attach_at_depth(3, "orphan");
        assert_eq!(chain.next, vec![MessageChain::new("orphan")]);
    }

    #[test]
    fn test_pre_emit_orders_before_emit() {
        assert!(Phase::PreEmit < Phase::Emit);
    }
}
