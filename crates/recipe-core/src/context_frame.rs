use crate::step::EnvValue;
use std::collections::BTreeMap;

/// The pushable record a Context Stack frame holds (§3, §4.D). Only
/// non-absent fields overlay the parent frame when pushed; the merge
/// semantics themselves live in `recipe-context`, which owns the stack.
#[derive(Debug, Clone, Default)]
pub struct ContextFrame {
    pub cwd: Option<String>,
    pub infra: Option<bool>,
    pub env: BTreeMap<String, EnvValue>,
    pub env_prefixes: BTreeMap<String, Vec<String>>,
    pub env_suffixes: BTreeMap<String, Vec<String>>,
}

impl ContextFrame {
    pub fn is_noop(&self) -> bool {
        self.cwd.is_none()
            && self.infra.is_none()
            && self.env.is_empty()
            && self.env_prefixes.is_empty()
            && self.env_suffixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_noop() {
        assert!(ContextFrame::default().is_noop());
    }

    #[test]
    fn frame_with_cwd_is_not_noop() {
        let frame = ContextFrame {
            cwd: Some("/tmp".into()),
            ..Default::default()
        };
        assert!(!frame.is_noop());
    }
}
