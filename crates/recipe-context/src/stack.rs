use parking_lot::Mutex;
use recipe_core::context_frame::ContextFrame;
use recipe_core::step::EnvValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextStackError {
    #[error("env value for '{key}' uses sequential %s-style interpolation, only %(NAME)s is permitted")]
    InvalidSubstitution { key: String },
}

/// The merged view observable by a step: the current top of the stack
/// flattened into concrete values (§3, §4.D).
#[derive(Debug, Clone, Default)]
pub struct ResolvedContext {
    pub cwd: Option<String>,
    pub infra: bool,
    pub env: BTreeMap<String, String>,
    pub env_prefixes: BTreeMap<String, Vec<String>>,
    pub env_suffixes: BTreeMap<String, Vec<String>>,
}

struct StackInner {
    frames: Vec<ResolvedContext>,
}

/// A non-empty sequence of merged contexts; only the top is observable by a
/// step. Pushing and popping are the only mutations, always in LIFO order
/// via `ScopedContext`'s `Drop` impl, so a scope's exit always restores the
/// prior top even when the caller unwinds through an error (§4.D, §8
/// invariant 3: push/pop is a pure stack).
#[derive(Clone)]
pub struct ContextStack {
    inner: Arc<Mutex<StackInner>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StackInner {
                frames: vec![ResolvedContext::default()],
            })),
        }
    }

    pub fn top(&self) -> ResolvedContext {
        self.inner.lock().frames.last().expect("stack never empty").clone()
    }

    /// Push `frame` onto the stack, merging it against the current top per
    /// the rules in §4.D. A no-op frame does not push (the returned guard
    /// still pops correctly, as a no-op push/pop pair).
    pub fn push(&self, frame: ContextFrame) -> Result<ScopedContext, ContextStackError> {
        if frame.is_noop() {
            let depth = self.inner.lock().frames.len();
            return Ok(ScopedContext {
                stack: self.clone(),
                pushed: false,
                depth_at_push: depth,
            });
        }

        let merged = {
            let mut inner = self.inner.lock();
            let parent = inner.frames.last().expect("stack never empty").clone();
            let merged = Self::merge(&parent, &frame)?;
            inner.frames.push(merged.clone());
            merged
        };
        let _ = merged;

        let depth = self.inner.lock().frames.len();
        Ok(ScopedContext {
            stack: self.clone(),
            pushed: true,
            depth_at_push: depth,
        })
    }

    fn merge(parent: &ResolvedContext, frame: &ContextFrame) -> Result<ResolvedContext, ContextStackError> {
        let mut merged = parent.clone();

        if let Some(cwd) = &frame.cwd {
            merged.cwd = Some(cwd.clone());
        }
        if let Some(infra) = frame.infra {
            merged.infra = infra;
        }

        // env_prefixes: new entries PREPEND to the existing tuple.
        for (key, values) in &frame.env_prefixes {
            let existing = merged.env_prefixes.entry(key.clone()).or_default();
            let mut combined = values.clone();
            combined.extend(existing.drain(..));
            *existing = combined;
        }

        // env_suffixes: new entries APPEND to the existing tuple.
        for (key, values) in &frame.env_suffixes {
            merged.env_suffixes.entry(key.clone()).or_default().extend(values.clone());
        }

        // env: deletions and substitutions, validated at push time.
        // A key that is both deleted (None) and given a prefix in this same
        // push resolves as "prefix wins, deletion suppressed" (§4.D, §9).
        for (key, value) in &frame.env {
            match value {
                EnvValue::Delete => {
                    if frame.env_prefixes.contains_key(key) {
                        merged.env.entry(key.clone()).or_insert_with(String::new);
                    } else {
                        merged.env.remove(key);
                    }
                }
                EnvValue::Set(raw) => {
                    let expanded = expand_substitutions(raw, &parent.env)
                        .map_err(|_| ContextStackError::InvalidSubstitution { key: key.clone() })?;
                    merged.env.insert(key.clone(), expanded);
                }
            }
        }

        Ok(merged)
    }

    fn pop_to(&self, depth_at_push: usize) {
        let mut inner = self.inner.lock();
        if inner.frames.len() >= depth_at_push {
            inner.frames.truncate(depth_at_push - 1);
        }
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by `ContextStack::push`. Pops its frame on drop,
/// guaranteeing release on every exit path including an unwind.
pub struct ScopedContext {
    stack: ContextStack,
    pushed: bool,
    depth_at_push: usize,
}

impl Drop for ScopedContext {
    fn drop(&mut self) {
        if self.pushed {
            self.stack.pop_to(self.depth_at_push);
        }
    }
}

/// Expand `%(NAME)s` references against `base`, using empty string for
/// missing keys. `%%` is a literal percent. Sequential `%s` is rejected.
fn expand_substitutions(raw: &str, base: &BTreeMap<String, String>) -> Result<String, ()> {
    let mut out = String::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1) {
                Some(b'%') => {
                    out.push('%');
                    i += 2;
                }
                Some(b'(') => {
                    let rest = &raw[i..];
                    let close = rest.find(")s").ok_or(())?;
                    let name = &rest[2..close];
                    out.push_str(base.get(name).map(String::as_str).unwrap_or(""));
                    i += close + 2;
                }
                _ => return Err(()),
            }
        } else {
            out.push(raw.as_bytes()[i] as char);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_a_pure_stack() {
        let stack = ContextStack::new();
        let before = stack.top();
        {
            let mut frame = ContextFrame::default();
            frame.cwd = Some("/work".into());
            let _scope = stack.push(frame).unwrap();
            assert_eq!(stack.top().cwd, Some("/work".into()));
        }
        assert_eq!(stack.top().cwd, before.cwd);
    }

    #[test]
    fn cwd_replaces() {
        let stack = ContextStack::new();
        let mut outer = ContextFrame::default();
        outer.cwd = Some("/a".into());
        let _outer_scope = stack.push(outer).unwrap();

        let mut inner = ContextFrame::default();
        inner.cwd = Some("/b".into());
        let _inner_scope = stack.push(inner).unwrap();

        assert_eq!(stack.top().cwd, Some("/b".into()));
    }

    #[test]
    fn env_prefixes_prepend_new_entries_first() {
        let stack = ContextStack::new();
        let mut outer = ContextFrame::default();
        outer.env_prefixes.insert("PATH".into(), vec!["/outer".into()]);
        let _outer_scope = stack.push(outer).unwrap();

        let mut inner = ContextFrame::default();
        inner.env_prefixes.insert("PATH".into(), vec!["/inner".into()]);
        let _inner_scope = stack.push(inner).unwrap();

        assert_eq!(
            stack.top().env_prefixes.get("PATH").unwrap(),
            &vec!["/inner".to_string(), "/outer".to_string()]
        );
    }

    #[test]
    fn env_suffixes_append_new_entries_last() {
        let stack = ContextStack::new();
        let mut outer = ContextFrame::default();
        outer.env_suffixes.insert("PATH".into(), vec!["/outer".into()]);
        let _outer_scope = stack.push(outer).unwrap();

        let mut inner = ContextFrame::default();
        inner.env_suffixes.insert("PATH".into(), vec!["/inner".into()]);
        let _inner_scope = stack.push(inner).unwrap();

        assert_eq!(
            stack.top().env_suffixes.get("PATH").unwrap(),
            &vec!["/outer".to_string(), "/inner".to_string()]
        );
    }

    #[test]
    fn empty_frame_does_not_push() {
        let stack = ContextStack::new();
        let _scope = stack.push(ContextFrame::default()).unwrap();
        // still observable as a single-frame stack: popping twice would be a bug,
        // verified implicitly by Drop not underflowing.
        assert!(stack.top().cwd.is_none());
    }

    #[test]
    fn substitution_expands_with_empty_default_for_missing_keys() {
        let stack = ContextStack::new();
        let mut frame = ContextFrame::default();
        frame.env.insert("GREETING".into(), EnvValue::Set("hello %(NAME)s".into()));
        let _scope = stack.push(frame).unwrap();
        assert_eq!(stack.top().env.get("GREETING").unwrap(), "hello ");
    }

    #[test]
    fn deletion_without_prefix_removes_key() {
        let stack = ContextStack::new();
        let mut outer = ContextFrame::default();
        outer.env.insert("SECRET".into(), EnvValue::Set("x".into()));
        let _outer_scope = stack.push(outer).unwrap();

        let mut inner = ContextFrame::default();
        inner.env.insert("SECRET".into(), EnvValue::Delete);
        let _inner_scope = stack.push(inner).unwrap();

        assert!(stack.top().env.get("SECRET").is_none());
    }

    #[test]
    fn deletion_with_same_key_prefix_is_suppressed_prefix_wins() {
        let stack = ContextStack::new();
        let mut frame = ContextFrame::default();
        frame.env.insert("PATH".into(), EnvValue::Delete);
        frame.env_prefixes.insert("PATH".into(), vec!["/new".into()]);
        let _scope = stack.push(frame).unwrap();

        // base value observed as empty string (not absent), and the prefix
        // is still recorded for spawn-time env construction (§4.D, §9).
        assert_eq!(stack.top().env.get("PATH").unwrap(), "");
        assert_eq!(stack.top().env_prefixes.get("PATH").unwrap(), &vec!["/new".to_string()]);
    }

    #[test]
    fn rejects_sequential_percent_s_at_push_time() {
        let stack = ContextStack::new();
        let mut frame = ContextFrame::default();
        frame.env.insert("MSG".into(), EnvValue::Set("hi %s".into()));
        assert!(stack.push(frame).is_err());
    }
}
