use std::collections::BTreeMap;
use std::time::Duration;

/// An environment value: either an explicit string (possibly containing
/// `%(NAME)s` dictionary-style substitutions) or an explicit deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Set(String),
    Delete,
}

/// The immutable request to run a step (§3).
#[derive(Debug, Clone)]
pub struct StepConfig {
    /// Ordered path identifying the step within the parent hierarchy.
    pub name_tokens: Vec<String>,
    /// argv[0] possibly unresolved; never empty.
    pub argv: Vec<String>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, EnvValue>,
    pub env_prefixes: BTreeMap<String, Vec<String>>,
    pub env_suffixes: BTreeMap<String, Vec<String>>,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
    pub infra_step: bool,
    pub allow_subannotations: bool,
}

impl StepConfig {
    pub fn new(name_tokens: Vec<String>, argv: Vec<String>) -> Self {
        Self {
            name_tokens,
            argv,
            cwd: None,
            env: BTreeMap::new(),
            env_prefixes: BTreeMap::new(),
            env_suffixes: BTreeMap::new(),
            stdin: None,
            timeout: None,
            infra_step: false,
            allow_subannotations: false,
        }
    }

    /// Validates the invariants named in §3: argv non-empty, env values carry
    /// only dictionary-style substitutions, timeout strictly positive if set.
    pub fn validate(&self) -> Result<(), String> {
        if self.argv.is_empty() {
            return Err("argv must not be empty".into());
        }
        for (key, value) in &self.env {
            if let EnvValue::Set(s) = value {
                validate_no_sequential_percent_s(key, s)?;
            }
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err("timeout must be greater than zero".into());
            }
        }
        Ok(())
    }

    pub fn name(&self) -> String {
        self.name_tokens.join(".")
    }
}

/// Rejects sequential `%s`-style interpolation; only `%(NAME)s` dictionary
/// references are permitted (§3, §4.D). A bare `%s` or `%d` etc. is rejected;
/// `%%` (literal percent) and `%(name)s` are accepted.
fn validate_no_sequential_percent_s(key: &str, value: &str) -> Result<(), String> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1) {
                Some(b'%') => {
                    i += 2;
                    continue;
                }
                Some(b'(') => {
                    if let Some(close) = value[i..].find(")s") {
                        i += close + 2;
                        continue;
                    }
                    return Err(format!(
                        "env value for '{key}' has an unterminated %(NAME)s reference"
                    ));
                }
                _ => {
                    return Err(format!(
                        "env value for '{key}' uses sequential %s-style interpolation, only %(NAME)s is permitted"
                    ));
                }
            }
        }
        i += 1;
    }
    Ok(())
}

/// Post-step execution outcome (§3). A `None` retcode is only valid when the
/// step never ran (e.g. argv[0] failed to resolve) — success always carries
/// a concrete retcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub retcode: Option<i32>,
    pub had_timeout: bool,
    pub was_cancelled: bool,
}

impl ExecutionResult {
    pub fn success(retcode: i32) -> Self {
        Self {
            retcode: Some(retcode),
            had_timeout: false,
            was_cancelled: false,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            retcode: None,
            had_timeout: false,
            was_cancelled: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.retcode == Some(0)
    }
}

/// Mutable summary/log attachments a step can accumulate while it runs.
#[derive(Debug, Clone, Default)]
pub struct StepPresentation {
    pub status: PresentationStatus,
    pub step_text: String,
    pub step_summary_text: String,
    pub logs: BTreeMap<String, String>,
    pub links: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationStatus {
    #[default]
    Success,
    Failure,
    Exception,
}

/// Post-step record: the request, the result, and any nested child steps
/// opened underneath it (§3).
#[derive(Debug, Clone)]
pub struct StepData {
    pub config: StepConfig,
    pub result: ExecutionResult,
    pub presentation: StepPresentation,
    pub children: Vec<StepData>,
}

impl StepData {
    pub fn new(config: StepConfig, result: ExecutionResult) -> Self {
        Self {
            config,
            result,
            presentation: StepPresentation::default(),
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_argv() {
        let cfg = StepConfig::new(vec!["build".into()], vec![]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut cfg = StepConfig::new(vec!["build".into()], vec!["echo".into()]);
        cfg.timeout = Some(Duration::from_secs(0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_dictionary_style_substitution() {
        let mut cfg = StepConfig::new(vec!["build".into()], vec!["echo".into()]);
        cfg.env.insert("PATH".into(), EnvValue::Set("%(PATH)s:/extra".into()));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_sequential_percent_s() {
        let mut cfg = StepConfig::new(vec!["build".into()], vec!["echo".into()]);
        cfg.env.insert("MSG".into(), EnvValue::Set("hello %s".into()));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_literal_percent_escape() {
        let mut cfg = StepConfig::new(vec!["build".into()], vec!["echo".into()]);
        cfg.env.insert("MSG".into(), EnvValue::Set("100%% done".into()));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unresolved_result_has_no_retcode() {
        let result = ExecutionResult::unresolved();
        assert!(result.retcode.is_none());
        assert!(!result.is_success());
    }
}
