use recipe_core::step::EnvValue;
use std::collections::BTreeMap;

/// Builds the literal env block passed to a spawned child (§4.A):
/// start from `base` (the parent env), apply deletions, apply
/// `%(NAME)s` substitutions against the pre-substitution base, then
/// prepend `env_prefixes` and append `env_suffixes` joined by the OS
/// path separator. A key with prefixes but an empty explicit value does
/// not gain a trailing separator-joined empty component.
pub fn build_env(
    base: &BTreeMap<String, String>,
    env: &BTreeMap<String, EnvValue>,
    env_prefixes: &BTreeMap<String, Vec<String>>,
    env_suffixes: &BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, String>, String> {
    let mut result = base.clone();

    for (key, value) in env {
        match value {
            EnvValue::Delete => {
                result.remove(key);
            }
            EnvValue::Set(raw) => {
                let expanded = expand(raw, base)?;
                result.insert(key.clone(), expanded);
            }
        }
    }

    let sep = path_separator();

    for (key, prefixes) in env_prefixes {
        if prefixes.is_empty() {
            continue;
        }
        let existing = result.get(key).cloned().unwrap_or_default();
        result.insert(key.clone(), join_with_base(prefixes, &existing, sep, true));
    }

    for (key, suffixes) in env_suffixes {
        if suffixes.is_empty() {
            continue;
        }
        let existing = result.get(key).cloned().unwrap_or_default();
        result.insert(key.clone(), join_with_base(suffixes, &existing, sep, false));
    }

    Ok(result)
}

/// Joins `parts` with `existing`, prefix-side (`parts` first) or
/// suffix-side (`existing` first). An empty `existing` contributes no
/// trailing/leading separator-joined empty component.
fn join_with_base(parts: &[String], existing: &str, sep: char, prefix: bool) -> String {
    let mut components: Vec<&str> = parts.iter().map(String::as_str).collect();
    if prefix {
        if !existing.is_empty() {
            components.push(existing);
        }
    } else if !existing.is_empty() {
        components.insert(0, existing);
    }
    components.join(&sep.to_string())
}

fn path_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

fn expand(raw: &str, base: &BTreeMap<String, String>) -> Result<String, String> {
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
                    let close = rest
                        .find(")s")
                        .ok_or_else(|| format!("unterminated %(NAME)s reference in '{raw}'"))?;
                    let name = &rest[2..close];
                    out.push_str(base.get(name).map(String::as_str).unwrap_or(""));
                    i += close + 2;
                }
                _ => return Err(format!("sequential %s-style interpolation not permitted in '{raw}'")),
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert("PATH".into(), "/usr/bin".into());
        m.insert("HOME".into(), "/home/ci".into());
        m
    }

    #[test]
    fn deletion_removes_key() {
        let mut env = BTreeMap::new();
        env.insert("HOME".into(), EnvValue::Delete);
        let result = build_env(&base(), &env, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert!(!result.contains_key("HOME"));
    }

    #[test]
    fn substitution_expands_against_parent_env() {
        let mut env = BTreeMap::new();
        env.insert("GREETING".into(), EnvValue::Set("hi from %(HOME)s".into()));
        let result = build_env(&base(), &env, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert_eq!(result.get("GREETING").unwrap(), "hi from /home/ci");
    }

    #[test]
    fn prefixes_prepend_joined_by_os_separator() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("PATH".into(), vec!["/extra/bin".into()]);
        let result = build_env(&base(), &BTreeMap::new(), &prefixes, &BTreeMap::new()).unwrap();
        let sep = path_separator();
        assert_eq!(result.get("PATH").unwrap(), &format!("/extra/bin{sep}/usr/bin"));
    }

    #[test]
    fn empty_explicit_value_with_prefixes_has_no_trailing_empty_component() {
        let mut env = BTreeMap::new();
        env.insert("EXTRA".into(), EnvValue::Set(String::new()));
        let mut prefixes = BTreeMap::new();
        prefixes.insert("EXTRA".into(), vec!["/a".into(), "/b".into()]);
        let result = build_env(&base(), &env, &prefixes, &BTreeMap::new()).unwrap();
        let sep = path_separator();
        assert_eq!(result.get("EXTRA").unwrap(), &format!("/a{sep}/b"));
    }

    #[test]
    fn rejects_sequential_percent_s() {
        let mut env = BTreeMap::new();
        env.insert("MSG".into(), EnvValue::Set("hi %s".into()));
        assert!(build_env(&base(), &env, &BTreeMap::new(), &BTreeMap::new()).is_err());
    }
}
