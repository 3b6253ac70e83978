//! Shell-glob filter patterns, translated into compiled regexes (§4.I,
//! mirroring the original's `fnmatch.translate`). A filter `foo.bar`
//! matches test `bar` in recipe `foo`; the recipe-filter is everything
//! before the first `.`, the test-filter is the whole pattern. An empty
//! filter list matches everything.

use regex::Regex;

pub struct FilterMatchers {
    recipe_filter: Regex,
    test_filter: Regex,
    unfiltered: bool,
}

impl FilterMatchers {
    pub fn from_patterns(patterns: &[String]) -> Result<Self, regex::Error> {
        if patterns.is_empty() {
            return Ok(Self {
                recipe_filter: Regex::new(".*")?,
                test_filter: Regex::new(".*")?,
                unfiltered: true,
            });
        }

        let recipe_parts: Vec<String> = patterns
            .iter()
            .map(|p| glob_to_regex(p.split('.').next().unwrap_or(p)))
            .collect();
        let test_parts: Vec<String> = patterns.iter().map(|p| glob_to_regex(p)).collect();

        Ok(Self {
            recipe_filter: Regex::new(&format!("^(?:{})$", recipe_parts.join("|")))?,
            test_filter: Regex::new(&format!("^(?:{})$", test_parts.join("|")))?,
            unfiltered: false,
        })
    }

    pub fn matches_recipe(&self, recipe_name: &str) -> bool {
        self.recipe_filter.is_match(recipe_name)
    }

    pub fn matches_test(&self, full_test_name: &str) -> bool {
        self.test_filter.is_match(full_test_name)
    }

    /// True when no filter patterns were given, i.e. this run covers every
    /// test — the only case in which the coverage gate and unused-
    /// expectation-file cleanup are meaningful (§4.I).
    pub fn is_unfiltered(&self) -> bool {
        self.unfiltered
    }
}

/// Translates a shell glob (`*`, `?`, `[...]`) into an anchorless regex
/// fragment, the same shape `fnmatch.translate` produces.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '[' => {
                out.push('[');
                while let Some(&next) = chars.peek() {
                    out.push(next);
                    chars.next();
                    if next == ']' {
                        break;
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}
