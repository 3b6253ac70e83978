use std::collections::{BTreeMap, BTreeSet};

/// Identifies one test case: a recipe name and a test name within it (§3, §6).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestDescription {
    pub recipe_name: String,
    pub test_name: String,
}

impl TestDescription {
    pub fn new(recipe_name: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            test_name: test_name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.recipe_name, self.test_name)
    }
}

/// The first-populated-field selects the glyph/verbose message (§4.J); the
/// priority order is fixed and must be checked in this order, not declaration
/// order of a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestDiagnostic {
    InternalError(String),
    BadTest(String),
    CrashMismatch(String),
    Check(String),
    Diff(String),
    Removed,
    Written,
    Success,
}

impl TestDiagnostic {
    pub fn is_failure(&self) -> bool {
        !matches!(self, TestDiagnostic::Success | TestDiagnostic::Removed | TestDiagnostic::Written)
    }
}

/// Structured per-test message produced by a worker and drained by the
/// driver (§3, §4.I).
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub description: TestDescription,
    pub diagnostic: TestDiagnostic,
}

impl TestOutcome {
    pub fn new(description: TestDescription, diagnostic: TestDiagnostic) -> Self {
        Self { description, diagnostic }
    }
}

/// Per-worker accumulator of line-hit sets keyed by source file. Merged by
/// union across workers; union is commutative and idempotent (§8 invariant 5).
#[derive(Debug, Clone, Default)]
pub struct CoverageFragment {
    hits: BTreeMap<String, BTreeSet<u32>>,
}

impl CoverageFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self, file: impl Into<String>, line: u32) {
        self.hits.entry(file.into()).or_default().insert(line);
    }

    /// Union-merge `other` into `self`. Commutative and idempotent: merging
    /// the same fragment twice, or merging a then b vs b then a, yields the
    /// same resulting hit sets.
    pub fn merge(&mut self, other: &CoverageFragment) {
        for (file, lines) in &other.hits {
            self.hits.entry(file.clone()).or_default().extend(lines.iter().copied());
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.hits.keys()
    }

    pub fn hit_lines(&self, file: &str) -> Option<&BTreeSet<u32>> {
        self.hits.get(file)
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
