//! Coverage aggregation and the all-or-nothing coverage gate (§4.I, §8
//! invariant 5). Workers each accumulate a `CoverageFragment`; the driver
//! union-merges them once the whole filter-selected run completes. Merging
//! is only meaningful when the run covered every test (an active filter
//! makes the merged total meaningless, so the driver skips gating then).

use recipe_core::test_model::CoverageFragment;
use std::collections::BTreeSet;

/// The modules a complete run is expected to exercise at least once.
/// Populated from the recipe repo's registered recipe names at startup.
#[derive(Debug, Clone, Default)]
pub struct CoverageRequirement {
    modules: BTreeSet<String>,
}

impl CoverageRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, module: impl Into<String>) {
        self.modules.insert(module.into());
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub percent: f64,
    pub uncovered_modules: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.uncovered_modules.is_empty()
    }
}

/// Exactly-100%-required gate: a module counts as covered once the merged
/// fragment recorded any hit for it, never partial credit.
pub fn compute_report(fragment: &CoverageFragment, requirement: &CoverageRequirement) -> CoverageReport {
    if requirement.is_empty() {
        return CoverageReport { percent: 100.0, uncovered_modules: Vec::new() };
    }

    let covered: BTreeSet<&String> = fragment.files().filter(|f| !fragment.hit_lines(f).map(|s| s.is_empty()).unwrap_or(true)).collect();

    let uncovered: Vec<String> = requirement
        .modules
        .iter()
        .filter(|m| !covered.contains(m))
        .cloned()
        .collect();

    let total = requirement.modules.len() as f64;
    let hit = total - uncovered.len() as f64;
    let percent = if total > 0.0 { (hit / total) * 100.0 } else { 100.0 };

    CoverageReport { percent, uncovered_modules: uncovered }
}
