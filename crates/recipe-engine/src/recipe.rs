//! Minimal recipe-module discovery (§4.M), standing in for the out-of-scope
//! module/property dependency-injection system. A `Recipe` is a named
//! implementation of `RecipeLogic`; `RecipeRepo` looks recipes up by name.
//! This is intentionally the thinnest layer that lets the engine (G) and
//! test pool (I) be exercised end-to-end — not a general recipe-authoring
//! SDK.

use crate::api::RecipeApi;
use async_trait::async_trait;
use recipe_core::path::Path;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One test case a recipe's `gen_tests()` emits (§3 TestDescription, §4.I).
#[derive(Clone)]
pub struct TestCase {
    pub name: String,
    /// Filename (not path) under the recipe's expectation directory.
    pub expect_file: String,
    pub test_data: Arc<crate::sim_runner::TestData>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, expect_file: impl Into<String>, test_data: crate::sim_runner::TestData) -> Self {
        Self {
            name: name.into(),
            expect_file: expect_file.into(),
            test_data: Arc::new(test_data),
        }
    }
}

/// The recipe author's entry points: `RunSteps(api)` and `GenTests()` from
/// `recipe_engine/recipe_api.py`, translated to a small trait rather than
/// raw closures since trait objects are the more idiomatic Rust rendition
/// of "a named pair of functions" (see DESIGN.md).
#[async_trait(?Send)]
pub trait RecipeLogic {
    async fn run_steps(&self, api: &mut dyn RecipeApi) -> anyhow::Result<()>;
    fn gen_tests(&self) -> Vec<TestCase>;
}

/// A registered recipe: its logic plus where its expectation files live.
pub struct Recipe {
    pub name: String,
    pub logic: Arc<dyn RecipeLogic>,
    pub expectation_dir: Path,
}

impl Recipe {
    pub fn new(name: impl Into<String>, logic: Arc<dyn RecipeLogic>, expectation_dir: Path) -> Self {
        Self {
            name: name.into(),
            logic,
            expectation_dir,
        }
    }

    pub fn gen_tests(&self) -> Vec<TestCase> {
        self.logic.gen_tests()
    }
}

/// All recipes in one repo, looked up by name (§3 RecipeDeps: "main_repo.recipes").
#[derive(Default)]
pub struct RecipeRepo {
    recipes: BTreeMap<String, Recipe>,
}

impl RecipeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.name.clone(), recipe);
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }
}

/// The resolved graph the engine and test pool read from (§3 RecipeDeps).
/// Module dependency resolution across multiple repos is out of scope; this
/// shim carries exactly one repo.
pub struct RecipeDeps {
    pub main_repo: RecipeRepo,
}

impl RecipeDeps {
    pub fn new(main_repo: RecipeRepo) -> Self {
        Self { main_repo }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopRecipe;

    #[async_trait(?Send)]
    impl RecipeLogic for NoopRecipe {
        async fn run_steps(&self, _api: &mut dyn RecipeApi) -> anyhow::Result<()> {
            Ok(())
        }

        fn gen_tests(&self) -> Vec<TestCase> {
            vec![TestCase::new("basic", "basic.json", crate::sim_runner::TestData::new())]
        }
    }

    #[test]
    fn repo_looks_up_registered_recipe_by_name() {
        let mut repo = RecipeRepo::new();
        repo.register(Recipe::new("foo", Arc::new(NoopRecipe), Path::new("/expect/foo")));
        assert!(repo.get("foo").is_some());
        assert!(repo.get("bippityboppityboo").is_none());
    }

    #[test]
    fn gen_tests_delegates_to_logic() {
        let recipe = Recipe::new("foo", Arc::new(NoopRecipe), Path::new("/expect/foo"));
        let tests = recipe.gen_tests();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "basic");
    }
}
