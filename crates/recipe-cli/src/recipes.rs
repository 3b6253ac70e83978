//! The CLI's own concrete recipe registry. Module/property dependency
//! injection is out of scope (§1, §4.M): there is no recipe discovery here,
//! just enough registered `RecipeLogic` to drive `run`/`test run`/
//! `test train` end to end.

use async_trait::async_trait;
use recipe_core::path::Path;
use recipe_core::step::{ExecutionResult, StepConfig};
use recipe_engine::{Recipe, RecipeApi, RecipeLogic, RecipeRepo, TestCase, TestData};
use std::sync::Arc;

struct HelloWorld;

#[async_trait(?Send)]
impl RecipeLogic for HelloWorld {
    async fn run_steps(&self, api: &mut dyn RecipeApi) -> anyhow::Result<()> {
        api.step(StepConfig::new(
            vec!["hello".into()],
            vec!["echo".into(), "hello, world".into()],
        ))
        .await?;
        Ok(())
    }

    fn gen_tests(&self) -> Vec<TestCase> {
        vec![TestCase::new(
            "basic",
            "basic.json",
            TestData::new().with_step(&["hello"], ExecutionResult::success(0), vec!["hello, world".into()]),
        )]
    }
}

/// All recipes `recipes run`/`recipes test` can see.
pub fn registry() -> RecipeRepo {
    let mut repo = RecipeRepo::new();
    repo.register(Recipe::new(
        "hello_world",
        Arc::new(HelloWorld),
        Path::new("/recipes/hello_world/expectations"),
    ));
    repo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_carries_the_demo_recipe() {
        let repo = registry();
        assert!(repo.get("hello_world").is_some());
        assert!(repo.get("nooope").is_none());
    }
}
