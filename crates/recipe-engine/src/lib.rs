//! Recipe engine: drives a recipe's `RunSteps` against either the real step
//! runner (`recipe-process`) or the simulation step runner (§4.G, §4.H),
//! plus the minimal recipe loading shim that stands in for the out-of-scope
//! module/property system (§4.M).

pub mod api;
pub mod engine;
pub mod recipe;
pub mod sim_runner;

pub use api::{RecipeApi, ScopedContext};
pub use engine::{Engine, ManifestUploaderState, ParentStepGuard};
pub use recipe::{Recipe, RecipeDeps, RecipeLogic, RecipeRepo, TestCase};
pub use sim_runner::{RecordedStep, SimulationStepRunner, TestData};
