//! Argument surface (§4.K): one binary, four sub-commands, global flags that
//! apply uniformly across them.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recipes", about = "Recipe runner: execute and test scripted build recipes")]
pub struct Cli {
    /// Working directory recipes and steps resolve relative paths against.
    /// Defaults to the current directory.
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Force emoji glyphs on/off; default auto-detects whether stdout is a TTY.
    #[arg(long = "use-emoji", global = true, conflicts_with = "no_emoji")]
    pub use_emoji: bool,

    #[arg(long = "no-emoji", global = true, conflicts_with = "use_emoji")]
    pub no_emoji: bool,

    /// Repeatable: raises the tracing filter one level per occurrence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// `None` means "auto-detect from the output stream" (§4.K).
    pub fn emoji_override(&self) -> Option<bool> {
        if self.use_emoji {
            Some(true)
        } else if self.no_emoji {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute one recipe against the real step runner.
    Run(RunArgs),
    /// Run or train the simulation-driven test suite.
    Test {
        #[command(subcommand)]
        action: TestAction,
    },
    /// Ensure compiled protocol descriptors are present (under file lock).
    Fetch,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    pub recipe: String,
    /// `key=value` recipe properties.
    pub properties: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum TestAction {
    Run(TestArgs),
    Train(TestArgs),
}

#[derive(Args, Debug)]
pub struct TestArgs {
    #[arg(long = "filter")]
    pub filter: Vec<String>,

    #[arg(long = "json")]
    pub json: Option<PathBuf>,

    #[arg(long = "workers", default_value_t = 4)]
    pub workers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand_with_properties() {
        let cli = Cli::parse_from(["recipes", "run", "foo", "a=1", "b=2"]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.recipe, "foo");
                assert_eq!(args.properties, vec!["a=1".to_string(), "b=2".to_string()]);
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn parses_test_train_with_filter_and_json() {
        let cli = Cli::parse_from(["recipes", "test", "train", "--filter", "foo.*", "--json", "out.json"]);
        match cli.command {
            Command::Test { action: TestAction::Train(args) } => {
                assert_eq!(args.filter, vec!["foo.*".to_string()]);
                assert_eq!(args.json, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected Test Train"),
        }
    }

    #[test]
    fn emoji_flags_are_mutually_exclusive_and_default_to_auto() {
        let cli = Cli::parse_from(["recipes", "fetch"]);
        assert_eq!(cli.emoji_override(), None);

        let cli = Cli::parse_from(["recipes", "--no-emoji", "fetch"]);
        assert_eq!(cli.emoji_override(), Some(false));
    }
}
