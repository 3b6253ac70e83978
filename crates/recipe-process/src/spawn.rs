use crate::env_builder::build_env;
use crate::error::ProcessError;
use crate::group::{configure_new_group, suppress_fault_dialogs};
use crate::resolve::resolve_argv0;
use recipe_core::step::StepConfig;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// What `spawn` actually started: the child handle plus the resolved
/// argv[0], kept for the per-step debug log (§4.C).
pub struct Spawned {
    pub child: Child,
    pub resolved_argv0: std::path::PathBuf,
}

/// Starts a child for `config` against `parent_env` (the inherited
/// environment before this step's overrides) and `default_cwd` (used when
/// `config.cwd` is absent). Implements §4.A: resolve argv[0] against the
/// step's own PATH, build the final env block, create a new process group,
/// and suppress fault dialogs once per process.
pub fn spawn(
    config: &StepConfig,
    parent_env: &BTreeMap<String, String>,
    default_cwd: &Path,
) -> Result<Spawned, ProcessError> {
    suppress_fault_dialogs();

    let cwd = config
        .cwd
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| default_cwd.to_path_buf());

    let env = build_env(parent_env, &config.env, &config.env_prefixes, &config.env_suffixes)
        .map_err(ProcessError::BadEnv)?;

    let path_var = env.get("PATH").cloned().unwrap_or_default();
    let resolved_argv0 = resolve_argv0(&config.argv[0], &cwd, &path_var)?;

    let mut command = Command::new(&resolved_argv0);
    command
        .args(&config.argv[1..])
        .current_dir(&cwd)
        .env_clear()
        .envs(&env)
        .stdin(match &config.stdin {
            Some(path) => Stdio::from(std::fs::File::open(path).map_err(ProcessError::Spawn)?),
            None => Stdio::null(),
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    configure_new_group(&mut command);

    let child = command.spawn().map_err(ProcessError::Spawn)?;

    Ok(Spawned { child, resolved_argv0 })
}
