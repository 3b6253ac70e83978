use crate::error::ProcessError;
use recipe_sdk::WhichUtil;
use std::path::{Path, PathBuf};

/// Resolve argv[0] against `cwd` and the child's own PATH (`path_var`),
/// which may differ from this process's PATH once context overlays have
/// been applied (§4.A: "PATH lookup during spawn must use the child's
/// PATH, not the parent's").
pub fn resolve_argv0(argv0: &str, cwd: &Path, path_var: &str) -> Result<PathBuf, ProcessError> {
    WhichUtil::resolve(argv0, cwd, path_var).map_err(|_| ProcessError::UnresolvedCommand(argv0.to_string()))
}
