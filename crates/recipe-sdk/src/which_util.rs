use std::path::{Path, PathBuf};

/// Resolves argv[0] the way a step's command is resolved before spawn.
///
/// Deliberately narrower than a shell's own lookup:
/// - an absolute path is checked as-is and never searched for elsewhere
/// - a name containing a path separator is resolved relative to the given
///   working directory, not PATH
/// - otherwise every directory on PATH is tried in order
///
/// `$PATHEXT` is never consulted. On Windows only the bare name, then
/// `name.exe`, then `name.bat` are tried, in that order; POSIX tries only
/// the exact name. This keeps resolution identical across machines instead
/// of depending on whatever extensions happen to be registered locally.
pub struct WhichUtil;

impl WhichUtil {
    /// Resolve `command` against `cwd` and `path_var` (the child's PATH, which
    /// may differ from the current process's own PATH once env overlays are
    /// applied). Returns an error if no match is found.
    pub fn resolve(command: &str, cwd: &Path, path_var: &str) -> anyhow::Result<PathBuf> {
        if command.is_empty() {
            anyhow::bail!("command must not be empty");
        }

        let candidate = Path::new(command);
        if candidate.is_absolute() {
            return Self::match_candidate(candidate).ok_or_else(|| {
                anyhow::anyhow!("{command}: not found (absolute path does not exist)")
            });
        }

        if Self::has_path_separator(command) {
            let joined = cwd.join(candidate);
            return Self::match_candidate(&joined)
                .ok_or_else(|| anyhow::anyhow!("{command}: not found relative to '{}'", cwd.display()));
        }

        for dir in path_var.split(Self::path_separator()) {
            if dir.is_empty() {
                continue;
            }
            let joined = Path::new(dir).join(command);
            if let Some(found) = Self::match_candidate(&joined) {
                return Ok(found);
            }
        }

        anyhow::bail!(
            "{command}: not found on PATH. Make sure '{command}' is installed and its location is included in the PATH passed to the step."
        )
    }

    fn has_path_separator(command: &str) -> bool {
        command.contains('/') || (cfg!(windows) && command.contains('\\'))
    }

    fn path_separator() -> char {
        if cfg!(windows) {
            ';'
        } else {
            ':'
        }
    }

    #[cfg(windows)]
    fn match_candidate(base: &Path) -> Option<PathBuf> {
        if base.is_file() {
            return Some(base.to_path_buf());
        }
        for ext in [".exe", ".bat"] {
            let mut name = base.as_os_str().to_os_string();
            name.push(ext);
            let candidate = PathBuf::from(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    #[cfg(not(windows))]
    fn match_candidate(base: &Path) -> Option<PathBuf> {
        if base.is_file() && Self::is_executable(base) {
            Some(base.to_path_buf())
        } else {
            None
        }
    }

    #[cfg(unix)]
    fn is_executable(path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_absolute_path() {
        let result = WhichUtil::resolve("/bin/sh", Path::new("/"), "");
        // /bin/sh exists on essentially every POSIX CI image; skip assertion on
        // platforms where it doesn't rather than hard failing the suite.
        if Path::new("/bin/sh").is_file() {
            assert!(result.is_ok());
        }
    }

    #[test]
    fn rejects_missing_absolute_path() {
        let result = WhichUtil::resolve("/nonexistent_binary_xyz", Path::new("/"), "");
        assert!(result.is_err());
    }

    #[test]
    fn resolves_relative_to_cwd_when_path_separator_present() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("myscript");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let result = WhichUtil::resolve("./myscript", dir.path(), "");
        assert!(result.is_ok());
    }

    #[test]
    fn searches_path_for_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("mytool");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let path_var = dir.path().to_string_lossy().to_string();
        let result = WhichUtil::resolve("mytool", dir.path(), &path_var);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_on_path_is_error() {
        let result = WhichUtil::resolve("nonexistent_tool_abc123", Path::new("."), "/usr/bin");
        assert!(result.is_err());
    }
}
