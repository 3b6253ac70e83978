//! Process-group creation and graceful termination, split by platform
//! (§4.A "Process group", "Graceful termination").

use std::time::Duration;

/// How long to wait after the polite signal before escalating to a hard
/// kill (§4.A: "wait up to 30 s").
pub const GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Configure a freshly-built `tokio::process::Command` to start its own
/// process group, so a later group-wide kill reaches every descendant the
/// child spawns.
#[cfg(unix)]
pub fn configure_new_group(command: &mut tokio::process::Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
pub fn configure_new_group(command: &mut tokio::process::Command) {
    use std::os::windows::process::CommandExt;
    use windows_sys::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

/// Suppress the OS fault dialog once at process startup, matching the
/// teacher's general defensive spawn posture but applied here specifically
/// so a crashing child never blocks on a modal dialog (§4.A).
#[cfg(windows)]
pub fn suppress_fault_dialogs() {
    use windows_sys::Win32::System::Diagnostics::Debug::{SetErrorMode, SEM_NOGPFAULTERRORBOX};
    unsafe {
        SetErrorMode(SEM_NOGPFAULTERRORBOX);
    }
}

#[cfg(not(windows))]
pub fn suppress_fault_dialogs() {}

/// Gracefully terminate the process group that `pid` belongs to (its own
/// pgid, created via `configure_new_group`). Returns the retcode of the
/// direct child once it has actually exited.
#[cfg(unix)]
pub async fn kill_group(child: &mut tokio::process::Child) -> Option<i32> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(raw_pid) = child.id() else {
        return child.try_wait().ok().flatten().and_then(|s| s.code());
    };
    let pgid = Pid::from_raw(raw_pid as i32);

    let _ = killpg(pgid, Signal::SIGTERM);
    let waited = tokio::time::timeout(GRACE_PERIOD, child.wait()).await;
    if let Ok(Ok(status)) = waited {
        return status.code();
    }

    let _ = killpg(pgid, Signal::SIGKILL);
    child.wait().await.ok().and_then(|s| s.code())
}

#[cfg(windows)]
pub async fn kill_group(child: &mut tokio::process::Child) -> Option<i32> {
    use windows_sys::Win32::System::Console::GenerateConsoleCtrlEvent;
    use windows_sys::Win32::System::Threading::TerminateProcess;

    const CTRL_BREAK_EVENT: u32 = 1;

    if let Some(raw_pid) = child.id() {
        unsafe {
            GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, raw_pid);
        }
    }

    let waited = tokio::time::timeout(GRACE_PERIOD, child.wait()).await;
    if let Ok(Ok(status)) = waited {
        return status.code();
    }

    // Only the direct child is guaranteed terminated this way; other group
    // members may leak (documented in §4.A).
    {
        use std::os::windows::io::AsRawHandle;
        unsafe {
            TerminateProcess(child.as_raw_handle() as _, 1);
        }
    }
    child.wait().await.ok().and_then(|s| s.code())
}
