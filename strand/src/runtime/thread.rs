use std::thread;

/// Whether the calling thread is the process's primary thread.
///
/// On Linux the primary thread is the one whose thread id equals the process
/// id. On Apple targets the answer comes from `pthread_main_np`. Elsewhere
/// the check falls back to the standard library naming the primary thread
/// `main`.
pub fn is_main_thread() -> bool {
    imp::is_main_thread()
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod imp {
    pub(super) fn is_main_thread() -> bool {
        // SAFETY: neither call has preconditions.
        unsafe { libc::syscall(libc::SYS_gettid) == libc::getpid() as libc::c_long }
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod imp {
    pub(super) fn is_main_thread() -> bool {
        // SAFETY: no preconditions.
        unsafe { libc::pthread_main_np() == 1 }
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
mod imp {
    pub(super) fn is_main_thread() -> bool {
        super::thread::current().name() == Some("main")
    }
}

/// Name of the calling thread for diagnostics.
pub(crate) fn current_thread_label() -> String {
    let current = thread::current();

    match current.name() {
        Some(name) => name.to_owned(),
        None => format!("{:?}", current.id()),
    }
}
