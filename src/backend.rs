//! OS window-system abstraction for testability.
//!
//! This module provides a trait that abstracts the window-system operations
//! the rotator needs (enumerate windows, force one to the foreground),
//! allowing for mock implementations in tests. The one concrete
//! implementation talks to Win32 and only compiles on Windows.

use anyhow::Result;

/// Opaque identifier for a top-level window.
///
/// The underlying window may be closed at any moment by its owning process,
/// so a handle going stale is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Snapshot of a single top-level window.
///
/// Produced fresh on every enumeration; titles and handles change between
/// calls, so records must never be cached across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub handle: WindowHandle,
    pub title: String,
    pub pid: u32,
}

/// Trait for window-system operations.
///
/// This abstraction allows for mock implementations in tests.
pub trait WindowBackend {
    /// Enumerate visible top-level windows with non-empty titles.
    ///
    /// Enumeration order is OS-defined and not guaranteed stable between
    /// calls.
    fn list_windows(&mut self) -> Result<Vec<WindowRecord>>;

    /// Bring the window to the foreground.
    ///
    /// Returns `Ok(true)` once the window is confirmed as the foreground
    /// window, `Ok(false)` when activation could not be confirmed or the
    /// handle is stale. A stale handle is never an `Err`.
    fn activate(&mut self, handle: WindowHandle) -> Result<bool>;
}

/// Construct the window backend for this host.
///
/// Fails when the host has no supported window system; there is no
/// degraded mode, so callers should treat this as fatal.
#[cfg(windows)]
pub fn native_backend() -> Result<win32::Win32Backend> {
    win32::Win32Backend::new()
}

/// Construct the window backend for this host.
///
/// Fails when the host has no supported window system; there is no
/// degraded mode, so callers should treat this as fatal.
#[cfg(not(windows))]
pub fn native_backend() -> Result<UnsupportedBackend> {
    anyhow::bail!("no supported window system on this host (only Windows sessions are supported)")
}

/// Placeholder backend for unsupported hosts. Never constructed;
/// `native_backend` refuses before one can exist.
#[cfg(not(windows))]
pub struct UnsupportedBackend;

#[cfg(not(windows))]
impl WindowBackend for UnsupportedBackend {
    fn list_windows(&mut self) -> Result<Vec<WindowRecord>> {
        anyhow::bail!("window enumeration is not supported on this host")
    }

    fn activate(&mut self, _handle: WindowHandle) -> Result<bool> {
        anyhow::bail!("window activation is not supported on this host")
    }
}

#[cfg(windows)]
pub mod win32 {
    use super::{WindowBackend, WindowHandle, WindowRecord};
    use anyhow::Result;
    use std::time::Duration;
    use tracing::debug;
    use windows::Win32::Foundation::{BOOL, FALSE, HWND, LPARAM, TRUE};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::AttachThreadInput;
    use windows::Win32::UI::WindowsAndMessaging::{
        BringWindowToTop, EnumWindows, GetForegroundWindow, GetWindowTextW,
        GetWindowThreadProcessId, IsIconic, IsWindow, IsWindowVisible, SetForegroundWindow,
        ShowWindow, SW_RESTORE,
    };

    /// How long to let the OS settle after a foreground request before
    /// checking whether it took effect.
    const SETTLE_DELAY: Duration = Duration::from_millis(50);

    /// Real implementation using the Win32 API.
    pub struct Win32Backend {
        _private: (),
    }

    impl Win32Backend {
        pub fn new() -> Result<Self> {
            Ok(Win32Backend { _private: () })
        }
    }

    fn hwnd(handle: WindowHandle) -> HWND {
        HWND(handle.0 as *mut core::ffi::c_void)
    }

    impl WindowBackend for Win32Backend {
        fn list_windows(&mut self) -> Result<Vec<WindowRecord>> {
            unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
                let records = unsafe { &mut *(lparam.0 as *mut Vec<WindowRecord>) };
                if unsafe { IsWindowVisible(hwnd) }.as_bool() {
                    let mut buf = [0u16; 512];
                    let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
                    if len > 0 {
                        let title = String::from_utf16_lossy(&buf[..len as usize]);
                        let mut pid: u32 = 0;
                        unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
                        records.push(WindowRecord {
                            handle: WindowHandle(hwnd.0 as isize),
                            title,
                            pid,
                        });
                    }
                }
                TRUE
            }

            let mut records: Vec<WindowRecord> = Vec::new();
            unsafe {
                EnumWindows(
                    Some(enum_proc),
                    LPARAM(&mut records as *mut Vec<WindowRecord> as isize),
                )?;
            }
            Ok(records)
        }

        fn activate(&mut self, handle: WindowHandle) -> Result<bool> {
            let target = hwnd(handle);

            unsafe {
                if !IsWindow(target).as_bool() {
                    debug!("Handle {:?} is stale, skipping activation", handle);
                    return Ok(false);
                }

                if IsIconic(target).as_bool() {
                    let _ = ShowWindow(target, SW_RESTORE);
                }

                let _ = BringWindowToTop(target);
                let _ = SetForegroundWindow(target);
            }

            std::thread::sleep(SETTLE_DELAY);

            if unsafe { GetForegroundWindow() } == target {
                return Ok(true);
            }

            // Windows refuses foreground changes from a background process
            // unless its input processing is attached to the input queue of
            // the thread that currently owns the foreground. Join both
            // queues, retry, then detach no matter what.
            let foreground = unsafe { GetForegroundWindow() };
            let own_thread = unsafe { GetCurrentThreadId() };
            let foreground_thread = unsafe { GetWindowThreadProcessId(foreground, None) };
            let target_thread = unsafe { GetWindowThreadProcessId(target, None) };

            let guard =
                match InputAttachGuard::attach(own_thread, [foreground_thread, target_thread]) {
                    Some(guard) => guard,
                    None => {
                        debug!("AttachThreadInput failed for handle {:?}", handle);
                        return Ok(false);
                    }
                };

            unsafe {
                let _ = BringWindowToTop(target);
                let _ = SetForegroundWindow(target);
            }

            drop(guard);

            Ok(unsafe { GetForegroundWindow() } == target)
        }
    }

    /// Scoped AttachThreadInput pairing.
    ///
    /// Detaches every successfully attached thread on drop, so a failure
    /// partway through the sequence never leaves input queues joined.
    struct InputAttachGuard {
        own_thread: u32,
        attached: Vec<u32>,
    }

    impl InputAttachGuard {
        fn attach(own_thread: u32, others: [u32; 2]) -> Option<Self> {
            let mut guard = InputAttachGuard {
                own_thread,
                attached: Vec::new(),
            };
            for thread in others {
                // Attaching a thread to itself fails by contract.
                if thread == 0 || thread == own_thread || guard.attached.contains(&thread) {
                    continue;
                }
                if !unsafe { AttachThreadInput(own_thread, thread, TRUE) }.as_bool() {
                    // Guard drops here, detaching whatever did attach.
                    return None;
                }
                guard.attached.push(thread);
            }
            Some(guard)
        }
    }

    impl Drop for InputAttachGuard {
        fn drop(&mut self) {
            for thread in &self.attached {
                unsafe {
                    let _ = AttachThreadInput(self.own_thread, *thread, FALSE);
                }
            }
        }
    }
}
