use anyhow::Result;
use std::collections::BTreeSet;
use tracing::debug;

use crate::backend::{WindowBackend, WindowHandle, WindowRecord};

/// Window titles that belong to system chrome rather than applications.
/// Filtered from the picker view only; the rotation path matches against
/// the raw snapshot.
const SYSTEM_TITLES: &[&str] = &[
    "Program Manager",
    "Settings",
    "Windows Input Experience",
    "Microsoft Text Input Application",
    "MSCTFIME UI",
    "Default IME",
];

/// Queries the set of visible top-level windows.
///
/// Every query takes a fresh snapshot from the backend; nothing is
/// memoized, because window titles and handles change continuously and a
/// stale record would activate the wrong window or none at all.
pub struct WindowDirectory<B: WindowBackend> {
    backend: B,
}

impl<B: WindowBackend> WindowDirectory<B> {
    pub fn new(backend: B) -> Self {
        WindowDirectory { backend }
    }

    /// Fresh snapshot of visible top-level windows with non-empty titles.
    pub fn list_windows(&mut self) -> Result<Vec<WindowRecord>> {
        self.backend.list_windows()
    }

    /// Find the first window whose title contains `fragment`,
    /// case-insensitively.
    ///
    /// "First" means first in backend enumeration order, which is
    /// OS-defined; when several windows match, which one is returned is
    /// nondeterministic by design.
    pub fn find_by_title_contains(&mut self, fragment: &str) -> Result<Option<WindowRecord>> {
        let needle = fragment.to_lowercase();
        let windows = self.backend.list_windows()?;
        let found = windows
            .into_iter()
            .find(|w| w.title.to_lowercase().contains(&needle));
        debug!(
            "Lookup for '{}': {}",
            fragment,
            found
                .as_ref()
                .map(|w| w.title.as_str())
                .unwrap_or("no match")
        );
        Ok(found)
    }

    /// Deduplicated, sorted application window titles for populating a
    /// picker. System chrome and single-character titles are dropped.
    pub fn list_application_windows(&mut self) -> Result<Vec<String>> {
        let windows = self.backend.list_windows()?;
        let titles: BTreeSet<String> = windows
            .into_iter()
            .map(|w| w.title.trim().to_string())
            .filter(|title| title.len() > 1)
            .filter(|title| !SYSTEM_TITLES.iter().any(|sys| title.contains(sys)))
            .collect();
        Ok(titles.into_iter().collect())
    }

    /// Bring the window to the foreground. See [`WindowBackend::activate`].
    pub fn activate(&mut self, handle: WindowHandle) -> Result<bool> {
        self.backend.activate(handle)
    }
}
