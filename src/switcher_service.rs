//! Round-robin rotation over target window title fragments.
//!
//! The service owns the target list, the running/stopped state machine and
//! the rotation index. It never schedules itself: an external driver calls
//! `switch_to_next` at a fixed period while the service is running.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::backend::WindowBackend;
use crate::directory::WindowDirectory;

type StatusCallback = Box<dyn FnMut(bool)>;
type TargetsCallback = Box<dyn FnMut(&[String])>;

/// Rotates foreground focus across the target list.
///
/// Single-threaded by design: all calls are expected on the driver's
/// thread, so no internal locking exists. A host driving this from several
/// threads must serialize every call itself.
pub struct SwitcherService<B: WindowBackend> {
    directory: WindowDirectory<B>,
    targets: Vec<String>,
    running: bool,
    current_index: usize,
    on_status_change: Option<StatusCallback>,
    on_targets_change: Option<TargetsCallback>,
}

impl<B: WindowBackend> SwitcherService<B> {
    /// Create a service over `directory` with an initial target list.
    ///
    /// Duplicate initial targets are dropped, keeping the first occurrence
    /// so insertion order still defines rotation order.
    pub fn new(directory: WindowDirectory<B>, initial_targets: Vec<String>) -> Self {
        let mut targets: Vec<String> = Vec::with_capacity(initial_targets.len());
        for target in initial_targets {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        SwitcherService {
            directory,
            targets,
            running: false,
            current_index: 0,
            on_status_change: None,
            on_targets_change: None,
        }
    }

    /// Register the status observer. Replaces any previous observer.
    pub fn set_status_callback(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_status_change = Some(Box::new(callback));
    }

    /// Register the targets-changed observer. Replaces any previous
    /// observer.
    pub fn set_targets_callback(&mut self, callback: impl FnMut(&[String]) + 'static) {
        self.on_targets_change = Some(Box::new(callback));
    }

    /// Transition to RUNNING. Idempotent; re-fires the status callback
    /// even when already running.
    pub fn start(&mut self) {
        self.running = true;
        info!("Rotation started ({} targets)", self.targets.len());
        self.notify_status();
    }

    /// Transition to STOPPED. Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
        info!("Rotation stopped");
        self.notify_status();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Defensive copy of the target list.
    pub fn targets(&self) -> Vec<String> {
        self.targets.clone()
    }

    /// Activate the window matching the current target and advance the
    /// rotation.
    ///
    /// Returns whether a window was activated. While stopped, or with an
    /// empty target list, this is a complete no-op: no directory query, no
    /// activation attempt, no state change. A missed match or failed
    /// activation keeps the index where it is, so the same target is
    /// retried on the next tick until it appears or is removed.
    pub fn switch_to_next(&mut self) -> bool {
        if !self.running || self.targets.is_empty() {
            return false;
        }

        let target = self.targets[self.current_index].clone();

        let window = match self.directory.find_by_title_contains(&target) {
            Ok(Some(window)) => window,
            Ok(None) => {
                warn!("No window title contains '{}', retrying next tick", target);
                return false;
            }
            Err(e) => {
                warn!("Window enumeration failed: {:#}", e);
                return false;
            }
        };

        debug!("Activating '{}' for target '{}'", window.title, target);
        match self.directory.activate(window.handle) {
            Ok(true) => {
                self.current_index = (self.current_index + 1) % self.targets.len();
                info!("Activated '{}'", window.title);
                true
            }
            Ok(false) => {
                warn!("Could not activate '{}', retrying next tick", window.title);
                false
            }
            Err(e) => {
                warn!("Activation of '{}' failed: {:#}", window.title, e);
                false
            }
        }
    }

    /// Append a target fragment if not already present (case-sensitive).
    /// Returns whether it was added.
    pub fn add_target(&mut self, fragment: &str) -> bool {
        if self.targets.iter().any(|t| t == fragment) {
            debug!("Target '{}' already present", fragment);
            return false;
        }
        self.targets.push(fragment.to_string());
        info!("Added target '{}'", fragment);
        self.notify_targets();
        true
    }

    /// Remove a target fragment if present. Returns whether it was
    /// removed.
    pub fn remove_target(&mut self, fragment: &str) -> bool {
        let Some(position) = self.targets.iter().position(|t| t == fragment) else {
            debug!("Target '{}' not present", fragment);
            return false;
        };
        self.targets.remove(position);
        if self.current_index >= self.targets.len() {
            self.current_index = 0;
        }
        info!("Removed target '{}'", fragment);
        self.notify_targets();
        true
    }

    /// Empty the target list and reset the rotation index, regardless of
    /// running state.
    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.current_index = 0;
        info!("Cleared all targets");
        self.notify_targets();
    }

    /// Picker view of application window titles. Not on the rotation path.
    pub fn application_windows(&mut self) -> Result<Vec<String>> {
        self.directory.list_application_windows()
    }

    fn notify_status(&mut self) {
        if let Some(callback) = self.on_status_change.as_mut() {
            callback(self.running);
        }
    }

    fn notify_targets(&mut self) {
        if let Some(callback) = self.on_targets_change.as_mut() {
            callback(&self.targets);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{WindowHandle, WindowRecord};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared handle into a fake backend so tests can mutate the window
    /// set and inspect call counts after the backend moves into the
    /// service.
    #[derive(Default)]
    struct FakeState {
        windows: Vec<WindowRecord>,
        activate_ok: bool,
        list_calls: usize,
        activate_calls: usize,
    }

    struct FakeBackend {
        state: Rc<RefCell<FakeState>>,
    }

    impl WindowBackend for FakeBackend {
        fn list_windows(&mut self) -> Result<Vec<WindowRecord>> {
            let mut state = self.state.borrow_mut();
            state.list_calls += 1;
            Ok(state.windows.clone())
        }

        fn activate(&mut self, _handle: WindowHandle) -> Result<bool> {
            let mut state = self.state.borrow_mut();
            state.activate_calls += 1;
            Ok(state.activate_ok)
        }
    }

    fn make_window(id: isize, title: &str) -> WindowRecord {
        WindowRecord {
            handle: WindowHandle(id),
            title: title.to_string(),
            pid: 1000 + id as u32,
        }
    }

    fn service_with_windows(
        targets: &[&str],
        windows: Vec<WindowRecord>,
    ) -> (SwitcherService<FakeBackend>, Rc<RefCell<FakeState>>) {
        let state = Rc::new(RefCell::new(FakeState {
            windows,
            activate_ok: true,
            ..Default::default()
        }));
        let backend = FakeBackend {
            state: state.clone(),
        };
        let service = SwitcherService::new(
            WindowDirectory::new(backend),
            targets.iter().map(|t| t.to_string()).collect(),
        );
        (service, state)
    }

    #[test]
    fn test_initial_state_stopped_at_zero() {
        let (service, _) = service_with_windows(&["A"], vec![]);
        assert!(!service.is_running());
        assert_eq!(service.current_index(), 0);
    }

    #[test]
    fn test_initial_targets_deduplicated() {
        let (service, _) = service_with_windows(&["A", "B", "A"], vec![]);
        assert_eq!(service.targets(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_switch_while_stopped_touches_nothing() {
        let (mut service, state) =
            service_with_windows(&["A"], vec![make_window(1, "A window")]);

        assert!(!service.switch_to_next());
        assert_eq!(state.borrow().list_calls, 0);
        assert_eq!(state.borrow().activate_calls, 0);
        assert_eq!(service.current_index(), 0);
    }

    #[test]
    fn test_switch_with_empty_targets_touches_nothing() {
        let (mut service, state) = service_with_windows(&[], vec![make_window(1, "A window")]);
        service.start();

        assert!(!service.switch_to_next());
        assert_eq!(state.borrow().list_calls, 0);
        assert_eq!(state.borrow().activate_calls, 0);
    }

    #[test]
    fn test_rotation_visits_targets_in_order_and_wraps() {
        let windows = vec![
            make_window(1, "Editor - A"),
            make_window(2, "Editor - B"),
            make_window(3, "Editor - C"),
        ];
        let (mut service, _) = service_with_windows(&["A", "B", "C"], windows);
        service.start();

        assert!(service.switch_to_next());
        assert_eq!(service.current_index(), 1);
        assert!(service.switch_to_next());
        assert_eq!(service.current_index(), 2);
        assert!(service.switch_to_next());
        // Wrapped back to the starting index.
        assert_eq!(service.current_index(), 0);
    }

    #[test]
    fn test_missing_window_keeps_index() {
        let (mut service, _) =
            service_with_windows(&["A", "B"], vec![make_window(2, "B only")]);
        service.start();

        assert!(!service.switch_to_next());
        assert_eq!(service.current_index(), 0);
        assert!(!service.switch_to_next());
        assert_eq!(service.current_index(), 0);
    }

    #[test]
    fn test_failed_activation_keeps_index() {
        let (mut service, state) =
            service_with_windows(&["A", "B"], vec![make_window(1, "A window")]);
        state.borrow_mut().activate_ok = false;
        service.start();

        assert!(!service.switch_to_next());
        assert_eq!(service.current_index(), 0);
        assert_eq!(state.borrow().activate_calls, 1);
    }

    #[test]
    fn test_start_stop_idempotent_and_fires_callback() {
        let (mut service, _) = service_with_windows(&["A"], vec![]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        service.set_status_callback(move |running| seen_clone.borrow_mut().push(running));

        service.start();
        service.start();
        service.stop();
        assert_eq!(*seen.borrow(), vec![true, true, false]);
    }

    #[test]
    fn test_add_target_duplicate_rejected() {
        let (mut service, _) = service_with_windows(&[], vec![]);
        assert!(service.add_target("X"));
        assert!(!service.add_target("X"));
        assert_eq!(service.targets(), vec!["X".to_string()]);
    }

    #[test]
    fn test_add_target_case_sensitive() {
        let (mut service, _) = service_with_windows(&[], vec![]);
        assert!(service.add_target("chrome"));
        assert!(service.add_target("Chrome"));
        assert_eq!(service.targets().len(), 2);
    }

    #[test]
    fn test_remove_target_clamps_index() {
        let windows = vec![
            make_window(1, "w A"),
            make_window(2, "w B"),
            make_window(3, "w C"),
        ];
        let (mut service, _) = service_with_windows(&["A", "B", "C"], windows);
        service.start();
        service.switch_to_next();
        service.switch_to_next();
        assert_eq!(service.current_index(), 2);

        assert!(service.remove_target("C"));
        assert_eq!(service.current_index(), 0);
        assert_eq!(service.targets().len(), 2);
    }

    #[test]
    fn test_remove_last_target_resets_index() {
        let (mut service, _) = service_with_windows(&["A"], vec![make_window(1, "w A")]);
        service.start();

        assert!(service.remove_target("A"));
        assert!(service.targets().is_empty());
        assert_eq!(service.current_index(), 0);
    }

    #[test]
    fn test_remove_missing_target_returns_false() {
        let (mut service, _) = service_with_windows(&["A"], vec![]);
        assert!(!service.remove_target("B"));
    }

    #[test]
    fn test_targets_returns_defensive_copy() {
        let (service, _) = service_with_windows(&["A"], vec![]);
        let mut copy = service.targets();
        copy.push("B".to_string());
        assert_eq!(service.targets(), vec!["A".to_string()]);
    }

    #[test]
    fn test_targets_callback_fires_on_mutation() {
        let (mut service, _) = service_with_windows(&[], vec![]);
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        service.set_targets_callback(move |targets| {
            seen_clone.borrow_mut().push(targets.to_vec());
        });

        service.add_target("A");
        service.remove_target("A");
        service.clear_targets();
        assert_eq!(seen.borrow().len(), 3);
        assert!(seen.borrow()[1].is_empty());
    }

    #[test]
    fn test_clear_targets_while_running_makes_ticks_noops() {
        let (mut service, state) =
            service_with_windows(&["A"], vec![make_window(1, "w A")]);
        service.start();
        service.clear_targets();

        assert!(!service.switch_to_next());
        assert_eq!(state.borrow().list_calls, 0);
        assert_eq!(state.borrow().activate_calls, 0);
        assert!(service.is_running());
    }

    #[test]
    fn test_end_to_end_chrome_then_missing_code() {
        let (mut service, state) =
            service_with_windows(&["Chrome", "Code"], vec![make_window(1, "Google Chrome")]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        service.set_status_callback(move |running| seen_clone.borrow_mut().push(running));

        service.start();
        assert_eq!(*seen.borrow(), vec![true]);

        // Tick 1: Chrome found and activated.
        assert!(service.switch_to_next());
        assert_eq!(service.current_index(), 1);

        // Ticks 2 and 3: no window for Code, index stays put.
        assert!(!service.switch_to_next());
        assert_eq!(service.current_index(), 1);
        assert!(!service.switch_to_next());
        assert_eq!(service.current_index(), 1);

        // A matching window appears; the retried target now succeeds.
        state
            .borrow_mut()
            .windows
            .push(make_window(2, "Visual Studio Code"));
        assert!(service.switch_to_next());
        assert_eq!(service.current_index(), 0);
    }
}
