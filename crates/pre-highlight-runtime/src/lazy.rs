//! Deferring the apply pass until a code block scrolls into view.

use crate::apply::HighlightRuntime;
use crate::diagnostics::ApplyOutcome;
use crate::host::{IntersectionEntry, NodeId, ObserverConfig, ObserverId, VisibilityHost, WatchId};
use crate::options::{ApplyOptions, ColorScheme};

pub const DEFAULT_SELECTOR: &str = "pre[data-pre-highlight]";
pub const DEFAULT_ROOT_MARGIN: &str = "200px 0px";
pub const OBSERVER_UNSUPPORTED: &str = "observer-unsupported";

#[derive(Debug, Clone)]
pub struct LazyOptions {
    /// Which elements to watch.
    pub selector: String,
    pub root_margin: String,
    pub threshold: f64,
    /// Stop observing after the first visible batch.
    pub once: bool,
    /// Start observing as soon as the controller is created.
    pub auto_start: bool,
    /// Re-apply when the color scheme flips. Only honoured with
    /// [`ColorScheme::Auto`].
    pub watch_color_scheme: bool,
    pub apply: ApplyOptions,
}

impl Default for LazyOptions {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.to_string(),
            root_margin: DEFAULT_ROOT_MARGIN.to_string(),
            threshold: 0.0,
            once: true,
            auto_start: true,
            watch_color_scheme: false,
            apply: ApplyOptions::default(),
        }
    }
}

/// Owns one root's observer and color-scheme subscription.
///
/// The host only records subscriptions. Whoever drives the host reports
/// visibility changes through [`LazyController::handle_intersections`] and
/// scheme flips through [`LazyController::handle_color_scheme_change`].
#[derive(Debug)]
pub struct LazyController {
    root: NodeId,
    options: LazyOptions,
    observer: Option<ObserverId>,
    watch: Option<WatchId>,
    disposed: bool,
    observer_stopped: bool,
    has_applied: bool,
}

impl LazyController {
    pub fn new<H: VisibilityHost + ?Sized>(host: &mut H, root: NodeId, options: LazyOptions) -> Self {
        let observer = if host.supports_observer() {
            host.create_observer(&ObserverConfig {
                root_margin: options.root_margin.clone(),
                threshold: options.threshold,
            })
        } else {
            None
        };
        let mut controller = Self {
            root,
            options,
            observer,
            watch: None,
            disposed: false,
            observer_stopped: false,
            has_applied: false,
        };
        if controller.observer.is_none() {
            log::debug!("no visibility observer, lazy apply needs apply_now");
            return controller;
        }
        if controller.options.watch_color_scheme && controller.options.apply.color_scheme == ColorScheme::Auto {
            controller.watch = host.watch_color_scheme();
        }
        if controller.options.auto_start {
            controller.observe(host);
        }
        controller
    }

    pub fn is_supported(&self) -> bool {
        self.observer.is_some()
    }

    /// Why the controller cannot observe, if it cannot.
    pub fn reason(&self) -> Option<&'static str> {
        (!self.is_supported()).then_some(OBSERVER_UNSUPPORTED)
    }

    pub fn has_applied(&self) -> bool {
        self.has_applied
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Watch every element matching the selector. Returns how many were
    /// handed to the observer.
    pub fn observe<H: VisibilityHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let Some(observer) = self.observer else {
            return 0;
        };
        if self.disposed || self.observer_stopped {
            return 0;
        }
        let targets = host.query_selector_all(self.root, &self.options.selector);
        for target in &targets {
            host.observe(observer, *target);
        }
        targets.len()
    }

    /// Stop observing and drop the color-scheme subscription. Safe to call
    /// more than once.
    pub fn disconnect<H: VisibilityHost + ?Sized>(&mut self, host: &mut H) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(observer) = self.observer {
            host.disconnect_observer(observer);
        }
        if let Some(watch) = self.watch.take() {
            host.unwatch_color_scheme(watch);
        }
    }

    /// Apply immediately, observer or not.
    pub fn apply_now<H: VisibilityHost + ?Sized>(
        &mut self,
        runtime: &mut HighlightRuntime,
        host: &mut H,
    ) -> ApplyOutcome {
        let outcome = runtime.apply(host, self.root, &self.options.apply);
        self.has_applied = true;
        outcome
    }

    /// Feed one observer callback. Applies when any entry is visible.
    pub fn handle_intersections<H: VisibilityHost + ?Sized>(
        &mut self,
        runtime: &mut HighlightRuntime,
        host: &mut H,
        entries: &[IntersectionEntry],
    ) -> Option<ApplyOutcome> {
        if self.disposed || self.observer_stopped || !entries.iter().any(IntersectionEntry::is_visible) {
            return None;
        }
        let outcome = self.apply_now(runtime, host);
        if self.options.once {
            if let Some(observer) = self.observer {
                host.disconnect_observer(observer);
            }
            self.observer_stopped = true;
        }
        Some(outcome)
    }

    /// Feed one color-scheme change. Re-applies only after a first apply.
    pub fn handle_color_scheme_change<H: VisibilityHost + ?Sized>(
        &mut self,
        runtime: &mut HighlightRuntime,
        host: &mut H,
    ) -> Option<ApplyOutcome> {
        if self.disposed || self.watch.is_none() || !self.has_applied {
            return None;
        }
        Some(runtime.apply(host, self.root, &self.options.apply))
    }
}

impl HighlightRuntime {
    /// Create a [`LazyController`] for `root`.
    pub fn observe<H: VisibilityHost + ?Sized>(
        &mut self,
        host: &mut H,
        root: NodeId,
        options: LazyOptions,
    ) -> LazyController {
        LazyController::new(host, root, options)
    }
}
