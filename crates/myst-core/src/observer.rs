/*
 * observer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build observer for tracing and progress reporting.
 */

//! Observer abstraction for build events.
//!
//! The orchestrator reports phase transitions and per-pass progress through
//! a [`PipelineObserver`], so it never depends on a particular reporting
//! backend. [`TracingObserver`] forwards everything to `tracing`.

use crate::error::PassError;

/// Severity of a free-form build event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Trace,
    Debug,
    Info,
    Warn,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Trace => "trace",
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
        }
    }
}

/// The two phases of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Parsing and document-scoped passes, one worker per file
    Document,
    /// Project-scoped passes, after the barrier
    Project,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Document => "document",
            Phase::Project => "project",
        }
    }
}

/// Observer for build events.
///
/// Every method has an empty default, so observers implement only what
/// they need. Document-phase methods are called from worker tasks and may
/// interleave across files.
pub trait PipelineObserver: Send + Sync {
    /// A pass begins. `file` is `None` for project passes.
    fn on_pass_start(&self, _file: Option<&str>, _name: &str, _index: usize, _total: usize) {}

    fn on_pass_complete(&self, _file: Option<&str>, _name: &str, _index: usize, _total: usize) {}

    fn on_pass_error(&self, _file: Option<&str>, _name: &str, _error: &PassError) {}

    fn on_event(&self, _message: &str, _level: EventLevel) {}

    /// A phase begins with `participants` files.
    fn on_phase_start(&self, _phase: Phase, _participants: usize) {}

    fn on_phase_complete(&self, _phase: Phase) {}

    fn on_build_start(&self, _files: usize) {}

    fn on_build_complete(&self, _failed: usize) {}

    fn on_build_cancelled(&self) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NoopObserver {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineObserver for NoopObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineObserver for TracingObserver {
    fn on_pass_start(&self, file: Option<&str>, name: &str, index: usize, total: usize) {
        tracing::debug!(
            file = file.unwrap_or("<project>"),
            pass.name = name,
            pass.index = index,
            pass.total = total,
            "Starting pass"
        );
    }

    fn on_pass_complete(&self, file: Option<&str>, name: &str, index: usize, total: usize) {
        tracing::debug!(
            file = file.unwrap_or("<project>"),
            pass.name = name,
            pass.index = index,
            pass.total = total,
            "Completed pass"
        );
    }

    fn on_pass_error(&self, file: Option<&str>, name: &str, error: &PassError) {
        if error.is_cancelled() {
            tracing::info!(file = file.unwrap_or("<project>"), pass.name = name, "Pass cancelled");
        } else {
            tracing::error!(
                file = file.unwrap_or("<project>"),
                pass.name = name,
                error = %error,
                "Pass failed"
            );
        }
    }

    fn on_event(&self, message: &str, level: EventLevel) {
        match level {
            EventLevel::Trace => tracing::trace!("{}", message),
            EventLevel::Debug => tracing::debug!("{}", message),
            EventLevel::Info => tracing::info!("{}", message),
            EventLevel::Warn => tracing::warn!("{}", message),
        }
    }

    fn on_phase_start(&self, phase: Phase, participants: usize) {
        tracing::info!(phase = phase.as_str(), participants, "Starting phase");
    }

    fn on_phase_complete(&self, phase: Phase) {
        tracing::info!(phase = phase.as_str(), "Completed phase");
    }

    fn on_build_start(&self, files: usize) {
        tracing::info!(files, "Starting build");
    }

    fn on_build_complete(&self, failed: usize) {
        if failed == 0 {
            tracing::info!("Build completed successfully");
        } else {
            tracing::warn!(failed, "Build completed with failed files");
        }
    }

    fn on_build_cancelled(&self) {
        tracing::info!("Build cancelled");
    }
}

/// Emit a formatted event through a context's observer.
///
/// ```ignore
/// trace_event!(ctx, EventLevel::Debug, "Executing {} cells", cells.len());
/// ```
#[macro_export]
macro_rules! trace_event {
    ($ctx:expr, $level:expr, $($arg:tt)*) => {{
        $ctx.observer().on_event(&format!($($arg)*), $level);
    }};
}
