//! Logging facilities for the tiled map view.
//!
//! Everything is instrumented with the `tracing` crate. To see logs, install a
//! subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tiledmap=debug,tiledmap_core=info")
//!     .init();
//! ```

/// Span names used for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// View render pass.
    pub const RENDER: &str = "tiledmap::render";
    /// Layer redraw cycle.
    pub const REDRAW: &str = "tiledmap::redraw";
    /// One-shot map setup.
    pub const SETUP: &str = "tiledmap::setup";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tiledmap_core::signal";
    /// Performance spans.
    pub const PERF: &str = "tiledmap::perf";
    /// Map view controller target.
    pub const VIEW: &str = "tiledmap::view";
    /// Tile layer manager target.
    pub const LAYERS: &str = "tiledmap::layers";
    /// Shared query state target.
    pub const QUERY: &str = "tiledmap::query";
    /// Interaction overlay target.
    pub const OVERLAY: &str = "tiledmap::overlay";
    /// Configuration loading target.
    pub const CONFIG: &str = "tiledmap::config";
}

/// RAII guard for timing an operation.
///
/// The span is entered on creation and exited when the guard is dropped.
///
/// ```
/// use tiledmap_core::PerfSpan;
///
/// {
///     let _span = PerfSpan::new(tiledmap_core::logging::span_names::REDRAW);
///     // ... timed work ...
/// }
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span_under_subscriber() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            let _span = PerfSpan::new(span_names::RENDER);
            tracing::debug!(target: targets::VIEW, value = 1, "inside perf span");
        });
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::PERF,
            targets::VIEW,
            targets::LAYERS,
            targets::QUERY,
            targets::OVERLAY,
            targets::CONFIG,
        ] {
            assert!(target.starts_with("tiledmap::"));
        }
        assert!(targets::SIGNAL.starts_with("tiledmap_core::"));
    }
}
