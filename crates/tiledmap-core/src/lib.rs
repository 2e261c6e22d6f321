//! Reactive core for the tiled map view.
//!
//! This crate provides the pieces the view is wired together with:
//!
//! - **Signal/Slot System**: Type-safe, synchronous change notification
//! - **Property System**: Values with change detection
//! - **Logging**: `tracing` targets, span names and a perf guard
//!
//! # Signal/Slot Example
//!
//! ```
//! use tiledmap_core::Signal;
//!
//! let changed = Signal::<()>::new();
//! let conn_id = changed.connect(|_| println!("query changed"));
//! changed.emit(());
//! changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod property;
pub mod signal;

pub use error::SignalError;
pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
