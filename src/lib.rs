//! # Scour
//!
//! A pre-build cleaner for Python project workspaces.
//!
//! Run it right before packaging to remove everything that is regenerated
//! by the next build: virtual environments, bytecode caches, build and dist
//! output, packaging metadata, and test/lint caches.
//!
//! ## Features
//!
//! - Idempotent: a second run against a clean tree removes nothing
//! - Best effort: a path that cannot be removed is reported and skipped
//! - Configurable target list via `scour.toml`
//! - Project root discovery from the executable location
//!
//! ## Usage
//!
//! ### Command Line
//!
//! ```bash
//! # Discover <repo>/python from the executable location and clean it
//! scour
//!
//! # Clean an explicit directory
//! scour path/to/python
//!
//! # Show what would be removed
//! scour --dry-run
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use scour::{SweepConfig, Sweeper};
//!
//! let sweeper = Sweeper::new(SweepConfig {
//!     dry_run: true,
//!     ..Default::default()
//! })?;
//! let report = sweeper.clean(".");
//! println!("would free {}", report.format_size());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export core functionality
pub use scour_core::*;

// Re-export commonly used types
pub use scour_core::{
    CleanerConfig, CleanupTarget, RootResolver, SweepConfig, SweepPhase, SweepProgress,
    SweepReport, Sweeper, TargetKind,
};
