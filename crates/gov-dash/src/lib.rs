//! Governance dashboard driver
//!
//! Mounts governance views over a seeded in-memory source and reports what
//! the views received. Used by the `gov-dash` binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use gov_dash::{simulate, DashboardConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let report = simulate(&DashboardConfig::default()).await?;
//! println!("{}", report.render());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod driver;

// Re-exports for convenience
pub use config::DashboardConfig;
pub use driver::{inspect_plugin, simulate, PluginReport, SimulationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
