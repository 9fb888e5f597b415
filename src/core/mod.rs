//! Registry model and report calculations

pub mod breakdown;
pub mod config;
pub mod listing;
pub mod log;
pub mod registry;

// Re-export main types for cleaner imports
pub use breakdown::{MonthlyBreakdown, TargetMonth, Totals, monthly_breakdown};
pub use registry::{RegistryPayload, RegistryProvider, UnallocatedPolicy};
