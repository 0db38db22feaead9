//! Admittance pipeline for the topic overlay.
//!
//! A submission is a proof bundle tagged with the topics it targets. The
//! pipeline rejects oversized or malformed bundles up front, then evaluates
//! the transaction under every topic on a spawned task and hands the
//! resulting [`Steak`](overlay_types::Steak) back through a single-slot
//! [`PendingSteak`].

pub mod config;
pub mod error;
pub mod handoff;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::SubmitError;
pub use handoff::PendingSteak;
pub use pipeline::AdmittancePipeline;
