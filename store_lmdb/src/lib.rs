//! LMDB storage backend for the topic overlay.
//!
//! Implements the output store traits from `overlay-store` using the `heed`
//! LMDB bindings. All databases live in a single environment.

pub mod environment;
pub mod error;
pub mod keys;
pub mod output;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use output::LmdbOutputStore;
