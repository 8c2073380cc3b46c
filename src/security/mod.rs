//! Security Primitives Module
//!
//! Scrubbing of kernel records that leave service:
//! - Freed capability slots are wiped before they can be reused
//! - Cancelled asynchronous messages are wiped before their entry is recycled
//!
//! # Security Properties
//! - Stale rights or object handles never survive in a recycled slot
//! - Memory is cleared using volatile writes to prevent optimization

pub mod zeroize;

pub use zeroize::Zeroize;
