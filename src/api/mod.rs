//! Remote content API.
//!
//! This module provides the [`ContentProvider`] trait the caches depend on,
//! the reqwest-backed [`HttpContentProvider`] used in production, and the
//! [`ApiError`] type that distinguishes "confirmed gone" from transient
//! failures - a distinction the revalidation policy relies on.

pub mod client;
pub mod error;
pub mod provider;

pub use client::HttpContentProvider;
pub use error::ApiError;
pub use provider::ContentProvider;
