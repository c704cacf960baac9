//! Local caching for offline reading.
//!
//! Two caches with deliberately different policies:
//!
//! - [`ScriptureCache`]: book/chapter text is canonical and immutable, so
//!   it is cached forever and only removed by explicit reset.
//! - [`DevotionalCache`]: daily entries change server-side, so reads apply
//!   a revalidation policy (1-hour per-entry staleness, stale fallback on
//!   transient failure) and the whole record expires after 7 days.

pub mod devotional;
pub mod scripture;

pub use devotional::{DevotionalCache, EntryLookup};
pub use scripture::ScriptureCache;
