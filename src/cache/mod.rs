//! Per-data-source rebuild caches.
//!
//! Each cache owns one Switch in the scene: slot 0 holds the latest built content, slot 1 is
//! a permanent empty group. Rebuilds replace slot 0 in place, so the previous content stays
//! visible until the new subtree is linked.

pub(crate) mod render_cache;
