//! In-memory counters whose updates must be serialized per entity.
//!
//! Both boards use the same shape: a `DashMap` keyed by post id whose entries
//! are `parking_lot::Mutex`-guarded records. The compound read-compute-write
//! for one post runs entirely under its entry lock; updates to different
//! posts proceed in parallel on separate shards.

pub mod labour;
pub mod votes;
