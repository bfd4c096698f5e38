//! # Spatial Index Module
//!
//! Per-lane 1-D bucketed index answering the neighbor queries that dominate
//! the microscopic hot loop: leader/follower lookup within a lane and
//! hypothetical leader/follower lookup on adjacent lanes during lane-change
//! evaluation.
//!
//! ## Key Components
//!
//! - [`BucketIndex`] - The bucketed index: O(1) amortized insert/remove/update,
//!   bucket-walk leader/follower queries
//! - [`IndexEntry`] - An `(s, id)` entry; ordering ties are broken by vehicle
//!   id so every query is deterministic
//!
//! The bucket size must be at least the maximum interaction range of any
//! driver model so a neighbor query rarely inspects more than two buckets.

mod bucket_index;

pub use self::bucket_index::*;
