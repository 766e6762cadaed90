//! # Propagation Phases
//!
//! The two pure functions at the center of the engine, each wrapped in the
//! substrate adapter that applies it over a dataset:
//!
//! - **Map** ([`ActivationMap`]): per record. Re-emits edges, derives one
//!   contribution per resolved edge, keeps only the root's node record.
//! - **Aggregate** ([`ActivationReduce`] over [`aggregate_group`]): per key
//!   group. Folds contributions by node class, stamps the fresh score onto
//!   the group's edges, emits exactly one node record.
//!
//! One map + one aggregate is one hop of propagation; after k passes every
//! path of length ≤ k from the root has been accounted for.

pub mod map;
pub mod aggregate;

pub use map::ActivationMap;
pub use aggregate::{
    ActivationReduce, GroupOutcome, aggregate_group, combine_conjunction, conjunction_pair,
};
