//! value/mod.rs
//! Dynamic value graph: composites with shared identity, deferred values,
//! and plugin-carried opaque host values.

pub mod types;
pub mod deferred;
mod eq;

pub use types::*;
pub use deferred::{Deferred, Resolver, SettledFuture, Settlement};
