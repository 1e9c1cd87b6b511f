//! Read-only analyses over a [`Module`](crate::ir::Module).

pub mod call_count;

pub use call_count::{count_calls, CallCounts};
