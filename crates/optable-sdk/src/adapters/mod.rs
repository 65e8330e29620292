//! Callback and delegate front-ends over the async core.
//!
//! Both are thin: they spawn the async operation and hand its single
//! result to caller code.

pub mod callback;
pub mod delegate;

pub use delegate::{DelegateAdapter, OptableDelegate};
