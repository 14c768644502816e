//! modelgate change sources
//!
//! Implementations of [`modelgate_core::ChangeSource`]. Fetching changes from
//! a hosted CI service's REST API is left to the pipeline that invokes
//! modelgate; this crate reads them from the checkout itself.

pub mod git;

pub use git::GitChangeSource;
