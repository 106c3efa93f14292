//! Pure poll logic, independent of any storage or transport.

pub mod access;
pub mod ballot;
pub mod filter;
pub mod poll;
