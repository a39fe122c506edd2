//! Analytical views over the fact table.
//!
//! Every function here is a pure computation over an already validated
//! [`FactTable`](crate::facts::FactTable) and the call's parameters. The only
//! failures are parameter violations, reported before any work starts.

pub mod aggregate;
pub mod compare;
pub mod ranking;
pub mod similarity;
pub mod types;
pub mod utility;

#[cfg(test)]
mod test_support;
