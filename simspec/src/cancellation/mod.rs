//! Cooperative cancellation of in-flight analysis runs.

mod token;

pub use token::CancellationToken;
