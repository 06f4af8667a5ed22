//! Bounded retry with linearly escalating, jittered backoff.
//!
//! The combinator is independent of the download pool: it takes the policy,
//! a [`Sleeper`] and the fallible operation, so tests can drive it with a
//! scripted operation and a sleeper that never waits.

mod policy;
mod run;
mod sleeper;

pub use policy::RetryPolicy;
pub use run::{Exhausted, Succeeded, run_with_retry};
pub use sleeper::{NoopSleeper, Sleeper, TokioSleeper};
