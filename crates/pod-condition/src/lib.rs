//! A crate for gating pipeline steps on the phase of a Kubernetes pod.
//!
//! The crate provides [`PodStatusCondition`], a predicate that asks `kubectl`
//! for a pod's `.status.phase`, reduces it to a [`PhaseClass`] and compares it
//! with the class it was configured with. How the query is run is up to the
//! caller: anything implementing [`PodQuery`] can be passed in, and
//! [`KubectlQuery`] runs a real `kubectl` process.
//!
//! # Example
//! ```rust,no_run
//! use std::collections::HashMap;
//! use pod_condition::{KubectlQuery, PodStatusCondition, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let condition = PodStatusCondition::new("${JOB}_worker", Some("ci"), "RUNNING")?;
//!     let mut env = HashMap::new();
//!     env.insert("JOB".to_owned(), "Nightly".to_owned());
//!
//!     let running = condition
//!         .check(&env, &KubectlQuery::default(), &mut TracingSink::default())
//!         .await?;
//!     println!("nightly-worker running: {}", running);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod command;
pub mod condition;
pub mod config;
mod error;
pub mod log;
pub mod phase;
pub mod pod_ref;
pub mod query;
pub mod run_condition;
pub mod template;

#[doc(inline)]
pub use condition::{check_all, CheckOutcome, PodStatusCondition};
#[doc(inline)]
pub use error::ConditionError;
#[doc(inline)]
pub use log::{LogSink, TracingSink};
#[doc(inline)]
pub use phase::PhaseClass;
#[doc(inline)]
pub use pod_ref::PodRef;
#[doc(inline)]
pub use query::{KubectlQuery, PodQuery, QueryOutput};
#[doc(inline)]
pub use run_condition::{BuildContext, RunCondition};
