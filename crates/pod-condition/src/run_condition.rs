//! Traits and types needed to plug a condition into a pipeline engine.
use std::collections::HashMap;

use async_trait::async_trait;

use crate::condition::PodStatusCondition;
use crate::log::LogSink;
use crate::query::PodQuery;

/// What a build hands to a condition when asking it to decide.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// The build's environment, used to resolve placeholders.
    pub env: &'a HashMap<String, String>,
    /// Runs queries on behalf of the condition.
    pub query: &'a dyn PodQuery,
}

impl<'a> BuildContext<'a> {
    /// Create a context from a build environment and a query launcher.
    pub fn new(env: &'a HashMap<String, String>, query: &'a dyn PodQuery) -> Self {
        BuildContext { env, query }
    }
}

/// A predicate a pipeline engine evaluates before running a guarded step.
///
/// The engine calls [`RunCondition::run_prebuild`] while preparing the build
/// and [`RunCondition::run_perform`] right before the step; the step only runs
/// if the relevant call returns `true`.
///
/// **Note**: this trait is defined using [async-trait](https://crates.io/crates/async-trait).
#[async_trait]
pub trait RunCondition: Send + Sync {
    /// The name shown to users choosing a condition.
    fn display_name(&self) -> &'static str;

    /// Decide during the prebuild phase. Conditions that can only be judged
    /// while the build runs keep the default, which lets the build continue.
    async fn run_prebuild(
        &self,
        _build: &BuildContext<'_>,
        _sink: &mut dyn LogSink,
    ) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Decide whether the guarded step runs.
    async fn run_perform(
        &self,
        build: &BuildContext<'_>,
        sink: &mut dyn LogSink,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
impl RunCondition for PodStatusCondition {
    fn display_name(&self) -> &'static str {
        "POD Status is"
    }

    async fn run_perform(
        &self,
        build: &BuildContext<'_>,
        sink: &mut dyn LogSink,
    ) -> anyhow::Result<bool> {
        Ok(self.check(build.env, build.query, sink).await?)
    }
}
