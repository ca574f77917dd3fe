//! The pod status condition.

use std::borrow::Cow;
use std::collections::HashMap;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::command::QueryCommand;
use crate::error::ConditionError;
use crate::log::LogSink;
use crate::phase::PhaseClass;
use crate::pod_ref::PodRef;
use crate::query::PodQuery;

/// How a single check turned out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The query reported a phase of the expected class.
    Matched,
    /// The query succeeded but reported no phase of the expected class.
    NotMatched,
    /// The query could not be run or exited unsuccessfully.
    QueryFailed {
        /// What went wrong.
        reason: String,
    },
}

impl CheckOutcome {
    /// Whether the condition is met. Failed queries count as not met.
    pub fn is_match(&self) -> bool {
        matches!(self, CheckOutcome::Matched)
    }
}

/// A condition that holds when a pod's phase falls into an expected class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodStatusCondition {
    pod: PodRef,
    expected: PhaseClass,
}

impl PodStatusCondition {
    /// Create a condition from its configured values.
    ///
    /// `status` must be `RUNNING` or `COMPLETED`.
    pub fn new(
        pod_name: impl Into<String>,
        namespace: Option<&str>,
        status: &str,
    ) -> Result<Self, ConditionError> {
        Ok(Self::with_expected(
            PodRef::new(pod_name, namespace),
            status.parse()?,
        ))
    }

    /// Create a condition for `pod` expecting `expected`.
    pub fn with_expected(pod: PodRef, expected: PhaseClass) -> Self {
        PodStatusCondition { pod, expected }
    }

    /// The configured pod name, before placeholders are resolved.
    pub fn pod_name(&self) -> &str {
        &self.pod.name
    }

    /// The configured namespace, before placeholders are resolved.
    pub fn namespace(&self) -> Option<&str> {
        self.pod.namespace.as_deref()
    }

    /// The class the pod's phase must fall into.
    pub fn expected(&self) -> PhaseClass {
        self.expected
    }

    /// The query this condition runs in `env`.
    pub fn command(&self, env: &HashMap<String, String>) -> Result<QueryCommand, ConditionError> {
        let pod = self.pod.resolve(env);
        if pod.name.is_empty() {
            return Err(ConditionError::EmptyPodName);
        }
        Ok(QueryCommand::pod_phase(&pod))
    }

    /// Check the pod, collapsing every failure of the query to `false`.
    ///
    /// The only error is a pod name that resolves to nothing.
    pub async fn check(
        &self,
        env: &HashMap<String, String>,
        query: &dyn PodQuery,
        sink: &mut dyn LogSink,
    ) -> Result<bool, ConditionError> {
        Ok(self.evaluate(env, query, sink).await?.is_match())
    }

    /// Check the pod and report why the condition does or does not hold.
    ///
    /// Standard error of the query and the message of any launch failure are
    /// written to `sink`. An unsuccessful exit is not logged there.
    pub async fn evaluate(
        &self,
        env: &HashMap<String, String>,
        query: &dyn PodQuery,
        sink: &mut dyn LogSink,
    ) -> Result<CheckOutcome, ConditionError> {
        let command = self.command(env)?;
        debug!(%command, expected = %self.expected, "checking pod status");

        let output = match query.run(&command, env, sink).await {
            Ok(output) => output,
            Err(e) => {
                warn!(%command, error = %e, "unable to run pod status query");
                sink.log_line(&e.to_string());
                return Ok(CheckOutcome::QueryFailed {
                    reason: e.to_string(),
                });
            }
        };

        if !output.success() {
            debug!(%command, exit_code = ?output.exit_code, "pod status query failed");
            let reason = match output.exit_code {
                Some(code) => format!("{} exited with status {}", command, code),
                None => format!("{} was terminated by a signal", command),
            };
            return Ok(CheckOutcome::QueryFailed { reason });
        }

        for phase in output_lines(&output.stdout) {
            if PhaseClass::classify(&phase) == self.expected {
                debug!(%command, %phase, "pod status matched");
                return Ok(CheckOutcome::Matched);
            }
        }

        debug!(%command, "pod status did not match");
        Ok(CheckOutcome::NotMatched)
    }
}

// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
// garbled line never hides the lines after it.
fn output_lines(stdout: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    let body = match stdout.strip_suffix(b"\n") {
        Some(body) => Some(body),
        None if stdout.is_empty() => None,
        None => Some(stdout),
    };
    body.into_iter()
        .flat_map(|body| body.split(|b| *b == b'\n'))
        .map(|line| String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line)))
}

/// Evaluate many conditions concurrently.
///
/// Each check logs into a buffer of its own; the buffers are copied to `sink`
/// in the order of `conditions` once every check has finished. Outcomes are
/// returned in the same order.
pub async fn check_all(
    conditions: &[PodStatusCondition],
    env: &HashMap<String, String>,
    query: &dyn PodQuery,
    sink: &mut dyn LogSink,
) -> Vec<Result<CheckOutcome, ConditionError>> {
    let checks = conditions.iter().map(|condition| async move {
        let mut lines: Vec<String> = Vec::new();
        let outcome = condition.evaluate(env, query, &mut lines).await;
        (outcome, lines)
    });

    join_all(checks)
        .await
        .into_iter()
        .map(|(outcome, lines)| {
            for line in &lines {
                sink.log_line(line);
            }
            outcome
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::QueryOutput;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;

    /// Answers every query with a fixed result and remembers the commands.
    struct FakeQuery {
        result: fn() -> io::Result<QueryOutput>,
        stderr: Vec<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeQuery {
        fn new(result: fn() -> io::Result<QueryOutput>) -> Self {
            FakeQuery {
                result,
                stderr: Vec::new(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PodQuery for FakeQuery {
        async fn run(
            &self,
            command: &QueryCommand,
            _env: &HashMap<String, String>,
            sink: &mut dyn LogSink,
        ) -> io::Result<QueryOutput> {
            self.seen.lock().unwrap().push(command.to_string());
            for line in &self.stderr {
                sink.log_line(line);
            }
            (self.result)()
        }
    }

    fn running_condition() -> PodStatusCondition {
        PodStatusCondition::new("my_pod", None, "RUNNING").unwrap()
    }

    async fn check(condition: &PodStatusCondition, query: &FakeQuery) -> (bool, Vec<String>) {
        let mut sink: Vec<String> = Vec::new();
        let result = condition
            .check(&HashMap::new(), query, &mut sink)
            .await
            .unwrap();
        (result, sink)
    }

    #[test]
    fn rejects_unknown_status() {
        assert_eq!(
            Err(ConditionError::UnknownStatus("STARTING".to_owned())),
            PodStatusCondition::new("pod", None, "STARTING")
        );
    }

    #[test]
    fn keeps_configured_values() {
        let condition = PodStatusCondition::new("${POD}", Some("${NS}"), "COMPLETED").unwrap();
        assert_eq!("${POD}", condition.pod_name());
        assert_eq!(Some("${NS}"), condition.namespace());
        assert_eq!(PhaseClass::Completed, condition.expected());
    }

    #[tokio::test]
    async fn running_output_matches_running() {
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Running\n")));
        let (result, sink) = check(&running_condition(), &query).await;
        assert!(result);
        assert!(sink.is_empty());
        assert_eq!(
            vec!["kubectl get -o template pod/my-pod --template={{.status.phase}}".to_owned()],
            query.seen()
        );
    }

    #[tokio::test]
    async fn succeeded_output_does_not_match_running() {
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Succeeded\n")));
        let (result, _) = check(&running_condition(), &query).await;
        assert!(!result);
    }

    #[tokio::test]
    async fn succeeded_output_matches_completed() {
        let condition = PodStatusCondition::new("my_pod", None, "COMPLETED").unwrap();
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Succeeded")));
        let (result, _) = check(&condition, &query).await;
        assert!(result);
    }

    #[tokio::test]
    async fn failed_query_never_matches() {
        for status in &["RUNNING", "COMPLETED"] {
            let condition = PodStatusCondition::new("my_pod", None, status).unwrap();
            let query = FakeQuery::new(|| Ok(QueryOutput::new(1, "Running\nSucceeded\n")));
            let (result, sink) = check(&condition, &query).await;
            assert!(!result);
            assert!(sink.is_empty());
        }
    }

    #[tokio::test]
    async fn scans_every_line() {
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Succeeded\nRunning\n")));
        let (result, _) = check(&running_condition(), &query).await;
        assert!(result);

        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Pending\nRunning\n")));
        let (result, _) = check(&running_condition(), &query).await;
        assert!(result);
    }

    #[tokio::test]
    async fn empty_output_does_not_match() {
        for status in &["RUNNING", "COMPLETED"] {
            let condition = PodStatusCondition::new("my_pod", None, status).unwrap();
            let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "")));
            let (result, _) = check(&condition, &query).await;
            assert!(!result);
        }
    }

    #[tokio::test]
    async fn launch_failure_is_logged_once() {
        let query = FakeQuery::new(|| {
            Err(io::Error::new(io::ErrorKind::NotFound, "kubectl: not found"))
        });
        let (result, sink) = check(&running_condition(), &query).await;
        assert!(!result);
        assert_eq!(vec!["kubectl: not found".to_owned()], sink);
    }

    #[tokio::test]
    async fn stderr_reaches_the_sink() {
        let mut query = FakeQuery::new(|| Ok(QueryOutput::new(1, "")));
        query.stderr = vec!["Error from server (NotFound): pods \"my-pod\" not found"];
        let (result, sink) = check(&running_condition(), &query).await;
        assert!(!result);
        assert_eq!(1, sink.len());
        assert!(sink[0].contains("NotFound"));
    }

    #[tokio::test]
    async fn undecodable_lines_do_not_stop_the_scan() {
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, b"\xff\nRunning\n".to_vec())));
        let mut sink: Vec<String> = Vec::new();
        let outcome = running_condition()
            .evaluate(&HashMap::new(), &query, &mut sink)
            .await
            .unwrap();
        assert_eq!(CheckOutcome::Matched, outcome);
        assert!(sink.is_empty());

        let condition = PodStatusCondition::new("my_pod", None, "COMPLETED").unwrap();
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, b"Succ\xffeded\n".to_vec())));
        let (result, _) = check(&condition, &query).await;
        assert!(result);
    }

    #[test]
    fn splits_output_like_a_line_reader() {
        fn lines(bytes: &[u8]) -> Vec<String> {
            output_lines(bytes).map(|l| l.into_owned()).collect()
        }

        assert!(lines(b"").is_empty());
        assert_eq!(vec![""], lines(b"\n"));
        assert_eq!(vec!["Running"], lines(b"Running"));
        assert_eq!(vec!["Running"], lines(b"Running\r\n"));
        assert_eq!(vec!["Pending", "", "Running"], lines(b"Pending\n\nRunning\n"));
        assert_eq!(vec!["\u{fffd}", "Running"], lines(b"\xff\nRunning"));
    }

    #[tokio::test]
    async fn resolves_placeholders_into_the_command() {
        let condition = PodStatusCondition::new("${JOB}_Worker", Some("${NS}"), "RUNNING").unwrap();
        let mut env = HashMap::new();
        env.insert("JOB".to_owned(), "Nightly".to_owned());
        env.insert("NS".to_owned(), "ci".to_owned());

        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Running")));
        assert!(condition
            .check(&env, &query, &mut Vec::<String>::new())
            .await
            .unwrap());
        assert_eq!(
            vec![
                "kubectl get -o template pod/nightly-worker --namespace=ci --template={{.status.phase}}"
                    .to_owned()
            ],
            query.seen()
        );
    }

    #[tokio::test]
    async fn empty_pod_name_is_an_error() {
        let condition = PodStatusCondition::new("${EMPTY}", None, "RUNNING").unwrap();
        let mut env = HashMap::new();
        env.insert("EMPTY".to_owned(), String::new());

        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Running")));
        let result = condition
            .check(&env, &query, &mut Vec::<String>::new())
            .await;
        assert_eq!(Err(ConditionError::EmptyPodName), result);
        assert!(query.seen().is_empty());
    }

    #[tokio::test]
    async fn evaluate_distinguishes_outcomes() {
        let condition = running_condition();
        let mut sink: Vec<String> = Vec::new();
        let env = HashMap::new();

        let matched = FakeQuery::new(|| Ok(QueryOutput::new(0, "ContainerCreating")));
        assert_eq!(
            CheckOutcome::Matched,
            condition.evaluate(&env, &matched, &mut sink).await.unwrap()
        );

        let not_matched = FakeQuery::new(|| Ok(QueryOutput::new(0, "Failed")));
        assert_eq!(
            CheckOutcome::NotMatched,
            condition.evaluate(&env, &not_matched, &mut sink).await.unwrap()
        );

        let failed = FakeQuery::new(|| Ok(QueryOutput::new(1, "")));
        assert_eq!(
            CheckOutcome::QueryFailed {
                reason: "kubectl get -o template pod/my-pod --template={{.status.phase}} exited with status 1"
                    .to_owned()
            },
            condition.evaluate(&env, &failed, &mut sink).await.unwrap()
        );

        let killed = FakeQuery::new(|| {
            Ok(QueryOutput {
                exit_code: None,
                stdout: b"Running".to_vec(),
            })
        });
        assert!(!condition
            .evaluate(&env, &killed, &mut sink)
            .await
            .unwrap()
            .is_match());
    }

    #[tokio::test]
    async fn repeated_checks_agree() {
        let query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Pending")));
        let condition = running_condition();
        let (first, _) = check(&condition, &query).await;
        let (second, _) = check(&condition, &query).await;
        assert_eq!(first, second);
        assert_eq!(2, query.seen().len());
    }

    #[tokio::test]
    async fn check_all_keeps_condition_order() {
        let conditions = vec![
            PodStatusCondition::new("a", None, "RUNNING").unwrap(),
            PodStatusCondition::new("b", None, "COMPLETED").unwrap(),
            PodStatusCondition::new("", None, "RUNNING").unwrap(),
        ];
        let mut query = FakeQuery::new(|| Ok(QueryOutput::new(0, "Running")));
        query.stderr = vec!["warning"];
        let mut sink: Vec<String> = Vec::new();

        let outcomes = check_all(&conditions, &HashMap::new(), &query, &mut sink).await;
        assert_eq!(
            vec![
                Ok(CheckOutcome::Matched),
                Ok(CheckOutcome::NotMatched),
                Err(ConditionError::EmptyPodName),
            ],
            outcomes
        );
        assert_eq!(vec!["warning".to_owned(), "warning".to_owned()], sink);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let failed = CheckOutcome::QueryFailed {
            reason: "boom".to_owned(),
        };
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["outcome"], "query_failed");
        assert_eq!(v["reason"], "boom");
        assert_eq!(
            serde_json::json!({"outcome": "matched"}),
            serde_json::to_value(&CheckOutcome::Matched).unwrap()
        );
    }
}
