//! Construction of the `kubectl` query for a pod's phase.

use std::fmt;

use crate::pod_ref::PodRef;

/// The name the query tool goes by in rendered commands.
pub const KUBECTL: &str = "kubectl";

const PHASE_TEMPLATE: &str = "--template={{.status.phase}}";

/// The arguments of a `kubectl` invocation.
///
/// The program itself is chosen by whoever runs the command, so that a
/// differently installed `kubectl` can be used. `Display` renders the command
/// as a single string for logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryCommand {
    args: Vec<String>,
}

impl QueryCommand {
    /// Build the query that prints only the phase of `pod`.
    ///
    /// `pod` is expected to be resolved already (see [`PodRef::resolve`]).
    pub fn pod_phase(pod: &PodRef) -> Self {
        let mut args = vec![
            "get".to_owned(),
            "-o".to_owned(),
            "template".to_owned(),
            format!("pod/{}", pod.name),
        ];
        if let Some(namespace) = &pod.namespace {
            args.push(format!("--namespace={}", namespace));
        }
        args.push(PHASE_TEMPLATE.to_owned());
        QueryCommand { args }
    }

    /// The arguments to pass to `kubectl`.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for QueryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", KUBECTL, self.args.join(" "))
    }
}
