//! Configuration for a pod status check
//!
//! The best way to configure a check is by using [`Config::default_config`]
//! or by turning on the "cli" feature and using [`Config::new_from_flags`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "cli")]
use std::ffi::OsString;

#[cfg(feature = "cli")]
use structopt::clap::ErrorKind;
#[cfg(feature = "cli")]
use structopt::StructOpt;

use crate::command::KUBECTL;
use crate::condition::PodStatusCondition;
use crate::phase::PhaseClass;
use crate::pod_ref::PodRef;
use crate::query::KubectlQuery;

/// The configuration needed to check one or more pods.
#[derive(Clone, Debug)]
pub struct Config {
    /// The `kubectl` binary to run
    pub kubectl: PathBuf,
    /// Templates of the pods to check
    pub pod_names: Vec<String>,
    /// Template of the namespace the pods live in, if not the current one
    pub namespace: Option<String>,
    /// The class every pod's phase must fall into
    pub expected: PhaseClass,
    /// Variables available to placeholders, also exported to `kubectl`
    pub env: HashMap<String, String>,
    /// How long a single query may take, unbounded if unset
    pub timeout: Option<Duration>,
    /// Whether to print a JSON report for each pod
    pub json: bool,
}

impl Config {
    /// Returns a Config object set with all of the defaults.
    ///
    /// No pods are configured and the environment is empty.
    pub fn default_config() -> Self {
        Config {
            kubectl: PathBuf::from(KUBECTL),
            pod_names: Vec::new(),
            namespace: None,
            expected: PhaseClass::Running,
            env: HashMap::new(),
            timeout: None,
            json: false,
        }
    }

    /// Parses all command line flags and sets the proper defaults. The version
    /// of your application should be passed to set the proper version for the CLI
    ///
    /// The placeholder environment is the process environment with any
    /// `--env` pairs laid over it. Invalid flags are returned as an error;
    /// `--help` and `--version` print their output and exit the process.
    #[cfg(feature = "cli")]
    pub fn new_from_flags(version: &str) -> anyhow::Result<Self> {
        Self::new_from_args(version, std::env::args_os())
    }

    /// Like [`Config::new_from_flags`], but parses `args` instead of the
    /// arguments of the process. The first argument is the program name.
    #[cfg(feature = "cli")]
    pub fn new_from_args<I, T>(version: &str, args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let app = Opts::clap().version(version);
        let matches = match app.get_matches_from_safe(args) {
            Ok(matches) => matches,
            Err(e) if matches!(e.kind, ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed) => {
                e.exit()
            }
            Err(e) => return Err(e.into()),
        };
        let opts = Opts::from_clap(&matches);
        // Variables that are not valid unicode cannot appear in a template
        let process_env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Ok(Self::from_opts(opts, process_env))
    }

    #[cfg(feature = "cli")]
    fn from_opts(opts: Opts, process_env: impl Iterator<Item = (String, String)>) -> Self {
        let mut env: HashMap<String, String> = process_env.collect();
        env.extend(opts.env.iter().filter_map(|i| split_one_pair(i)));

        Config {
            kubectl: opts.kubectl,
            pod_names: opts.pod_names,
            namespace: opts.namespace,
            expected: opts.status,
            env,
            timeout: opts.timeout.map(Duration::from_secs),
            json: opts.json,
        }
    }

    /// One condition per configured pod.
    pub fn conditions(&self) -> Vec<PodStatusCondition> {
        self.pod_names
            .iter()
            .map(|name| {
                PodStatusCondition::with_expected(
                    PodRef::new(name.as_str(), self.namespace.as_deref()),
                    self.expected,
                )
            })
            .collect()
    }

    /// The query launcher described by this configuration.
    pub fn query(&self) -> KubectlQuery {
        let query = KubectlQuery::new(&self.kubectl);
        match self.timeout {
            Some(timeout) => query.with_timeout(timeout),
            None => query,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// CLI options that can be configured for a check
///
/// These can be parsed from args using `Opts::from_args()`
#[derive(StructOpt, Clone, Debug)]
#[cfg(feature = "cli")]
#[structopt(
    name = "podgate",
    about = "Exits successfully when Kubernetes pods are in the expected phase"
)]
pub struct Opts {
    #[structopt(
        short = "n",
        long = "namespace",
        env = "PODGATE_NAMESPACE",
        help = "The namespace of the pods. Placeholders like ${VAR} are expanded. Defaults to the current namespace of kubectl"
    )]
    namespace: Option<String>,

    #[structopt(
        short = "s",
        long = "status",
        default_value = "RUNNING",
        env = "PODGATE_STATUS",
        possible_values = &["RUNNING", "COMPLETED"],
        help = "The expected status. RUNNING covers pending, creating and running pods, COMPLETED everything else"
    )]
    status: PhaseClass,

    #[structopt(
        long = "kubectl",
        default_value = KUBECTL,
        env = "PODGATE_KUBECTL",
        help = "The kubectl binary to run"
    )]
    kubectl: PathBuf,

    #[structopt(
        long = "timeout",
        env = "PODGATE_TIMEOUT",
        help = "Seconds to wait for each kubectl call before giving up. Waits indefinitely by default"
    )]
    timeout: Option<u64>,

    #[structopt(
        short = "e",
        long = "env",
        number_of_values = 1,
        help = "Extra variables for placeholder expansion, as KEY=VALUE. Overrides the process environment"
    )]
    env: Vec<String>,

    #[structopt(long = "json", help = "Print a JSON report for each pod on stdout")]
    json: bool,

    #[structopt(
        required = true,
        help = "Names of the pods to check. Placeholders like ${VAR} are expanded, then names are lower-cased and '_' becomes '-'"
    )]
    pod_names: Vec<String>,
}

#[cfg(feature = "cli")]
fn split_one_pair(in_string: &str) -> Option<(String, String)> {
    let mut splitter = in_string.splitn(2, '=');

    match splitter.next() {
        Some("") | None => None,
        Some(key) => match splitter.next() {
            Some(val) => Some((key.to_string(), val.to_string())),
            None => Some((key.to_string(), String::new())),
        },
    }
}
