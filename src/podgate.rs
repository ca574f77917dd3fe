use pod_condition::config::Config;
use pod_condition::{check_all, CheckOutcome, PhaseClass, TracingSink};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_CODE_MATCHED: i32 = 0;
const EXIT_CODE_NOT_MATCHED: i32 = 1;
const EXIT_CODE_INVALID_CONFIG: i32 = 2;

#[derive(Serialize)]
struct Report<'a> {
    pod: &'a str,
    namespace: Option<&'a str>,
    expected: PhaseClass,
    #[serde(flatten)]
    outcome: &'a CheckOutcome,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::new_from_flags(env!("CARGO_PKG_VERSION")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_CODE_INVALID_CONFIG);
        }
    };

    // Log to stderr so stdout stays free for reports
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let query = config.query();
    let conditions = config.conditions();
    let mut sink = TracingSink::default();
    let outcomes = check_all(&conditions, &config.env, &query, &mut sink).await;

    let mut exit_code = EXIT_CODE_MATCHED;
    for (condition, outcome) in conditions.iter().zip(&outcomes) {
        match outcome {
            Ok(outcome) => {
                info!(
                    pod = condition.pod_name(),
                    expected = %condition.expected(),
                    matched = outcome.is_match(),
                    "pod status checked"
                );
                if config.json {
                    let report = Report {
                        pod: condition.pod_name(),
                        namespace: condition.namespace(),
                        expected: condition.expected(),
                        outcome,
                    };
                    println!("{}", serde_json::to_string(&report)?);
                }
                if !outcome.is_match() && exit_code == EXIT_CODE_MATCHED {
                    exit_code = EXIT_CODE_NOT_MATCHED;
                }
            }
            Err(e) => {
                error!(pod = condition.pod_name(), error = %e, "invalid pod configuration");
                exit_code = EXIT_CODE_INVALID_CONFIG;
            }
        }
    }

    std::process::exit(exit_code);
}
