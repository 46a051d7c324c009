use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use premia_core::{AppConfig, ConfigOverrides, LoadOptions, ProductVertical, ProposalId};
use premia_engine::{AggregationEngine, NoopEvents, SessionPhase, SettleOutcome};
use premia_source::{HttpQuoteSource, StaticCredential};

use crate::commands::CommandResult;

#[derive(Debug, Clone)]
pub struct PollArgs {
    pub proposal: String,
    pub vertical: String,
    pub config: Option<PathBuf>,
}

pub fn run(args: PollArgs) -> CommandResult {
    let vertical: ProductVertical = match args.vertical.parse() {
        Ok(vertical) => vertical,
        Err(error) => return CommandResult::failure("poll", "usage", error.to_string(), 2),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "poll",
                "runtime",
                format!("could not start async runtime: {error}"),
                1,
            )
        }
    };

    match runtime.block_on(poll_to_settlement(args, vertical)) {
        Ok(summary) => summary,
        Err(error) => CommandResult::failure("poll", "session", format!("{error:#}"), 1),
    }
}

async fn poll_to_settlement(
    args: PollArgs,
    vertical: ProductVertical,
) -> anyhow::Result<CommandResult> {
    let config = AppConfig::load(LoadOptions {
        require_file: args.config.is_some(),
        config_path: args.config,
        overrides: ConfigOverrides::default(),
    })
    .context("loading configuration")?;
    init_logging(&config);

    let credentials = Arc::new(StaticCredential::new(config.source.bearer_token.clone()));
    let source =
        Arc::new(HttpQuoteSource::new(&config.source, credentials).context("building client")?);
    let engine =
        AggregationEngine::new(source, config.vertical(vertical), Arc::new(NoopEvents));

    let mut rx = engine.subscribe(ProposalId(args.proposal.clone()));
    loop {
        let terminal = {
            let snapshot = rx.borrow_and_update();
            println!(
                "{}",
                serde_json::to_string(&*snapshot).context("serializing snapshot")?
            );
            snapshot.phase.is_terminal().then(|| {
                (snapshot.phase, snapshot.settle_outcome, snapshot.results.len())
            })
        };

        if let Some((phase, outcome, result_count)) = terminal {
            return Ok(summarize(&args.proposal, phase, outcome, result_count));
        }
        if rx.changed().await.is_err() {
            anyhow::bail!("session channel closed before reaching a terminal phase");
        }
    }
}

fn summarize(
    proposal: &str,
    phase: SessionPhase,
    outcome: Option<SettleOutcome>,
    result_count: usize,
) -> CommandResult {
    match (phase, outcome) {
        (SessionPhase::Settled, Some(SettleOutcome::HasResults)) => CommandResult::success(
            "poll",
            format!("proposal {proposal} settled with {result_count} quote(s)"),
        ),
        (SessionPhase::Settled, _) => CommandResult::success(
            "poll",
            format!("proposal {proposal} settled without displayable quotes"),
        ),
        (SessionPhase::Errored, _) => CommandResult::failure(
            "poll",
            "session_error",
            format!("session for proposal {proposal} ended in an error; see snapshots above"),
            1,
        ),
        (phase, _) => CommandResult::failure(
            "poll",
            "session_error",
            format!("session ended in unexpected phase {phase:?}"),
            1,
        ),
    }
}

fn init_logging(config: &AppConfig) {
    use premia_core::LogFormat::{Compact, Json, Pretty};
    use tracing::Level;

    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(level);

    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::{run, PollArgs};

    #[test]
    fn unknown_vertical_fails_with_a_usage_error() {
        let result = run(PollArgs {
            proposal: "prop-1".to_owned(),
            vertical: "boat".to_owned(),
            config: None,
        });

        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("usage"));
        assert!(result.output.contains("boat"));
    }
}
