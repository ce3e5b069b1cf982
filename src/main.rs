mod batch;
mod changelog;
mod cli;
mod config;
mod error;
mod extract;
mod jira;
mod progress;
mod resolve;
mod step;
mod ui;

use std::collections::HashMap;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use changelog::{ChangeEntry, ChangeLogReader};
use cli::{ChangeLogArgs, Cli, Command, UpdateArgs};
use config::{AppConfig, SiteConfig};
use extract::{IssuePattern, extract_from_change_log};
use step::{BuildContext, BuildResult, IssueSource, IssueUpdateStep};
use ui::{BuildLog, TerminalSink};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(BuildResult::Success) => ExitCode::SUCCESS,
        Ok(BuildResult::Failure) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<BuildResult> {
    let Cli {
        command,
        config: config_path,
        json,
        ..
    } = cli;
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    match command {
        Command::Scan { range } => {
            let pattern = match &config.site {
                Some(site) => site.pattern()?,
                None => IssuePattern::default(),
            };
            tracing::debug!(pattern = pattern.as_str(), "scanning change log");
            let entries = read_change_log(&range)?;
            for key in extract_from_change_log(&entries, &pattern) {
                println!("{key}");
            }
            Ok(BuildResult::Success)
        }
        Command::Progress { jql, update } => {
            run_step(&config, json, IssueSource::Query(jql), update, Vec::new()).await
        }
        Command::Update { range, update } => {
            let entries = read_change_log(&range)?;
            run_step(&config, json, IssueSource::ChangeLog, update, entries).await
        }
    }
}

fn read_change_log(range: &ChangeLogArgs) -> Result<Vec<ChangeEntry>> {
    let reader = ChangeLogReader::open(&range.repo)?;
    reader.entries(range.since.as_deref(), &range.until)
}

async fn run_step(
    config: &AppConfig,
    json: bool,
    source: IssueSource,
    update: UpdateArgs,
    change_log: Vec<ChangeEntry>,
) -> Result<BuildResult> {
    let site = config
        .site
        .as_ref()
        .map(SiteConfig::connect)
        .transpose()
        .context("failed to bind Jira site")?;
    let ctx = BuildContext::new(site)
        .with_env(build_env())
        .with_change_log(change_log);

    let mut step = IssueUpdateStep::new(source, update.action, update.comment);
    step.comment_group = update.comment_group;
    step.comment_role = update.comment_role;

    let mut log = BuildLog::new(TerminalSink::start("Updating Jira issues..."));
    let outcome = step.perform(&ctx, &mut log).await;
    log.get_ref().finish();
    let run = outcome.context("issue lookup failed")?;

    ui::print_summary(&run.report);
    if json {
        ui::print_report(&run.report);
    }
    Ok(run.result)
}

// Non-UTF-8 variables cannot be referenced from JQL or comments anyway.
fn build_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
