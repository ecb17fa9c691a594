//! Command-line entry point for the task workflow gates.
//!
//! Usage:
//!
//! ```text
//! taskgate start-task --task 42 --slug "add retry"
//! taskgate check-branch
//! PR_BRANCH=... PR_TITLE=... PR_BODY=... taskgate check-pr-scope
//! taskgate finish-task --poll-timeout-secs 900
//! taskgate sync
//! taskgate status
//! ```
//!
//! Every command prints one `PASS`/`FAIL` line per gate on stdout and exits
//! `0` on success, `1` on a policy violation, and `2` when `git` or `gh` is
//! unavailable. Logs go to stderr and are filtered with `RUST_LOG`.

use clap::{Parser, Subcommand};
use mockable::DefaultClock;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use taskgate::{
    config::{BypassFlags, DEFAULT_BRANCH, DEFAULT_REMOTE, RunConfig},
    workflow::{
        adapters::{GhCli, GitCli, TokioSleeper},
        domain::{CheckSnapshot, DeclarationMode, GuardLog},
        services::{
            BranchDeletion, CommitGuard, EXIT_ENVIRONMENT, EXIT_SUCCESS, FinishTaskPipeline,
            PostMergeVerifier, PrScopeGuard, PrScopeInput, StartTaskRequest, StartTaskService,
            StatusService, TaskStatus, WorkflowError, WorkflowResult,
        },
    },
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Enforces one task in flight: one branch, one pull request, gated merge.
#[derive(Parser, Debug)]
#[command(name = "taskgate", version, about)]
struct Cli {
    /// Repository to operate on (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Default branch name
    #[arg(long, global = true, env = "TASKGATE_DEFAULT_BRANCH", default_value = DEFAULT_BRANCH)]
    default_branch: String,

    /// Remote name
    #[arg(long, global = true, env = "TASKGATE_REMOTE", default_value = DEFAULT_REMOTE)]
    remote: String,

    /// How pull requests declare their task: strict or loose
    #[arg(
        long,
        global = true,
        env = "TASKGATE_DECLARATION_MODE",
        default_value = "strict",
        value_parser = parse_declaration_mode
    )]
    declaration_mode: DeclarationMode,

    /// Allow start-task while other task pull requests are open
    #[arg(long, global = true, env = "TASKGATE_ALLOW_OPEN_TASK_PRS")]
    allow_open_task_prs: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a task branch once the sequencing gate passes
    StartTask {
        /// Task reference: 42, 042, or TASK-042
        #[arg(long)]
        task: String,
        /// Free-text summary, turned into the branch slug
        #[arg(long)]
        slug: String,
    },
    /// Commit/push guard: the checked-out branch must be a task branch
    CheckBranch,
    /// Validate pull request scope from CI-provided text
    CheckPrScope {
        /// Pull request head branch
        #[arg(long, env = "PR_BRANCH")]
        branch: String,
        /// Pull request title
        #[arg(long, env = "PR_TITLE", default_value = "")]
        title: String,
        /// Pull request body
        #[arg(long, env = "PR_BODY", default_value = "")]
        body: String,
    },
    /// Run every gate, wait for checks, squash-merge, and sync
    FinishTask {
        /// Seconds between check polls
        #[arg(long, env = "TASKGATE_POLL_INTERVAL_SECS", default_value_t = 10)]
        poll_interval_secs: u64,
        /// Seconds to wait for checks before giving up
        #[arg(long, env = "TASKGATE_POLL_TIMEOUT_SECS", default_value_t = 1800)]
        poll_timeout_secs: u64,
    },
    /// Switch to the default branch and fast-forward it
    Sync,
    /// Show the current branch, task, pull request, and checks
    Status,
}

fn parse_declaration_mode(value: &str) -> Result<DeclarationMode, String> {
    DeclarationMode::try_from(value)
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::default()
            .with_default_branch(self.default_branch.clone())
            .with_remote(self.remote.clone())
            .with_declaration_mode(self.declaration_mode)
            .with_bypass(BypassFlags {
                allow_open_task_prs: self.allow_open_task_prs,
            });
        if let Command::FinishTask {
            poll_interval_secs,
            poll_timeout_secs,
        } = &self.command
        {
            config = config
                .with_poll_interval(Duration::from_secs(*poll_interval_secs))
                .with_poll_timeout(Duration::from_secs(*poll_timeout_secs));
        }
        config
    }

    fn git(&self) -> GitCli {
        self.repo.as_ref().map_or_else(GitCli::new, GitCli::in_dir)
    }

    fn gh(&self) -> GhCli {
        self.repo.as_ref().map_or_else(GhCli::new, GhCli::in_dir)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
    debug!(?cli, "parsed CLI arguments");

    let config = cli.run_config();
    let mut lines: Vec<String> = config
        .bypasses_in_effect()
        .into_iter()
        .map(|bypass| {
            warn!(bypass = bypass.flag_name(), "bypass in effect");
            format!("BYPASS {bypass} is set")
        })
        .collect();

    let mut log = GuardLog::new();
    let outcome = dispatch(&cli, &config, &mut log).await;
    lines.extend(log.results().iter().map(ToString::to_string));
    let code = match outcome {
        Ok(summary) => {
            lines.extend(summary);
            EXIT_SUCCESS
        }
        Err(err) => {
            lines.push(render_failure(&err));
            err.exit_code()
        }
    };

    match emit(&lines) {
        Ok(()) => ExitCode::from(code),
        Err(_) => ExitCode::from(EXIT_ENVIRONMENT),
    }
}

fn emit(lines: &[String]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()
}

fn render_failure(err: &WorkflowError) -> String {
    err.to_guard_result().map_or_else(
        || format!("ERROR {err}\n  next: {}", err.remediation()),
        |result| result.to_string(),
    )
}

async fn dispatch(
    cli: &Cli,
    config: &RunConfig,
    log: &mut GuardLog,
) -> WorkflowResult<Vec<String>> {
    let vcs = Arc::new(cli.git());
    let service = Arc::new(cli.gh());

    match &cli.command {
        Command::StartTask { task, slug } => {
            let starter = StartTaskService::new(vcs, service, config.clone());
            let branch = starter.start(&StartTaskRequest::new(task, slug), log).await?;
            Ok(vec![format!("created and switched to '{branch}'")])
        }
        Command::CheckBranch => {
            let (_, result) = CommitGuard::new(vcs).check().await?;
            log.record(result);
            Ok(Vec::new())
        }
        Command::CheckPrScope {
            branch,
            title,
            body,
        } => {
            let input = PrScopeInput {
                branch: branch.clone(),
                title: title.clone(),
                body: body.clone(),
            };
            PrScopeGuard::new(config.declaration_mode()).check(&input, log)?;
            Ok(Vec::new())
        }
        Command::FinishTask { .. } => {
            let pipeline = FinishTaskPipeline::new(
                vcs,
                service,
                Arc::new(DefaultClock),
                Arc::new(TokioSleeper),
                config,
            );
            let finished = pipeline.run(log).await?;
            let receipt = &finished.receipt;
            let mut summary = vec![format!(
                "merged {} ({}) as {}",
                finished.task_id, receipt.number, receipt.commit
            )];
            if let BranchDeletion::Failed { reason } = &receipt.deletion {
                summary.push(format!(
                    "WARN remote branch '{}' was not deleted: {reason}\n  next: {}",
                    receipt.branch,
                    pipeline.deletion_remediation(&receipt.branch)
                ));
            }
            Ok(summary)
        }
        Command::Sync => {
            let verifier =
                PostMergeVerifier::new(vcs, config.remote(), config.default_branch());
            let report = verifier.sync().await?;
            let tip = report
                .tip
                .as_ref()
                .map_or_else(|| String::from("<empty>"), |tip| tip.short().to_owned());
            Ok(vec![format!("synced '{}' to {tip}", report.branch)])
        }
        Command::Status => {
            let status = StatusService::new(vcs, service, config.declaration_mode())
                .status()
                .await?;
            Ok(render_status(&status))
        }
    }
}

fn render_status(status: &TaskStatus) -> Vec<String> {
    let mut lines = vec![format!("branch: {}", status.branch)];
    lines.push(match &status.task {
        Ok(task) => format!("task: {task}"),
        Err(err) => format!("task: none ({err})"),
    });
    if let Some(pr) = &status.pull_request {
        lines.push(format!("pull request: {} {} {}", pr.number(), pr.state(), pr.url()));
    } else if status.task.is_ok() {
        lines.push(String::from("pull request: none"));
    }
    if let Some(declaration) = &status.declaration {
        lines.push(match declaration {
            Ok(task) => format!("declared: {task}"),
            Err(err) => format!("declared: invalid ({err})"),
        });
    }
    if let Some(checks) = &status.checks {
        lines.push(render_checks(checks));
    }
    lines
}

fn render_checks(checks: &CheckSnapshot) -> String {
    format!("checks: {checks} (overall {})", checks.aggregate())
}
