//! Line-oriented interactive session over stdin.

use anyhow::Result;
use okrflow::core::StageId;
use okrflow::orchestrator::{Orchestrator, StageRunOutcome};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::render;

const HELP: &str = "\
Commands:
  logs <text>     append a log line to the draft (\\n splits lines)
  clear           empty the draft
  sample          load the sample logs
  run <1-5>       run a step
  retry           retry the last failed step
  dismiss         dismiss the current error
  reset           start over
  status          show progress
  show <1-5>      show a step's output
  export <dir>    write results as JSON into <dir>
  help            show this text
  quit            leave the shell";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Logs(String),
    Clear,
    Sample,
    Run(StageId),
    Retry,
    Dismiss,
    Reset,
    Status,
    Show(StageId),
    Export(PathBuf),
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    /// Parses one input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "logs" if rest.is_empty() => return Err("usage: logs <text>".to_string()),
            "logs" => Self::Logs(rest.replace("\\n", "\n")),
            "clear" => Self::Clear,
            "sample" => Self::Sample,
            "run" => Self::Run(parse_stage(rest)?),
            "retry" => Self::Retry,
            "dismiss" => Self::Dismiss,
            "reset" => Self::Reset,
            "status" => Self::Status,
            "show" => Self::Show(parse_stage(rest)?),
            "export" if rest.is_empty() => return Err("usage: export <dir>".to_string()),
            "export" => Self::Export(PathBuf::from(rest)),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };
        Ok(command)
    }

    /// Text shown while the command waits on a stage call.
    pub fn progress_message(&self) -> Option<&'static str> {
        match self {
            Self::Run(stage) => Some(stage.loading_message()),
            _ => None,
        }
    }
}

fn parse_stage(raw: &str) -> Result<StageId, String> {
    raw.parse::<usize>()
        .ok()
        .and_then(StageId::from_index)
        .ok_or_else(|| format!("expected a step number from 1 to 5, got '{raw}'"))
}

/// Runs the interactive loop until `quit` or end of input.
pub async fn run(orchestrator: &Orchestrator) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"okrflow shell; type 'help' for commands\n").await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let reply = match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => {
                if let Some(progress) = command.progress_message() {
                    stdout.write_all(progress.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await?;
                }
                execute(orchestrator, command).await
            }
            Err(message) => message,
        };
        if !reply.is_empty() {
            stdout.write_all(reply.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
    }
    Ok(())
}

async fn execute(orchestrator: &Orchestrator, command: ShellCommand) -> String {
    match command {
        ShellCommand::Logs(text) => {
            let mut draft = orchestrator.draft_logs();
            if !draft.is_empty() && !draft.ends_with('\n') {
                draft.push('\n');
            }
            draft.push_str(&text);
            orchestrator.set_draft_logs(draft);
            render::draft(&orchestrator.draft_logs())
        }
        ShellCommand::Clear => {
            orchestrator.set_draft_logs("");
            "Draft cleared".to_string()
        }
        ShellCommand::Sample => {
            orchestrator.load_sample_logs();
            render::draft(&orchestrator.draft_logs())
        }
        ShellCommand::Run(stage) => {
            let outcome = orchestrator.run_stage(stage).await;
            report(orchestrator, &outcome)
        }
        ShellCommand::Retry => {
            let outcome = orchestrator.retry_last_failure().await;
            report(orchestrator, &outcome)
        }
        ShellCommand::Dismiss => {
            orchestrator.dismiss_error();
            "Error dismissed".to_string()
        }
        ShellCommand::Reset => {
            orchestrator.reset();
            "Started a new run".to_string()
        }
        ShellCommand::Status => render::status(&orchestrator.snapshot(), &orchestrator.stage_views()),
        ShellCommand::Show(stage) => {
            let unlocked = orchestrator.unlocked_stage();
            if stage > unlocked {
                format!("Step {} is locked; complete step {} first", stage.index(), unlocked.index())
            } else {
                render::output(stage, orchestrator.stage_output(stage).as_ref())
            }
        }
        ShellCommand::Export(dir) => match orchestrator.export_to_dir(&dir).await {
            Ok(path) => format!("Results saved to {}", path.display()),
            Err(err) => format!("Export failed: {err}"),
        },
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Quit | ShellCommand::Empty => String::new(),
    }
}

fn report(orchestrator: &Orchestrator, outcome: &StageRunOutcome) -> String {
    match outcome {
        StageRunOutcome::Succeeded { stage } => {
            let mut text = outcome.to_string();
            text.push('\n');
            text.push_str(&render::output(*stage, orchestrator.stage_output(*stage).as_ref()));
            text
        }
        StageRunOutcome::Failed { .. } => format!("{outcome}\n(type 'retry' or 'dismiss')"),
        _ => outcome.to_string(),
    }
}
