//! nudgemux-send - deliver one nudge to one tmux pane
//!
//! Usage:
//!   nudgemux-send <session> <message>
//!   nudgemux-send --json agent:0.0 "status update please"
//!
//! Exit codes map to the delivery error taxonomy so callers can branch
//! on the failure kind without parsing output.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use nudgemux_core::{NudgeError, NudgeRequest, Nudger, TmuxDriver};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nudgemux-send")]
#[command(about = "Deliver a message into a TUI running in a tmux pane")]
#[command(version)]
struct Args {
    /// Target pane (a session name, or session:window.pane)
    session: String,

    /// Message to inject and submit
    message: String,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let request = NudgeRequest {
        session: args.session,
        message: args.message,
    };
    let nudger = Nudger::new(Arc::new(TmuxDriver::new()));
    let outcome = nudger.deliver_request(&request).await;

    if args.json {
        let report = serde_json::json!({
            "session": request.session,
            "delivered": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        println!("{report}");
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("nudge failed: {err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Stable per-kind exit codes.
fn exit_code_for(err: &NudgeError) -> u8 {
    match err {
        NudgeError::PaneBlocked => 10,
        NudgeError::PasteDetected => 11,
        NudgeError::SentinelNotFound => 12,
        NudgeError::ClearStalled => 13,
        NudgeError::ClearIterationLimitExceeded(_) => 14,
        NudgeError::Driver(_) => 20,
    }
}
