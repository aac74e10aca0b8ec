//! Multish binary entry point.
//!
//! Wires stdin and the session event channel into the dispatcher and
//! runs the read/dispatch loop until `:quit` or end of input.

use std::process::ExitCode;

use multish::connect::SessionEvent;
use multish::{cli, logging, Dispatcher, SessionId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("multish: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    if let Some(level) = &args.log_level {
        std::env::set_var("RUST_LOG", format!("multish={}", level));
    }
    let mut debug = logging::init();
    if args.debug {
        debug.set(true);
    }
    info!("multish v{}", env!("CARGO_PKG_VERSION"));

    let (events_tx, mut events_rx) = mpsc::channel::<(SessionId, SessionEvent)>(256);
    let mut dispatcher = Dispatcher::new(std::io::stdout(), events_tx, debug);

    if let Some(path) = &args.log_output {
        if let Err(e) = dispatcher.enable_transcript(path.clone()) {
            eprintln!("multish: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let hosts = if args.hosts.is_empty() {
        vec!["localhost".to_string()]
    } else {
        args.hosts.clone()
    };
    for host in &hosts {
        dispatcher.add_host(host);
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    dispatcher.show_prompt();

    // Session output is applied as it arrives so `:send_ctrl` can be
    // typed at the waiting prompt while jobs are still running.
    loop {
        tokio::select! {
            line = stdin.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        dispatcher.handle_line(&line);
                        if dispatcher.is_done() {
                            break;
                        }
                        dispatcher.show_prompt();
                    }
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("multish: {}", e);
                        break;
                    }
                }
            }
            event = events_rx.recv() => {
                match event {
                    Some((id, event)) => {
                        let before = dispatcher.prompt();
                        dispatcher.handle_event(id, event);
                        let after = dispatcher.prompt();
                        if before != after {
                            dispatcher.show_prompt();
                        }
                    }
                    None => break,
                }
            }
        }
    }

    dispatcher.shutdown();
    info!("multish exiting");
    ExitCode::SUCCESS
}
