//! Input classification, broadcast dispatch and control routing.
//!
//! The dispatcher owns the shell group and drives everything the
//! controller does with a submitted line: `#` comments are echoed,
//! `!` lines run locally, `:` lines go to the control interpreter,
//! and everything else is broadcast to every active session. Session
//! output arrives as events from per-session reader tasks; the
//! dispatcher scans each stream for its prompt marker to track job
//! completion and render the `ready`/`waiting` prompt.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::debug;

use crate::complete;
use crate::connect::{self, SessionEvent};
use crate::control::{self, CommandInfo};
use crate::error::MultishError;
use crate::logging::DebugToggle;
use crate::output::ScanEvent;
use crate::session::{SessionId, ShellGroup, ShellSession};
use crate::transcript::Transcript;
use crate::Result;

/// The broadcast dispatcher and control-command interpreter.
///
/// Generic over the output sink so tests can capture what the
/// controller prints.
pub struct Dispatcher<W: Write> {
    group: ShellGroup,
    transcript: Transcript,
    debug: DebugToggle,
    events_tx: mpsc::Sender<(SessionId, SessionEvent)>,
    out: W,
    done: bool,
}

impl<W: Write> Dispatcher<W> {
    /// Create a dispatcher writing to `out`. New sessions' reader
    /// tasks will report through `events_tx`.
    pub fn new(
        out: W,
        events_tx: mpsc::Sender<(SessionId, SessionEvent)>,
        debug: DebugToggle,
    ) -> Self {
        Self {
            group: ShellGroup::new(),
            transcript: Transcript::new(),
            debug,
            events_tx,
            out,
            done: false,
        }
    }

    /// The session registry (exposed for startup wiring and tests).
    pub fn group(&self) -> &ShellGroup {
        &self.group
    }

    /// Mutable session registry access.
    pub fn group_mut(&mut self) -> &mut ShellGroup {
        &mut self.group
    }

    /// Whether `:quit` has been requested.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Pre-enable transcript logging (CLI `--log-output`).
    pub fn enable_transcript(&mut self, path: impl Into<std::path::PathBuf>) -> Result<()> {
        self.transcript.enable(path.into())
    }

    /// Flip verbose tracing (CLI `--debug`).
    pub fn set_debug(&mut self, on: bool) {
        self.debug.set(on);
    }

    /// Open a connection for `host_spec` and register the session.
    /// Failures are reported inline and leave the group unchanged.
    pub fn add_host(&mut self, host_spec: &str) {
        let id = SessionId::new();
        match connect::open(host_spec, id, self.events_tx.clone()) {
            Ok(conn) => {
                let mut session = ShellSession::new(id, host_spec, conn);
                let primed = session.prime();
                let id = self.group.add(session);
                if primed.is_err() {
                    self.report_broken(id);
                }
            }
            Err(e) => self.emit(&e.to_string()),
        }
    }

    /// Render the current prompt: `ready (N)> ` when no active session
    /// has a pending job, `waiting (P/N)> ` while P of N are running.
    pub fn prompt(&self) -> String {
        let active = self.group.counts().active;
        let pending = self
            .group
            .iter()
            .filter(|s| s.pending_job && s.state.is_broadcast_eligible())
            .count();
        if pending == 0 {
            format!("ready ({})> ", active)
        } else {
            format!("waiting ({}/{})> ", pending, active)
        }
    }

    /// Write the prompt to the output sink (never to the transcript).
    pub fn show_prompt(&mut self) {
        let prompt = self.prompt();
        let _ = write!(self.out, "{}", prompt);
        let _ = self.out.flush();
    }

    /// Process one submitted line.
    ///
    /// Embedded tabs are expanded through the completion engine first,
    /// then the line is classified by its leading character.
    pub fn handle_line(&mut self, raw: &str) {
        let line = complete::expand_line(raw, &self.group.rendered_names());
        if line.is_empty() {
            return;
        }
        self.transcript.log_input(&line);

        match line.chars().next() {
            Some('#') => self.print(&line),
            Some('!') => self.run_local(&line[1..]),
            Some(':') => self.run_control(&line[1..]),
            _ => self.broadcast(&line),
        }
    }

    /// Process one event from a session's reader task.
    pub fn handle_event(&mut self, id: SessionId, event: SessionEvent) {
        match event {
            SessionEvent::Output(bytes) => self.handle_output(id, &bytes),
            SessionEvent::Closed => {
                let already_dead = self
                    .group
                    .get(id)
                    .map(|s| s.state.is_dead())
                    .unwrap_or(true);
                if !already_dead {
                    self.report_broken(id);
                }
            }
        }
    }

    /// Close every session's connection (controller exit).
    pub fn shutdown(&mut self) {
        for session in self.group.iter_mut() {
            session.close();
        }
    }

    // ------------------------------------------------------------------
    // Classification targets
    // ------------------------------------------------------------------

    /// Fan one command line out to every currently active session.
    ///
    /// A session whose channel breaks is marked dead and reported, and
    /// dispatch continues to the remaining sessions.
    fn broadcast(&mut self, line: &str) {
        let ids = self.group.active_ids();
        debug!("broadcasting to {} sessions", ids.len());
        for id in ids {
            let sent = match self.group.get_mut(id) {
                Some(session) => session.dispatch_line(line),
                None => continue,
            };
            if sent.is_err() {
                self.report_broken(id);
            }
        }
    }

    /// Run a `!` line in the controller's own environment.
    fn run_local(&mut self, cmd: &str) {
        debug!("local command: {}", cmd);
        let status = local_shell_command(cmd).status();
        if let Err(e) = status {
            self.emit(&e.to_string());
        }
    }

    /// Resolve and run a `:` control command.
    fn run_control(&mut self, input: &str) {
        let (token, args) = split_first_token(input);
        let Some(info) = control::resolve(token) else {
            self.emit(&MultishError::UnknownCommand(token.to_string()).to_string());
            return;
        };
        debug!("control command: {}", info.name);

        let result = match info.name {
            "add" => self.cmd_add(args),
            "chdir" => self.cmd_chdir(args),
            "disable" => self.cmd_disable(args),
            "enable" => self.cmd_enable(args),
            "help" => self.cmd_help(args),
            "hide_password" => self.cmd_hide_password(),
            "list" => self.cmd_list(args),
            "purge" => self.cmd_purge(),
            "quit" => self.cmd_quit(),
            "reconnect" => self.cmd_reconnect(args),
            "rename" => self.cmd_rename(args),
            "reset_prompt" => self.cmd_reset_prompt(args),
            "send_ctrl" => self.cmd_send_ctrl(args),
            "set_debug" => self.cmd_set_debug(args),
            "set_log" => self.cmd_set_log(args),
            _ => unreachable!("command table out of sync"),
        };
        if let Err(e) = result {
            self.emit(&e.to_string());
        }
    }

    // ------------------------------------------------------------------
    // Control command handlers
    // ------------------------------------------------------------------

    fn cmd_add(&mut self, args: &str) -> Result<()> {
        if args.split_whitespace().next().is_none() {
            return Err(MultishError::Usage("Expected at least one host".into()));
        }
        let hosts: Vec<String> = args.split_whitespace().map(str::to_string).collect();
        for host in hosts {
            self.add_host(&host);
        }
        Ok(())
    }

    fn cmd_chdir(&mut self, args: &str) -> Result<()> {
        let path = args.trim();
        if path.is_empty() {
            return Err(MultishError::Usage("Expected a path".into()));
        }
        match std::env::set_current_dir(path) {
            Ok(()) => {
                let cwd = std::env::current_dir()?;
                self.emit(&cwd.display().to_string());
            }
            // Surface the native error text with the path echoed;
            // the working directory is unchanged.
            Err(e) => self.emit(&format!("{}: '{}'", e, path)),
        }
        Ok(())
    }

    fn cmd_enable(&mut self, args: &str) -> Result<()> {
        let pattern = default_pattern(args);
        let resolved = self.group.enable(&pattern);
        self.report_unmatched(&resolved.unmatched);
        Ok(())
    }

    fn cmd_disable(&mut self, args: &str) -> Result<()> {
        let pattern = default_pattern(args);
        let resolved = self.group.disable(&pattern);
        self.report_unmatched(&resolved.unmatched);
        Ok(())
    }

    fn cmd_help(&mut self, args: &str) -> Result<()> {
        let arg = args.trim().trim_start_matches(':');
        if arg.is_empty() {
            for info in control::COMMANDS {
                self.print_help_line(info);
            }
            return Ok(());
        }
        if let Some(info) = control::resolve(arg) {
            let usage = info.usage;
            let help = info.help;
            self.emit(usage);
            self.emit(help);
            return Ok(());
        }
        let matches = control::matching(arg);
        if matches.is_empty() {
            return Err(MultishError::UnknownCommand(arg.to_string()));
        }
        for info in matches {
            self.print_help_line(info);
        }
        Ok(())
    }

    fn print_help_line(&mut self, info: &CommandInfo) {
        let line = format!(":{:<13} {}", info.name, info.help);
        self.emit(&line);
    }

    fn cmd_hide_password(&mut self) -> Result<()> {
        self.debug.set(false);
        self.transcript.redact();
        self.emit("Debugging disabled");
        self.emit("Logging disabled");
        Ok(())
    }

    fn cmd_list(&mut self, args: &str) -> Result<()> {
        let counts = if args.trim().is_empty() {
            self.group.counts()
        } else {
            let resolved = self.group.resolve(args);
            self.report_unmatched(&resolved.unmatched);
            self.group.counts_for(&resolved.ids)
        };
        self.emit(&format!(
            "{} active shells, {} dead shells, total: {}",
            counts.active, counts.dead, counts.total
        ));
        Ok(())
    }

    fn cmd_purge(&mut self) -> Result<()> {
        let removed = self.group.purge();
        debug!("purged {} dead sessions", removed);
        Ok(())
    }

    fn cmd_quit(&mut self) -> Result<()> {
        self.shutdown();
        self.done = true;
        Ok(())
    }

    fn cmd_reconnect(&mut self, args: &str) -> Result<()> {
        let pattern = default_pattern(args);
        let resolved = self.group.resolve(&pattern);
        self.report_unmatched(&resolved.unmatched);

        for id in resolved.ids {
            let dead = self.group.get(id).map(|s| s.state.is_dead()).unwrap_or(false);
            if !dead {
                continue;
            }
            let host_spec = match self.group.get(id) {
                Some(s) => s.host_spec.clone(),
                None => continue,
            };
            match connect::open(&host_spec, id, self.events_tx.clone()) {
                Ok(conn) => {
                    let primed = self.group.get_mut(id).map(|s| {
                        s.attach(conn);
                        s.prime()
                    });
                    if matches!(primed, Some(Err(_))) {
                        self.report_broken(id);
                    }
                }
                Err(e) => self.emit(&e.to_string()),
            }
        }
        Ok(())
    }

    fn cmd_rename(&mut self, args: &str) -> Result<()> {
        // No expression: names stay unchanged.
        if args.trim().is_empty() {
            return Ok(());
        }
        // Two or more tokens: the first is a pattern. A single token is
        // the rename expression applied to every session.
        let (first, rest) = split_first_token(args);
        let (pattern, expr) = if rest.is_empty() {
            ("*".to_string(), first.to_string())
        } else {
            (first.to_string(), rest.to_string())
        };

        let new_name = evaluate_rename_expression(&expr)?;
        if new_name.is_empty() {
            return Ok(());
        }
        let resolved = self.group.rename(&pattern, &new_name);
        self.report_unmatched(&resolved.unmatched);
        Ok(())
    }

    fn cmd_reset_prompt(&mut self, args: &str) -> Result<()> {
        let pattern = default_pattern(args);
        let resolved = self.group.resolve(&pattern);
        self.report_unmatched(&resolved.unmatched);

        for id in resolved.ids {
            let eligible = self
                .group
                .get(id)
                .map(|s| s.state.is_broadcast_eligible())
                .unwrap_or(false);
            if !eligible {
                continue;
            }
            let primed = self.group.get_mut(id).map(|s| s.prime());
            if matches!(primed, Some(Err(_))) {
                self.report_broken(id);
            }
        }
        Ok(())
    }

    fn cmd_send_ctrl(&mut self, args: &str) -> Result<()> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let letter = match tokens.as_slice() {
            [] => {
                return Err(MultishError::Usage("Expected at least a letter".into()));
            }
            [token] => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => c,
                    _ => {
                        return Err(MultishError::Usage(format!(
                            "Expected a single letter, got: {}",
                            token
                        )));
                    }
                }
            }
            _ => {
                return Err(MultishError::Usage(format!(
                    "Expected a single letter, got: {}",
                    args.trim()
                )));
            }
        };

        let ctrl = (letter.to_ascii_uppercase() as u8) & 0x1f;
        for id in self.group.active_ids() {
            let sent = self
                .group
                .get_mut(id)
                .map(|s| s.send_raw(&[ctrl]))
                .unwrap_or(Ok(()));
            if sent.is_err() {
                self.report_broken(id);
            }
        }
        Ok(())
    }

    fn cmd_set_debug(&mut self, args: &str) -> Result<()> {
        match args.trim() {
            "y" => {
                self.debug.set(true);
                Ok(())
            }
            "n" => {
                self.debug.set(false);
                Ok(())
            }
            other => Err(MultishError::Usage(format!(
                "Expected y or n, got: {}",
                other
            ))),
        }
    }

    fn cmd_set_log(&mut self, args: &str) -> Result<()> {
        let path = args.trim();
        if path.is_empty() {
            self.transcript.disable();
        } else {
            self.transcript.enable(path)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session output
    // ------------------------------------------------------------------

    fn handle_output(&mut self, id: SessionId, bytes: &[u8]) {
        let Some(session) = self.group.get_mut(id) else {
            return;
        };
        let events = session.scan(bytes);
        let name = session.rendered_name();
        let tag = self.group.len() > 1;

        for event in events {
            match event {
                ScanEvent::Line(line) => {
                    let muted = self.group.get(id).map(|s| s.muted).unwrap_or(true);
                    if muted {
                        continue;
                    }
                    let text = if tag {
                        format!("{}: {}", name, line)
                    } else {
                        line
                    };
                    self.emit(&text);
                }
                ScanEvent::Prompt => {
                    if let Some(session) = self.group.get_mut(id) {
                        session.pending_job = false;
                        session.muted = false;
                    }
                }
            }
        }
    }

    /// Mark a session dead and report it by name; other sessions are
    /// never affected.
    fn report_broken(&mut self, id: SessionId) {
        if let Some(session) = self.group.get_mut(id) {
            let name = session.rendered_name();
            session.mark_dead();
            self.emit(&MultishError::Connection(name).to_string());
        }
    }

    fn report_unmatched(&mut self, unmatched: &[String]) {
        for token in unmatched {
            self.emit(&MultishError::Lookup(token.clone()).to_string());
        }
    }

    /// Write a line to the output sink and the transcript.
    fn emit(&mut self, line: &str) {
        self.print(line);
        self.transcript.log_output(line);
    }

    /// Write a line to the output sink only.
    fn print(&mut self, line: &str) {
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }
}

/// Split the first whitespace-separated token from the rest.
fn split_first_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(i) => (&input[..i], input[i..].trim_start()),
        None => (input, ""),
    }
}

/// Empty patterns default to every session.
fn default_pattern(args: &str) -> String {
    let pattern = args.trim();
    if pattern.is_empty() {
        "*".to_string()
    } else {
        pattern.to_string()
    }
}

/// Evaluate a rename expression through the local shell so command
/// substitution like `$(hostname)` works. The trimmed stdout is the
/// new display name.
fn evaluate_rename_expression(expr: &str) -> Result<String> {
    let output = local_shell_command(&format!("echo {}", expr)).output()?;
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(name)
}

#[cfg(unix)]
fn local_shell_command(cmd: &str) -> std::process::Command {
    let mut command = std::process::Command::new("/bin/sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn local_shell_command(cmd: &str) -> std::process::Command {
    let mut command = std::process::Command::new("cmd.exe");
    command.arg("/c").arg(cmd);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::shell::testing::MockConnection;
    use std::sync::{Arc, Mutex};

    /// Output sink that stays readable while the dispatcher owns it.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher<SharedBuf>, SharedBuf) {
        let (tx, _rx) = mpsc::channel(16);
        let buf = SharedBuf::default();
        let dispatcher = Dispatcher::new(buf.clone(), tx, DebugToggle::detached());
        (dispatcher, buf)
    }

    fn add_mock(dispatcher: &mut Dispatcher<SharedBuf>, host: &str) -> SessionId {
        let session = ShellSession::new(SessionId::new(), host, MockConnection::boxed());
        dispatcher.group_mut().add(session)
    }

    fn add_mock_recording(
        dispatcher: &mut Dispatcher<SharedBuf>,
        host: &str,
    ) -> (SessionId, Arc<Mutex<Vec<Vec<u8>>>>, Arc<Mutex<bool>>) {
        let (conn, sent, alive) = MockConnection::new();
        let session = ShellSession::new(SessionId::new(), host, Box::new(conn));
        let id = dispatcher.group_mut().add(session);
        (id, sent, alive)
    }

    #[test]
    fn test_prompt_ready_and_waiting() {
        let (mut dispatcher, _) = dispatcher();
        add_mock(&mut dispatcher, "localhost");
        add_mock(&mut dispatcher, "localhost");
        assert_eq!(dispatcher.prompt(), "ready (2)> ");

        dispatcher.handle_line("date");
        assert_eq!(dispatcher.prompt(), "waiting (2/2)> ");
    }

    #[test]
    fn test_broadcast_reaches_all_active() {
        let (mut dispatcher, _) = dispatcher();
        let (_, sent_a, _) = add_mock_recording(&mut dispatcher, "a");
        let (_, sent_b, _) = add_mock_recording(&mut dispatcher, "b");

        dispatcher.handle_line("date");
        assert_eq!(sent_a.lock().unwrap()[0], b"date\n");
        assert_eq!(sent_b.lock().unwrap()[0], b"date\n");
    }

    #[test]
    fn test_broadcast_skips_disabled() {
        let (mut dispatcher, _) = dispatcher();
        let (_, sent_a, _) = add_mock_recording(&mut dispatcher, "a");
        let (_, sent_b, _) = add_mock_recording(&mut dispatcher, "b");

        dispatcher.handle_line(":disable a");
        dispatcher.handle_line("date");
        assert!(sent_a.lock().unwrap().is_empty());
        assert_eq!(sent_b.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_broken_channel_isolated() {
        let (mut dispatcher, buf) = dispatcher();
        let (_, _, alive_a) = add_mock_recording(&mut dispatcher, "localhost");
        let (_, sent_b, _) = add_mock_recording(&mut dispatcher, "localhost");
        *alive_a.lock().unwrap() = false;

        dispatcher.handle_line("date");

        // The broken session is reported by name and the other still
        // receives the line.
        assert!(buf.contents().contains("Error talking to localhost\n"));
        assert_eq!(sent_b.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.prompt(), "waiting (1/1)> ");
        assert_eq!(dispatcher.group().counts().dead, 1);
    }

    #[test]
    fn test_dead_session_excluded_from_future_broadcasts() {
        let (mut dispatcher, _) = dispatcher();
        let (id, _, _) = add_mock_recording(&mut dispatcher, "a");
        dispatcher.handle_event(id, SessionEvent::Closed);

        assert_eq!(dispatcher.group().counts().dead, 1);
        assert!(dispatcher.group().active_ids().is_empty());
    }

    #[test]
    fn test_closed_event_reports_once() {
        let (mut dispatcher, buf) = dispatcher();
        let (id, _, _) = add_mock_recording(&mut dispatcher, "a");
        add_mock(&mut dispatcher, "b");

        dispatcher.handle_event(id, SessionEvent::Closed);
        dispatcher.handle_event(id, SessionEvent::Closed);

        let report_count = buf.contents().matches("Error talking to a").count();
        assert_eq!(report_count, 1);
    }

    #[test]
    fn test_output_tagged_with_multiple_sessions() {
        let (mut dispatcher, buf) = dispatcher();
        let (id, _, _) = add_mock_recording(&mut dispatcher, "web");
        add_mock(&mut dispatcher, "db");

        dispatcher.handle_event(id, SessionEvent::Output(b"hello\n".to_vec()));
        assert_eq!(buf.contents(), "web: hello\n");
    }

    #[test]
    fn test_output_untagged_with_single_session() {
        let (mut dispatcher, buf) = dispatcher();
        let (id, _, _) = add_mock_recording(&mut dispatcher, "web");

        dispatcher.handle_event(id, SessionEvent::Output(b"hello\n".to_vec()));
        assert_eq!(buf.contents(), "hello\n");
    }

    #[test]
    fn test_prompt_marker_completes_job() {
        let (mut dispatcher, _) = dispatcher();
        let (id, sent, _) = add_mock_recording(&mut dispatcher, "a");

        dispatcher.handle_line("date");
        assert_eq!(dispatcher.prompt(), "waiting (1/1)> ");

        // Recover the marker from the priming line the session would
        // send; simulate the shell echoing it back as its prompt.
        dispatcher
            .group_mut()
            .get_mut(id)
            .unwrap()
            .prime()
            .unwrap();
        let setup = String::from_utf8(sent.lock().unwrap().last().unwrap().clone()).unwrap();
        let marker = marker_from_setup(&setup);
        dispatcher.handle_event(id, SessionEvent::Output(marker.into_bytes()));
        assert_eq!(dispatcher.prompt(), "ready (1)> ");
    }

    fn marker_from_setup(setup: &str) -> String {
        // PS1='left''right'
        let start = setup.find("PS1='").unwrap() + 5;
        let rest = &setup[start..];
        let end = rest.rfind('\'').unwrap();
        rest[..end].replace("''", "")
    }

    #[test]
    fn test_comment_echoed_not_dispatched() {
        let (mut dispatcher, buf) = dispatcher();
        let (_, sent, _) = add_mock_recording(&mut dispatcher, "a");

        dispatcher.handle_line("# just a note");
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(buf.contents(), "# just a note\n");
    }

    #[test]
    fn test_send_ctrl_validation() {
        let (mut dispatcher, buf) = dispatcher();
        add_mock(&mut dispatcher, "a");

        dispatcher.handle_line(":send_ctrl");
        assert!(buf.contents().contains("Expected at least a letter"));

        dispatcher.handle_line(":send_ctrl word");
        assert!(buf
            .contents()
            .contains("Expected a single letter, got: word"));
    }

    #[test]
    fn test_send_ctrl_delivers_control_byte() {
        let (mut dispatcher, _) = dispatcher();
        let (_, sent, _) = add_mock_recording(&mut dispatcher, "a");

        dispatcher.handle_line(":send_ctrl d");
        assert_eq!(sent.lock().unwrap()[0], vec![0x04]);

        dispatcher.handle_line(":send_ctrl c");
        assert_eq!(sent.lock().unwrap()[1], vec![0x03]);
    }

    #[test]
    fn test_send_ctrl_skips_disabled_sessions() {
        let (mut dispatcher, _) = dispatcher();
        let (_, sent, _) = add_mock_recording(&mut dispatcher, "a");

        dispatcher.handle_line(":disable a");
        dispatcher.handle_line(":send_ctrl c");
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_control_command() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":badcommandname");
        assert!(buf
            .contents()
            .contains("Unknown control command: badcommandname"));
    }

    #[test]
    fn test_ambiguous_abbreviation_rejected() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":re");
        assert!(buf.contents().contains("Unknown control command: re"));
    }

    #[test]
    fn test_abbreviation_resolves() {
        let (mut dispatcher, buf) = dispatcher();
        add_mock(&mut dispatcher, "a");
        dispatcher.handle_line(":l");
        assert!(buf
            .contents()
            .contains("1 active shells, 0 dead shells, total: 1"));
    }

    #[test]
    fn test_list_with_pattern() {
        let (mut dispatcher, buf) = dispatcher();
        add_mock(&mut dispatcher, "web");
        add_mock(&mut dispatcher, "db");

        dispatcher.handle_line(":list web");
        assert!(buf
            .contents()
            .contains("1 active shells, 0 dead shells, total: 1"));
    }

    #[test]
    fn test_unmatched_pattern_token_reported_but_not_fatal() {
        let (mut dispatcher, buf) = dispatcher();
        add_mock(&mut dispatcher, "localhost");
        add_mock(&mut dispatcher, "localhost");

        dispatcher.handle_line(":disable local* not_found");
        assert!(buf.contents().contains("not_found not found"));
        assert_eq!(dispatcher.group().counts().active, 0);
    }

    #[test]
    fn test_enable_restores_disabled_not_dead() {
        let (mut dispatcher, _) = dispatcher();
        add_mock(&mut dispatcher, "localhost");
        add_mock(&mut dispatcher, "localhost");
        add_mock(&mut dispatcher, "localhost");

        dispatcher.handle_line(":disable localhost#*");
        assert_eq!(dispatcher.group().counts().active, 1);

        // The remaining active session dies.
        let active = dispatcher.group().active_ids()[0];
        dispatcher.handle_event(active, SessionEvent::Closed);
        assert_eq!(dispatcher.group().counts().active, 0);
        assert_eq!(dispatcher.group().counts().dead, 1);

        dispatcher.handle_line(":enable");
        assert_eq!(dispatcher.group().counts().active, 2);
        assert_eq!(dispatcher.group().counts().dead, 1);

        dispatcher.handle_line(":purge");
        assert_eq!(dispatcher.group().counts().total, 2);
    }

    #[test]
    fn test_rename_without_expression_is_noop() {
        let (mut dispatcher, _) = dispatcher();
        add_mock(&mut dispatcher, "localhost");

        dispatcher.handle_line(":rename");
        assert_eq!(dispatcher.group().rendered_names(), vec!["localhost"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_rename_evaluates_expression() {
        let (mut dispatcher, _) = dispatcher();
        add_mock(&mut dispatcher, "localhost");
        add_mock(&mut dispatcher, "localhost");

        dispatcher.handle_line(":rename $(echo newname)");
        assert_eq!(
            dispatcher.group().rendered_names(),
            vec!["newname", "newname#1"]
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_rename_with_pattern() {
        let (mut dispatcher, _) = dispatcher();
        add_mock(&mut dispatcher, "web");
        add_mock(&mut dispatcher, "db");

        dispatcher.handle_line(":rename web frontend");
        assert_eq!(
            dispatcher.group().rendered_names(),
            vec!["frontend", "db"]
        );
    }

    #[test]
    fn test_hide_password_announcements() {
        let (mut dispatcher, buf) = dispatcher();
        // Regardless of prior state.
        dispatcher.handle_line(":hide_password");
        let contents = buf.contents();
        assert!(contents.contains("Debugging disabled\n"));
        assert!(contents.contains("Logging disabled\n"));
    }

    #[test]
    fn test_hide_password_stops_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        let (mut dispatcher, _) = dispatcher();

        dispatcher
            .enable_transcript(path.to_str().unwrap())
            .unwrap();
        dispatcher.handle_line("# before");
        dispatcher.handle_line(":hide_password");
        dispatcher.handle_line("# secret");

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("before"));
        assert!(!log.contains("secret"));
    }

    #[test]
    fn test_set_log_toggle_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        let path_str = path.to_str().unwrap().to_string();
        let (mut dispatcher, _) = dispatcher();
        let (id, _, _) = add_mock_recording(&mut dispatcher, "localhost");

        dispatcher.handle_line(&format!(":set_log {}", path_str));
        dispatcher.handle_line("echo now logging");
        dispatcher.handle_event(id, SessionEvent::Output(b"now logging\n".to_vec()));
        dispatcher.handle_line(":set_log");
        dispatcher.handle_line("echo unlogged");
        dispatcher.handle_line(&format!(":set_log {}", path_str));
        dispatcher.handle_line("echo appended");

        let log = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            log,
            "> echo now logging\nnow logging\n> :set_log\n> echo appended\n"
        );
    }

    #[test]
    fn test_set_debug_validation() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":set_debug maybe");
        assert!(buf.contents().contains("Expected y or n, got: maybe"));
    }

    #[test]
    fn test_chdir_missing_path() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":chdir /does/not/exist");
        let contents = buf.contents();
        assert!(contents.contains("'/does/not/exist'"));
    }

    #[test]
    fn test_help_lists_commands() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":help");
        let contents = buf.contents();
        assert!(contents.contains(":enable"));
        assert!(contents.contains(":send_ctrl"));
    }

    #[test]
    fn test_help_prefix_lists_matches() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":help re");
        let contents = buf.contents();
        assert!(contents.contains(":reconnect"));
        assert!(contents.contains(":rename"));
        assert!(contents.contains(":reset_prompt"));
    }

    #[test]
    fn test_help_unknown_command() {
        let (mut dispatcher, buf) = dispatcher();
        dispatcher.handle_line(":help badcommandname");
        assert!(buf
            .contents()
            .contains("Unknown control command: badcommandname"));
    }

    #[test]
    fn test_quit_sets_done() {
        let (mut dispatcher, _) = dispatcher();
        add_mock(&mut dispatcher, "a");
        assert!(!dispatcher.is_done());
        dispatcher.handle_line(":quit");
        assert!(dispatcher.is_done());
    }

    #[test]
    fn test_tab_expansion_in_control_line() {
        let (mut dispatcher, buf) = dispatcher();
        add_mock(&mut dispatcher, "localhost");
        add_mock(&mut dispatcher, "localhost");

        // ":disabl<TAB>local* not_found<TAB>" resolves the command and
        // leaves the unmatched literal alone.
        dispatcher.handle_line(":disabl\tlocal* not_found\t");
        assert!(buf.contents().contains("not_found not found"));
        assert_eq!(dispatcher.group().counts().active, 0);
    }

    #[test]
    fn test_muted_session_output_suppressed_until_prompt() {
        let (mut dispatcher, buf) = dispatcher();
        let (id, sent, _) = add_mock_recording(&mut dispatcher, "a");

        dispatcher
            .group_mut()
            .get_mut(id)
            .unwrap()
            .prime()
            .unwrap();
        let setup = String::from_utf8(sent.lock().unwrap()[0].clone()).unwrap();
        let marker = marker_from_setup(&setup);

        dispatcher.handle_event(id, SessionEvent::Output(b"priming noise\n".to_vec()));
        assert_eq!(buf.contents(), "");

        dispatcher.handle_event(id, SessionEvent::Output(marker.into_bytes()));
        dispatcher.handle_event(id, SessionEvent::Output(b"real output\n".to_vec()));
        assert_eq!(buf.contents(), "real output\n");
    }
}
