//! Control command metadata and resolution.
//!
//! The table is static; an input token resolves to a command when it
//! equals an entry exactly or is an unambiguous prefix of exactly one.
//! Ambiguity is decided by counting matches, never by first match.

/// Argument shape of a control command, used by completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// No argument.
    None,
    /// Session selection pattern.
    Pattern,
    /// Free text (host spec, rename expression, y/n).
    FreeText,
    /// Filesystem path.
    Path,
    /// Single letter.
    Letter,
    /// Control command name or prefix.
    CommandName,
}

/// Static metadata for one control command.
#[derive(Debug)]
pub struct CommandInfo {
    /// Canonical name, without the leading colon.
    pub name: &'static str,
    /// Usage line shown by `:help <name>`.
    pub usage: &'static str,
    /// One-line description.
    pub help: &'static str,
    /// Argument shape for completion.
    pub args: ArgShape,
}

/// The full command table, alphabetical by name.
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "add",
        usage: ":add HOST...",
        help: "Add new shell sessions to the group",
        args: ArgShape::FreeText,
    },
    CommandInfo {
        name: "chdir",
        usage: ":chdir PATH",
        help: "Change the local working directory",
        args: ArgShape::Path,
    },
    CommandInfo {
        name: "disable",
        usage: ":disable [PATTERN]",
        help: "Exclude matching sessions from broadcasts",
        args: ArgShape::Pattern,
    },
    CommandInfo {
        name: "enable",
        usage: ":enable [PATTERN]",
        help: "Include matching sessions in broadcasts",
        args: ArgShape::Pattern,
    },
    CommandInfo {
        name: "help",
        usage: ":help [COMMAND]",
        help: "List control commands or show detailed help",
        args: ArgShape::CommandName,
    },
    CommandInfo {
        name: "hide_password",
        usage: ":hide_password",
        help: "Disable debugging and logging before a sensitive line",
        args: ArgShape::None,
    },
    CommandInfo {
        name: "list",
        usage: ":list [PATTERN]",
        help: "Print active/dead/total session counts",
        args: ArgShape::Pattern,
    },
    CommandInfo {
        name: "purge",
        usage: ":purge",
        help: "Remove dead sessions from the group",
        args: ArgShape::None,
    },
    CommandInfo {
        name: "quit",
        usage: ":quit",
        help: "Close all sessions and exit",
        args: ArgShape::None,
    },
    CommandInfo {
        name: "reconnect",
        usage: ":reconnect [PATTERN]",
        help: "Reopen connections of dead sessions",
        args: ArgShape::Pattern,
    },
    CommandInfo {
        name: "rename",
        usage: ":rename [PATTERN] [EXPR]",
        help: "Rename matching sessions; EXPR is shell-evaluated",
        args: ArgShape::Pattern,
    },
    CommandInfo {
        name: "reset_prompt",
        usage: ":reset_prompt [PATTERN]",
        help: "Resynchronize prompt detection for matching sessions",
        args: ArgShape::Pattern,
    },
    CommandInfo {
        name: "send_ctrl",
        usage: ":send_ctrl LETTER",
        help: "Send a control character to all active sessions",
        args: ArgShape::Letter,
    },
    CommandInfo {
        name: "set_debug",
        usage: ":set_debug y|n",
        help: "Toggle verbose tracing",
        args: ArgShape::FreeText,
    },
    CommandInfo {
        name: "set_log",
        usage: ":set_log [PATH]",
        help: "Append a transcript to PATH; no path disables logging",
        args: ArgShape::Path,
    },
];

/// All commands the token is a prefix of, in table order.
pub fn matching(prefix: &str) -> Vec<&'static CommandInfo> {
    COMMANDS
        .iter()
        .filter(|c| c.name.starts_with(prefix))
        .collect()
}

/// Resolve a token: exact match wins, otherwise an unambiguous prefix.
/// Returns `None` on zero or multiple matches.
pub fn resolve(token: &str) -> Option<&'static CommandInfo> {
    if token.is_empty() {
        return None;
    }
    if let Some(exact) = COMMANDS.iter().find(|c| c.name == token) {
        return Some(exact);
    }
    let candidates = matching(token);
    match candidates.as_slice() {
        [single] => Some(single),
        _ => None,
    }
}
