//! Completion engine.
//!
//! Two domains: control-command and pattern-argument completion for
//! `:`-prefixed lines, and filesystem path completion for everything
//! else. All completion resolves to the longest common prefix shared
//! by all candidates; a single candidate completes fully (command
//! completions gain a trailing space, directory matches a trailing
//! separator).
//!
//! The dispatcher calls [`expand_line`] on submitted input, expanding
//! each embedded tab in place, so completion works even through a
//! front end with no interactive line editing.

use std::path::{Path, PathBuf};

use crate::control::{self, ArgShape};

/// Longest common prefix of all candidates, or `None` when empty.
pub fn longest_common_prefix(candidates: &[String]) -> Option<String> {
    let (first, rest) = candidates.split_first()?;
    let mut prefix = first.as_str();
    for candidate in rest {
        while !candidate.starts_with(prefix) {
            let mut end = prefix.len() - 1;
            while !prefix.is_char_boundary(end) {
                end -= 1;
            }
            prefix = &prefix[..end];
            if prefix.is_empty() {
                return Some(String::new());
            }
        }
    }
    Some(prefix.to_string())
}

/// Complete a control command name (without the leading colon).
pub fn complete_command(partial: &str) -> Option<String> {
    let candidates: Vec<String> = control::matching(partial)
        .iter()
        .map(|c| c.name.to_string())
        .collect();
    match candidates.as_slice() {
        [] => None,
        [single] => Some(format!("{} ", single)),
        _ => longest_common_prefix(&candidates),
    }
}

/// Complete a session display name.
pub fn complete_name(partial: &str, names: &[String]) -> Option<String> {
    let candidates: Vec<String> = names
        .iter()
        .filter(|n| n.starts_with(partial))
        .cloned()
        .collect();
    match candidates.as_slice() {
        [] => None,
        [single] => Some(format!("{} ", single)),
        _ => longest_common_prefix(&candidates),
    }
}

/// Filesystem path completion against a chdir-aware base directory.
#[derive(Debug, Clone)]
pub struct PathCompleter {
    cwd: PathBuf,
}

impl PathCompleter {
    /// Completer rooted at the controller's current working directory.
    pub fn new() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Completer rooted at an explicit directory (for tests).
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Complete a path token. Returns the replacement token, or `None`
    /// when nothing matches.
    pub fn complete(&self, token: &str) -> Option<String> {
        let (dir_part, base) = match token.rfind('/') {
            Some(pos) => (&token[..=pos], &token[pos + 1..]),
            None => ("", token),
        };

        let dir: PathBuf = if token.starts_with('/') {
            PathBuf::from(if dir_part.is_empty() { "/" } else { dir_part })
        } else {
            self.cwd.join(dir_part)
        };

        let candidates = list_matching(&dir, base);
        match candidates.as_slice() {
            [] => None,
            [(name, is_dir)] => {
                let sep = if *is_dir { "/" } else { "" };
                Some(format!("{}{}{}", dir_part, name, sep))
            }
            _ => {
                let names: Vec<String> = candidates.iter().map(|(n, _)| n.clone()).collect();
                longest_common_prefix(&names).map(|lcp| format!("{}{}", dir_part, lcp))
            }
        }
    }
}

impl Default for PathCompleter {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory entries whose names start with `base`, sorted by name.
/// Hidden entries are skipped unless the prefix itself starts with a dot.
fn list_matching(dir: &Path, base: &str) -> Vec<(String, bool)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut matches: Vec<(String, bool)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !name.starts_with(base) {
                return None;
            }
            if name.starts_with('.') && !base.starts_with('.') {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some((name, is_dir))
        })
        .collect();
    matches.sort();
    matches
}

/// Expand every embedded tab in a submitted line through the
/// completion engine, substituting the completed token in place.
/// Tabs that complete nothing are simply dropped.
pub fn expand_line(line: &str, session_names: &[String]) -> String {
    let mut out = String::new();
    for ch in line.chars() {
        if ch != '\t' {
            out.push(ch);
            continue;
        }
        if let Some(expanded) = complete_at_end(&out, session_names) {
            out = expanded;
        }
    }
    out
}

/// Complete the trailing token of a partial line, returning the whole
/// line with the token replaced.
fn complete_at_end(line: &str, session_names: &[String]) -> Option<String> {
    let token_start = line
        .rfind(char::is_whitespace)
        .map(|i| i + 1)
        .unwrap_or(0);
    let token = &line[token_start..];
    if token.is_empty() {
        return None;
    }
    let head = &line[..token_start];

    let replacement = if line.starts_with(':') {
        if token_start == 0 {
            // Completing the command itself; keep the colon.
            complete_command(&token[1..]).map(|c| format!(":{}", c))?
        } else {
            complete_argument(line, token, session_names)?
        }
    } else if line.starts_with('!') {
        if token_start == 0 {
            PathCompleter::new()
                .complete(&token[1..])
                .map(|c| format!("!{}", c))?
        } else {
            PathCompleter::new().complete(token)?
        }
    } else if line.starts_with('#') {
        return None;
    } else {
        PathCompleter::new().complete(token)?
    };

    Some(format!("{}{}", head, replacement))
}

/// Complete an argument of an identified control command.
fn complete_argument(line: &str, token: &str, session_names: &[String]) -> Option<String> {
    let cmd_token = line[1..].split_whitespace().next()?;
    let info = control::resolve(cmd_token)?;

    match info.args {
        ArgShape::Path => PathCompleter::new().complete(token),
        ArgShape::Pattern => complete_name(token, session_names),
        ArgShape::CommandName => {
            let bare = token.strip_prefix(':');
            let completed = complete_command(bare.unwrap_or(token))?;
            Some(match bare {
                Some(_) => format!(":{}", completed),
                None => completed,
            })
        }
        ArgShape::None | ArgShape::FreeText | ArgShape::Letter => None,
    }
}
