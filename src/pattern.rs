//! Session selection patterns.
//!
//! A pattern is a space-separated union of selectors. Each selector is
//! either a literal session name (matched exactly against the rendered
//! `name` or `name#index` form) or a glob containing `*`/`?` wildcards.
//! Resolution is a pure function over the rendered name list so it can
//! be tested without any live sessions.

/// Result of resolving a pattern against a list of session names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Indices into the candidate list, in candidate order, deduplicated.
    pub indices: Vec<usize>,
    /// Literal tokens that matched nothing, in pattern order.
    pub unmatched: Vec<String>,
}

/// Resolve a pattern against rendered session names.
///
/// An unmatched literal token is recorded but does not abort resolution
/// of the remaining tokens. An empty candidate list yields an empty,
/// non-erroring selection.
pub fn select(names: &[String], pattern: &str) -> Selection {
    let mut selection = Selection::default();
    let mut picked = vec![false; names.len()];

    for token in pattern.split_whitespace() {
        let is_glob = token.contains('*') || token.contains('?');
        let mut hit = false;

        for (i, name) in names.iter().enumerate() {
            let matches = if is_glob {
                glob_match(token, name)
            } else {
                token == name
            };
            if matches {
                hit = true;
                if !picked[i] {
                    picked[i] = true;
                }
            }
        }

        if !hit && !is_glob {
            selection.unmatched.push(token.to_string());
        }
    }

    selection.indices = picked
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect();
    selection
}

/// Match `text` against a glob where `*` matches any run of characters
/// and `?` matches exactly one.
pub fn glob_match(glob: &str, text: &str) -> bool {
    let pattern: Vec<char> = glob.chars().collect();
    let input: Vec<char> = text.chars().collect();

    // Iterative matcher with a single backtrack point per `*`.
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < input.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == input[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
