//! Destructive command rules
//!
//! Rules are plain data: a safe leading-verb list and an ordered list of
//! destructive command shapes. Each shape is anchored at the start of a
//! command segment, so the same words inside quoted arguments, URLs or
//! heredoc bodies of an unrelated command never match.

use std::sync::LazyLock;

use regex::Regex;

/// Leading commands that only read or report, exempt from destructive matching
pub const SAFE_LEADING_VERBS: &[&str] = &[
    "cat", "date", "diff", "echo", "egrep", "file", "gh", "grep", "head", "jq", "less", "ls",
    "more", "printf", "pwd", "rg", "stat", "tail", "tree", "wc", "which", "whoami",
];

/// A destructive command shape
#[derive(Debug, Clone, Copy)]
pub struct DestructiveRule {
    /// Human-readable name used in denial reasons
    pub operation: &'static str,
    /// Regex anchored at the start of a normalized segment
    pub pattern: &'static str,
}

/// Destructive shapes, first match wins
pub const DESTRUCTIVE_RULES: &[DestructiveRule] = &[
    DestructiveRule {
        operation: "recursive or forced delete (rm -rf)",
        pattern: r"^(?:sudo\s+)?rm\s+(?:\S+\s+)*(?:-[A-Za-z]*[rRf][A-Za-z]*|--recursive|--force)(?:\s|$)",
    },
    DestructiveRule {
        operation: "hard reset (git reset --hard)",
        pattern: r"^(?:sudo\s+)?git\s+(?:-C\s+\S+\s+)?reset\s+(?:\S+\s+)*--hard(?:\s|$)",
    },
    DestructiveRule {
        operation: "force push (git push --force)",
        pattern: r"^(?:sudo\s+)?git\s+(?:-C\s+\S+\s+)?push\s+(?:\S+\s+)*(?:--force(?:-with-lease)?(?:=\S*)?|-f)(?:\s|$)",
    },
    DestructiveRule {
        operation: "forced clean (git clean -f)",
        pattern: r"^(?:sudo\s+)?git\s+(?:-C\s+\S+\s+)?clean\s+(?:\S+\s+)*(?:-[A-Za-z]*f[A-Za-z]*|--force)(?:\s|$)",
    },
    DestructiveRule {
        operation: "forced branch delete (git branch -D)",
        pattern: r"^(?:sudo\s+)?git\s+(?:-C\s+\S+\s+)?branch\s+(?:\S+\s+)*(?:-D|--delete\s+--force|--force\s+--delete|-d\s+(?:-f|--force)|-f\s+-d)(?:\s|$)",
    },
];

static COMPILED_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    DESTRUCTIVE_RULES
        .iter()
        .map(|rule| {
            (
                rule.operation,
                Regex::new(rule.pattern).expect("valid destructive rule"),
            )
        })
        .collect()
});

static ENV_ASSIGNMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*=\S*\s+)+").expect("valid regex")
});

/// Whether `verb` is a read-only leading command
#[must_use]
pub fn is_safe_verb(verb: &str) -> bool {
    SAFE_LEADING_VERBS.contains(&verb)
}

/// Split a shell command into top-level segments
///
/// Separators are unquoted `&&`, `||`, `;`, `|`, `&` and newlines. Quoted
/// text stays inside its segment. A heredoc body (`<<WORD` up to the line
/// `WORD`) belongs to no segment and splitting resumes after it; a heredoc
/// whose delimiter line never appears is not skipped. `<<<` is an ordinary
/// word.
#[must_use]
pub fn split_segments(command: &str) -> Vec<&str> {
    let bytes = command.as_bytes();
    let mut segments = Vec::new();
    let mut heredocs: Vec<Heredoc> = Vec::new();
    let mut start = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if b == b'\\' && q == b'"' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\\' => {
                i += 2;
                continue;
            }
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'<' if bytes[i..].starts_with(b"<<<") => {
                i += 3;
                continue;
            }
            b'<' if bytes[i..].starts_with(b"<<") => {
                let (heredoc, end) = Heredoc::parse(command, i + 2);
                heredocs.extend(heredoc);
                i = end;
                continue;
            }
            b'\n' => {
                segments.push(&command[start..i]);
                i = skip_heredoc_bodies(command, i + 1, &mut heredocs);
                start = i;
                continue;
            }
            b';' => {
                segments.push(&command[start..i]);
                start = i + 1;
            }
            b'&' if is_redirect(bytes, i) => {}
            b'&' | b'|' => {
                segments.push(&command[start..i]);
                let width = if bytes.get(i + 1) == Some(&b) { 2 } else { 1 };
                i += width;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&command[start.min(command.len())..]);

    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pending heredoc awaiting its body
#[derive(Debug, Clone, PartialEq, Eq)]
struct Heredoc {
    delimiter: String,
    /// `<<-` form: leading tabs are ignored on the delimiter line
    strip_tabs: bool,
}

impl Heredoc {
    /// Parse the delimiter word following `<<` at byte `pos`
    ///
    /// Returns the heredoc, if a word is present, and the byte offset just
    /// past the word. Quotes and backslashes are removed from the word.
    fn parse(command: &str, pos: usize) -> (Option<Self>, usize) {
        let bytes = command.as_bytes();
        let mut i = pos;

        let strip_tabs = bytes.get(i) == Some(&b'-');
        if strip_tabs {
            i += 1;
        }
        while matches!(bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }

        let mut word = Vec::new();
        let mut quote: Option<u8> = None;
        while let Some(&b) = bytes.get(i) {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => word.push(b),
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'\\' => {}
                    b' ' | b'\t' | b'\n' | b';' | b'&' | b'|' | b'<' | b'>' | b'(' | b')' => break,
                    _ => word.push(b),
                },
            }
            i += 1;
        }

        let heredoc = (!word.is_empty()).then(|| Self {
            delimiter: String::from_utf8_lossy(&word).into_owned(),
            strip_tabs,
        });
        (heredoc, i.min(command.len()))
    }

    fn ends_at(&self, line: &str) -> bool {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = if self.strip_tabs {
            line.trim_start_matches('\t')
        } else {
            line
        };
        line == self.delimiter
    }
}

/// Skip the bodies of pending heredocs starting at byte `pos`
///
/// Returns where splitting resumes. Bodies are consumed in order; if a
/// delimiter line is missing, nothing from that heredoc on is skipped.
fn skip_heredoc_bodies(command: &str, pos: usize, heredocs: &mut Vec<Heredoc>) -> usize {
    let mut pos = pos.min(command.len());

    for heredoc in heredocs.drain(..) {
        let mut line_start = pos;
        let resume = loop {
            let line_end = command[line_start..]
                .find('\n')
                .map_or(command.len(), |offset| line_start + offset);
            if heredoc.ends_at(&command[line_start..line_end]) {
                break Some((line_end + 1).min(command.len()));
            }
            if line_end >= command.len() {
                break None;
            }
            line_start = line_end + 1;
        };

        match resume {
            Some(next) => pos = next,
            None => {
                tracing::debug!(delimiter = %heredoc.delimiter, "unterminated heredoc");
                return pos;
            }
        }
    }

    pos
}

/// `&` belonging to a redirection such as `2>&1` or `&>file`
fn is_redirect(bytes: &[u8], i: usize) -> bool {
    let prev = i.checked_sub(1).and_then(|p| bytes.get(p));
    matches!(prev, Some(b'>' | b'<')) || bytes.get(i + 1) == Some(&b'>')
}

/// Strip env assignments, subshell openers and the directory of the leading command
fn normalize_segment(segment: &str) -> String {
    let segment = segment.trim_start_matches(['(', '{', ' ', '\t']);
    let rest = ENV_ASSIGNMENTS
        .find(segment)
        .map_or(segment, |m| &segment[m.end()..]);

    let (head, tail) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let verb = head.rsplit('/').next().unwrap_or(head);

    if tail.is_empty() {
        verb.to_string()
    } else {
        format!("{verb} {tail}")
    }
}

/// Name of the destructive operation `command` performs, if any
///
/// Each top-level segment is checked on its own. A segment led by a safe
/// verb is exempt as a whole, whatever text follows it.
#[must_use]
pub fn destructive_operation(command: &str) -> Option<&'static str> {
    for segment in split_segments(command) {
        let normalized = normalize_segment(segment);
        let verb = normalized.split_whitespace().next().unwrap_or_default();
        if is_safe_verb(verb) {
            continue;
        }

        if let Some((operation, _)) = COMPILED_RULES
            .iter()
            .find(|(_, pattern)| pattern.is_match(&normalized))
        {
            return Some(*operation);
        }
    }
    None
}
