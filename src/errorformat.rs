//! Vim-style `errorformat` matching.
//!
//! Each pattern is a scanf-like template compiled to an anchored regex.
//! Supported conversions: `%f` file, `%l` line, `%c` column, `%v` virtual
//! column, `%e` end line, `%k` end column, `%t` type character, `%n` error
//! number, `%m` message, `%r` rest of line, `%s` search text, `%p` pointer
//! line (`---^`), and the literals `%%`, `%.` (any char), `%#` (`*`),
//! `%*[...]` / `%*\d` (skipped class).
//!
//! A pattern may start with a multi-line prefix: `%E`, `%W`, `%I`, `%N` and
//! `%A` open an entry (error, warning, info, note, unspecified), `%C`
//! continues it, `%Z` closes it and `%G` matches a general line. `%-` drops
//! the matched line, `%+` keeps the whole line as the message.
//!
//! Every output line yields at most one entry; lines matching no pattern
//! produce an invalid entry so callers can skip them explicitly.

use regex::{Captures, Regex};

/// Error for a pattern that cannot be compiled.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid error-format {pattern:?}: {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

/// One parsed entry of tool output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub filename: String,
    /// 1-based line, 0 when absent
    pub line: usize,
    /// 1-based column, 0 when absent
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
    /// Column was given as a virtual (screen) column
    pub vcol: bool,
    /// Type character (`E`, `W`, ...), if any
    pub kind: Option<char>,
    pub number: u32,
    pub message: String,
    /// Raw output lines that produced this entry
    pub lines: Vec<String>,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Single,
    Start(Option<char>),
    Continue,
    End,
    General,
}

#[derive(Debug)]
struct Pattern {
    prefix: Prefix,
    ignore: bool,
    whole_line: bool,
    regex: Regex,
}

/// A compiled set of error-format patterns, tried in order.
#[derive(Debug)]
pub struct ErrorFormat {
    patterns: Vec<Pattern>,
}

impl ErrorFormat {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    fn match_line<'a>(&'a self, line: &'a str) -> Option<(&'a Pattern, Captures<'a>)> {
        self.patterns
            .iter()
            .find_map(|p| p.regex.captures(line).map(|caps| (p, caps)))
    }

    /// Parse tool output into entries.
    pub fn parse(&self, output: &str) -> Vec<Entry> {
        let mut entries = Vec::new();
        let mut pending: Option<Entry> = None;

        for line in output.lines() {
            let Some((pattern, caps)) = self.match_line(line) else {
                entries.extend(pending.take());
                entries.push(Entry {
                    lines: vec![line.to_string()],
                    ..Default::default()
                });
                continue;
            };

            match pattern.prefix {
                Prefix::General => {
                    if pattern.ignore {
                        continue;
                    }
                    entries.extend(pending.take());
                    let mut entry = entry_from(pattern, &caps, line);
                    entry.valid = false;
                    entries.push(entry);
                }
                Prefix::Single => {
                    entries.extend(pending.take());
                    if !pattern.ignore {
                        let mut entry = entry_from(pattern, &caps, line);
                        entry.valid = true;
                        entries.push(entry);
                    }
                }
                Prefix::Start(kind) => {
                    entries.extend(pending.take());
                    let mut entry = entry_from(pattern, &caps, line);
                    entry.kind = entry.kind.or(kind);
                    entry.valid = true;
                    if pattern.ignore {
                        entry.message.clear();
                    }
                    pending = Some(entry);
                }
                Prefix::Continue | Prefix::End => match pending.as_mut() {
                    Some(entry) => {
                        let mut next = entry_from(pattern, &caps, line);
                        if pattern.ignore {
                            next.message.clear();
                        }
                        merge(entry, next);
                        if pattern.prefix == Prefix::End {
                            entries.extend(pending.take());
                        }
                    }
                    None => entries.push(Entry {
                        lines: vec![line.to_string()],
                        ..Default::default()
                    }),
                },
            }
        }
        entries.extend(pending);
        entries
    }
}

fn number<T: std::str::FromStr + Default>(caps: &Captures<'_>, name: &str) -> T {
    caps.name(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_default()
}

fn entry_from(pattern: &Pattern, caps: &Captures<'_>, line: &str) -> Entry {
    let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

    let mut col = number(caps, "c");
    let mut vcol = false;
    if col == 0 {
        col = number(caps, "v");
        vcol = col != 0;
    }
    if col == 0
        && let Some(pointer) = caps.name("p")
    {
        col = pointer.as_str().chars().count() + 1;
        vcol = pointer.as_str().contains('\t');
    }

    let message = if pattern.whole_line {
        line.to_string()
    } else {
        text("m").or_else(|| text("r")).unwrap_or_default()
    };

    Entry {
        filename: text("f").unwrap_or_default(),
        line: number(caps, "l"),
        col,
        end_line: number(caps, "e"),
        end_col: number(caps, "k"),
        vcol,
        kind: text("t").and_then(|t| t.chars().next()),
        number: number(caps, "n"),
        message,
        lines: vec![line.to_string()],
        valid: false,
    }
}

fn merge(entry: &mut Entry, next: Entry) {
    if entry.filename.is_empty() {
        entry.filename = next.filename;
    }
    if entry.line == 0 {
        entry.line = next.line;
    }
    if entry.col == 0 {
        entry.col = next.col;
        entry.vcol = next.vcol;
    }
    if entry.end_line == 0 {
        entry.end_line = next.end_line;
    }
    if entry.end_col == 0 {
        entry.end_col = next.end_col;
    }
    if entry.kind.is_none() {
        entry.kind = next.kind;
    }
    if entry.number == 0 {
        entry.number = next.number;
    }
    if !next.message.is_empty() {
        if !entry.message.is_empty() {
            entry.message.push('\n');
        }
        entry.message.push_str(&next.message);
    }
    entry.lines.extend(next.lines);
}

fn compile(pattern: &str) -> Result<Pattern, PatternError> {
    let error = |reason: &str| PatternError {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut body = pattern;
    let mut ignore = false;
    let mut whole_line = false;
    let mut prefix = Prefix::Single;

    let head = if let Some(rest) = body.strip_prefix("%-") {
        ignore = true;
        Some(rest)
    } else if let Some(rest) = body.strip_prefix("%+") {
        whole_line = true;
        Some(rest)
    } else {
        body.strip_prefix('%')
    };
    if let Some(after) = head
        && let Some(letter) = after.chars().next()
        && "EWINACZGOPQ".contains(letter)
    {
        prefix = match letter {
            'E' | 'W' | 'I' | 'N' => Prefix::Start(Some(letter)),
            'A' => Prefix::Start(None),
            'C' => Prefix::Continue,
            'Z' => Prefix::End,
            'G' => Prefix::General,
            _ => return Err(error("file stack prefixes (%O, %P, %Q) are not supported")),
        };
        body = &after[letter.len_utf8()..];
    } else if ignore || whole_line {
        return Err(error("%- and %+ must be followed by a line type"));
    }
    let mut chars = body.chars();

    let mut regex = String::from("^");
    while let Some(c) = chars.next() {
        match c {
            '%' => {
                let Some(conv) = chars.next() else {
                    return Err(error("dangling %"));
                };
                match conv {
                    'f' => regex.push_str(r"(?P<f>(?:[[:alpha:]]:)?(?:\\ |[^ ])+?)"),
                    'l' => regex.push_str(r"(?P<l>\d+)"),
                    'c' => regex.push_str(r"(?P<c>\d+)"),
                    'v' => regex.push_str(r"(?P<v>\d+)"),
                    'e' => regex.push_str(r"(?P<e>\d+)"),
                    'k' => regex.push_str(r"(?P<k>\d+)"),
                    'n' => regex.push_str(r"(?P<n>\d+)"),
                    't' => regex.push_str(r"(?P<t>.)"),
                    'm' => regex.push_str(r"(?P<m>.+)"),
                    'r' => regex.push_str(r"(?P<r>.*)"),
                    's' => regex.push_str(r"(?P<s>.+)"),
                    'p' => regex.push_str(r"(?P<p>[- \t.]*)"),
                    '%' => regex.push('%'),
                    '.' => regex.push('.'),
                    '#' => regex.push('*'),
                    '*' => match chars.next() {
                        Some('[') => {
                            regex.push('[');
                            let mut closed = false;
                            for class_char in chars.by_ref() {
                                regex.push(class_char);
                                if class_char == ']' {
                                    closed = true;
                                    break;
                                }
                            }
                            if !closed {
                                return Err(error("unterminated %*[ class"));
                            }
                            regex.push('*');
                        }
                        Some('\\') => {
                            let Some(class) = chars.next() else {
                                return Err(error("dangling %*\\"));
                            };
                            regex.push('\\');
                            regex.push(class);
                            regex.push('*');
                        }
                        _ => return Err(error("%* must be followed by [class] or \\class")),
                    },
                    other => regex.push_str(&regex::escape(&other.to_string())),
                }
            }
            '\\' => match chars.next() {
                Some(class @ ('d' | 's' | 'S' | 'w' | 'W' | 'D')) => {
                    regex.push('\\');
                    regex.push(class);
                }
                Some(other) => regex.push_str(&regex::escape(&other.to_string())),
                None => regex.push_str(r"\\"),
            },
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');

    let regex = Regex::new(&regex).map_err(|e| error(&e.to_string()))?;
    Ok(Pattern {
        prefix,
        ignore,
        whole_line,
        regex,
    })
}
