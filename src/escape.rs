//! Escaping for values written into Ninja files.

/// How a value is going to be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    /// A path on a `build` line or in a variable: `$`, space and `:` are
    /// Ninja-special.
    Ninja,
    /// A value spliced into a command line by Ninja: `$` is escaped and the
    /// value is shell-quoted when it would otherwise split.
    NinjaCommand,
    /// Like `NinjaCommand` but never quoted. Flags may legitimately be several
    /// arguments in one string; quoting them is the build file's job.
    NinjaFlag,
}

fn needs_shell_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars().any(|c| {
            matches!(
                c,
                ' ' | '\t' | '"' | '\'' | '\\' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '*' | '?'
                    | '`' | '#' | '~' | '!' | '[' | ']' | '{' | '}'
            )
        })
}

fn push_ninja_dollar(out: &mut String, s: &str) {
    for c in s.chars() {
        if c == '$' {
            out.push_str("$$");
        } else {
            out.push(c);
        }
    }
}

pub fn escape_to(out: &mut String, s: &str, mode: EscapeMode) {
    match mode {
        EscapeMode::Ninja => {
            for c in s.chars() {
                match c {
                    '$' | ' ' | ':' => {
                        out.push('$');
                        out.push(c);
                    }
                    _ => out.push(c),
                }
            }
        }
        EscapeMode::NinjaCommand if needs_shell_quoting(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' | '\\' => {
                        out.push('\\');
                        out.push(c);
                    }
                    '$' => out.push_str("$$"),
                    _ => out.push(c),
                }
            }
            out.push('"');
        }
        EscapeMode::NinjaCommand | EscapeMode::NinjaFlag => push_ninja_dollar(out, s),
    }
}

pub fn escape(s: &str, mode: EscapeMode) -> String {
    let mut out = String::with_capacity(s.len());
    escape_to(&mut out, s, mode);
    out
}
