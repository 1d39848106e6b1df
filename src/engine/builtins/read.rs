//! `read`
//!
//! Consumes one line from the effective input. Inside pipelines, groups,
//! and redirected loops the input lives in the environment's consumable
//! buffer, so successive `read`s advance through it; a bare `read` over
//! a one-shot stdin string just takes the first line.

use crate::engine::env::Env;
use crate::engine::flow::{Exec, Output};
use crate::engine::walker::Walker;
use crate::expand::split::{split_fields, DEFAULT_IFS};

pub fn read(walker: &Walker, env: &mut Env, args: &[String], stdin: &str) -> Exec {
    let _ = walker;
    let mut raw = false;
    let mut prompt = String::new();
    let mut array_var: Option<String> = None;
    let mut vars: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-r" => raw = true,
            "-p" => {
                if let Some(p) = args.get(i + 1) {
                    prompt = p.clone();
                    i += 1;
                }
            }
            "-a" => {
                if let Some(name) = args.get(i + 1) {
                    array_var = Some(name.clone());
                    i += 1;
                }
            }
            "-s" | "-e" => {}
            arg if !arg.starts_with('-') => vars.push(arg.to_string()),
            _ => {}
        }
        i += 1;
    }

    // Prefer the consumable buffer; fall back to the call's stdin.
    let buffered = env.group_stdin.is_some();
    let source = match &env.group_stdin {
        Some(buffer) => buffer.clone(),
        None => stdin.to_string(),
    };

    let stderr = if prompt.is_empty() {
        String::new()
    } else {
        prompt
    };

    if source.is_empty() {
        return Ok(Output::new("", stderr, 1));
    }

    let (line, consumed) = take_line(&source, raw);
    if buffered {
        env.group_stdin = Some(source[consumed..].to_string());
    }

    let ifs = env
        .get_str("IFS")
        .unwrap_or_else(|| DEFAULT_IFS.to_string());

    if let Some(name) = array_var {
        let fields = split_fields(&line, &ifs);
        env.set_var(&name, crate::engine::env::Value::indexed_from(fields));
        return Ok(Output::new("", stderr, 0));
    }

    if vars.is_empty() {
        env.set_str("REPLY", line);
        return Ok(Output::new("", stderr, 0));
    }

    // Split into one field per variable; the last variable keeps the
    // remainder unsplit.
    let mut remainder = line.as_str();
    for (idx, var) in vars.iter().enumerate() {
        let last = idx + 1 == vars.len();
        if last {
            let trimmed = trim_ifs_edges(remainder, &ifs);
            env.set_str(var, trimmed);
            break;
        }
        let trimmed_start = remainder.trim_start_matches(|c| ifs.contains(c) && " \t\n".contains(c));
        match trimmed_start.find(|c| ifs.contains(c)) {
            Some(pos) => {
                env.set_str(var, &trimmed_start[..pos]);
                remainder = &trimmed_start[pos + 1..];
            }
            None => {
                env.set_str(var, trimmed_start);
                remainder = "";
                // Remaining variables become empty.
                for leftover in &vars[idx + 1..] {
                    env.set_str(leftover, "");
                }
                break;
            }
        }
    }
    Ok(Output::new("", stderr, 0))
}

/// One logical line. Without `-r`, a trailing backslash joins lines and
/// backslash escapes drop.
fn take_line(source: &str, raw: bool) -> (String, usize) {
    let mut line = String::new();
    let mut consumed = 0;
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            consumed = i + 1;
            return (line, consumed);
        }
        if !raw && c == '\\' {
            if i + 1 < chars.len() {
                if chars[i + 1] == '\n' {
                    // Continuation: swallow both, keep reading.
                    i += 2;
                    continue;
                }
                line.push(chars[i + 1]);
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        line.push(c);
        i += 1;
    }
    (line, chars.len().max(consumed))
}

fn trim_ifs_edges(text: &str, ifs: &str) -> String {
    let ws: Vec<char> = ifs.chars().filter(|c| " \t\n".contains(*c)).collect();
    text.trim_matches(|c| ws.contains(&c)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_line_plain() {
        let (line, consumed) = take_line("first\nsecond\n", true);
        assert_eq!(line, "first");
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_take_line_continuation() {
        let (line, _) = take_line("one\\\ntwo\nrest", false);
        assert_eq!(line, "onetwo");
    }

    #[test]
    fn test_take_line_raw_keeps_backslash() {
        let (line, _) = take_line("a\\nb\n", true);
        assert_eq!(line, "a\\nb");
    }
}
