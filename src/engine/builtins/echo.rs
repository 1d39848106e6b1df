//! `echo` and `printf`

use crate::engine::env::Env;
use crate::engine::flow::{Exec, Output};

pub fn echo(_env: &mut Env, args: &[String]) -> Exec {
    let mut newline = true;
    let mut interpret = false;
    let mut start = 0;
    for arg in args {
        match arg.as_str() {
            "-n" => newline = false,
            "-e" => interpret = true,
            "-E" => interpret = false,
            "-ne" | "-en" => {
                newline = false;
                interpret = true;
            }
            _ => break,
        }
        start += 1;
    }

    let joined = args[start..].join(" ");
    let mut text = if interpret {
        let (decoded, stop) = decode_escapes(&joined);
        if stop {
            newline = false;
        }
        decoded
    } else {
        joined
    };
    if newline {
        text.push('\n');
    }
    Ok(Output::new(text, "", 0))
}

/// `echo -e` escapes. Returns the decoded text and whether `\c` cut the
/// output short.
fn decode_escapes(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('e') | Some('E') => out.push('\x1b'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('c') => return (out, true),
            Some('0') => {
                let mut value = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            Some('x') => {
                let mut value = 0u32;
                let mut any = false;
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            any = true;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if any {
                    out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                } else {
                    out.push_str("\\x");
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    (out, false)
}

pub fn printf(_env: &mut Env, args: &[String]) -> Exec {
    let Some(format) = args.first() else {
        return Ok(Output::failure("bash: printf: usage: printf format [arguments]\n", 2));
    };
    let mut operands = args[1..].iter();
    let mut out = String::new();

    // The format string cycles until every operand is consumed.
    loop {
        let mut consumed_any = false;
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let (text, _) = decode_escapes(&format!("\\{}", chars.next().unwrap_or('\\')));
                    out.push_str(&text);
                }
                '%' => {
                    if chars.peek() == Some(&'%') {
                        chars.next();
                        out.push('%');
                        continue;
                    }
                    // %[-][0][width][.precision]conv
                    let mut left = false;
                    let mut zero = false;
                    let mut width = String::new();
                    let mut precision = String::new();
                    while let Some(&f) = chars.peek() {
                        match f {
                            '-' => {
                                left = true;
                                chars.next();
                            }
                            '0' if width.is_empty() => {
                                zero = true;
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() {
                            width.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if chars.peek() == Some(&'.') {
                        chars.next();
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                precision.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                    let conv = chars.next().unwrap_or('s');
                    let operand = operands.next().map(String::as_str);
                    if operand.is_some() {
                        consumed_any = true;
                    }
                    let rendered =
                        render_conversion(conv, operand.unwrap_or(""), &precision);
                    out.push_str(&pad(&rendered, &width, left, zero));
                }
                _ => out.push(c),
            }
        }
        if operands.len() == 0 || !consumed_any {
            break;
        }
    }
    Ok(Output::new(out, "", 0))
}

fn render_conversion(conv: char, operand: &str, precision: &str) -> String {
    match conv {
        'd' | 'i' => parse_int(operand).to_string(),
        'u' => (parse_int(operand).unsigned_abs()).to_string(),
        'x' => format!("{:x}", parse_int(operand)),
        'X' => format!("{:X}", parse_int(operand)),
        'o' => format!("{:o}", parse_int(operand)),
        'c' => operand.chars().next().map(String::from).unwrap_or_default(),
        'q' => format!("'{}'", operand.replace('\'', r"'\''")),
        'b' => decode_escapes(operand).0,
        'f' => {
            let value: f64 = operand.parse().unwrap_or(0.0);
            let digits: usize = precision.parse().unwrap_or(6);
            format!("{:.*}", digits, value)
        }
        's' => {
            if precision.is_empty() {
                operand.to_string()
            } else {
                let limit: usize = precision.parse().unwrap_or(0);
                operand.chars().take(limit).collect()
            }
        }
        _ => operand.to_string(),
    }
}

fn parse_int(text: &str) -> i64 {
    crate::syntax::parse_integer_literal(text).unwrap_or(0)
}

fn pad(text: &str, width: &str, left: bool, zero: bool) -> String {
    let Ok(width) = width.parse::<usize>() else {
        return text.to_string();
    };
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let fill = width - len;
    if left {
        format!("{}{}", text, " ".repeat(fill))
    } else if zero {
        format!("{}{}", "0".repeat(fill), text)
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}
