//! Variable Builtins
//!
//! `export`, `readonly`, `unset`, `local`, and `declare`/`typeset`.

use crate::engine::builtins::fail;
use crate::engine::env::{Env, Value, Var, VarAttrs};
use crate::engine::flow::{Exec, Output};
use crate::engine::walker::Walker;
use crate::syntax::ast::Word;

/// POSIX single-quote escaping for listings.
fn sh_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Split a `NAME=value` argument. Returns (name, Some(value)) or
/// (name, None) for a bare name.
fn split_assignment(arg: &str) -> (String, Option<String>) {
    match arg.split_once('=') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (arg.to_string(), None),
    }
}

pub fn export(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let _ = walker;
    let mut remove = false;
    let mut operands: Vec<&String> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-n" => remove = true,
            "-p" => {}
            _ => operands.push(arg),
        }
    }

    if operands.is_empty() {
        let mut lines: Vec<String> = env
            .globals_iter()
            .filter(|(_, v)| v.attrs.exported)
            .map(|(name, var)| {
                format!("declare -x {}={}\n", name, sh_quote(&var.value.as_scalar()))
            })
            .collect();
        lines.sort();
        return Ok(Output::new(lines.concat(), "", 0));
    }

    for arg in operands {
        let (name, value) = split_assignment(arg);
        if env.is_readonly(&name) && value.is_some() {
            return fail("export", format!("{}: readonly variable", name));
        }
        if let Some(value) = value {
            env.set_str(&name, value);
        }
        env.set_attr(&name, |a| a.exported = !remove);
    }
    Ok(Output::success())
}

pub fn readonly(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let _ = walker;
    if args.is_empty() || args.iter().all(|a| a == "-p") {
        let mut lines: Vec<String> = env
            .globals_iter()
            .filter(|(_, v)| v.attrs.readonly)
            .map(|(name, var)| {
                format!("declare -r {}={}\n", name, sh_quote(&var.value.as_scalar()))
            })
            .collect();
        lines.sort();
        return Ok(Output::new(lines.concat(), "", 0));
    }
    for arg in args {
        if arg.starts_with('-') {
            continue;
        }
        let (name, value) = split_assignment(arg);
        if env.is_readonly(&name) && value.is_some() {
            return fail("readonly", format!("{}: readonly variable", name));
        }
        if let Some(value) = value {
            env.set_str(&name, value);
        }
        env.set_attr(&name, |a| a.readonly = true);
    }
    Ok(Output::success())
}

pub fn unset(env: &mut Env, args: &[String]) -> Exec {
    let mut functions_only = false;
    let mut vars_only = false;
    let mut status = 0;
    let mut stderr = String::new();
    for arg in args {
        match arg.as_str() {
            "-f" => functions_only = true,
            "-v" => vars_only = true,
            name => {
                if env.is_readonly(name) && !functions_only {
                    stderr.push_str(&format!("bash: unset: {}: cannot unset: readonly variable\n", name));
                    status = 1;
                    continue;
                }
                if functions_only {
                    env.functions.remove(name);
                } else if vars_only {
                    env.unset(name);
                } else if env.is_set(name) {
                    env.unset(name);
                } else {
                    env.functions.remove(name);
                }
            }
        }
    }
    Ok(Output::new("", stderr, status))
}

pub fn local(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    if !env.in_function() {
        return fail("local", "can only be used in a function");
    }
    let mut attrs = VarAttrs::default();
    let mut saw_array = false;
    let mut saw_assoc = false;
    for arg in args {
        if parse_attr_flag(arg, &mut attrs, &mut saw_array, &mut saw_assoc) {
            continue;
        }
        let (name, value) = split_assignment(arg);
        if env.is_readonly(&name) {
            return fail("local", format!("{}: readonly variable", name));
        }
        let value = match value {
            Some(text) => {
                let expanded = reexpand(walker, env, &text)?;
                Some(Var {
                    value: Value::Str(expanded),
                    attrs,
                })
            }
            None if saw_assoc => Some(Var {
                value: Value::Assoc(Default::default()),
                attrs,
            }),
            None if saw_array => Some(Var {
                value: Value::Indexed(Default::default()),
                attrs,
            }),
            None => None,
        };
        env.declare_local(&name, value);
    }
    Ok(Output::success())
}

pub fn declare(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let mut attrs = VarAttrs::default();
    let mut saw_array = false;
    let mut saw_assoc = false;
    let mut print = false;
    let mut names: Vec<&String> = Vec::new();
    for arg in args {
        if arg == "-p" {
            print = true;
            continue;
        }
        if parse_attr_flag(arg, &mut attrs, &mut saw_array, &mut saw_assoc) {
            continue;
        }
        names.push(arg);
    }

    if print || (names.is_empty() && args.iter().all(|a| a == "-p")) {
        return declare_print(env, &names);
    }
    if names.is_empty() {
        return declare_print(env, &[]);
    }

    for arg in names {
        let (name, value) = split_assignment(arg);
        if env.is_readonly(&name) && value.is_some() {
            return fail("declare", format!("{}: readonly variable", name));
        }
        let initial = match value {
            Some(text) => {
                let expanded = reexpand(walker, env, &text)?;
                Some(Value::Str(expanded))
            }
            None if saw_assoc => Some(Value::Assoc(Default::default())),
            None if saw_array && env.get(&name).is_none() => {
                Some(Value::Indexed(Default::default()))
            }
            None => None,
        };

        if env.in_function() {
            // Inside a function, declare behaves like local.
            let binding = match initial.map(|value| Var { value, attrs }) {
                Some(var) => Some(var),
                None => env.get(&name).cloned(),
            };
            env.declare_local(&name, binding);
        } else if let Some(value) = initial {
            env.set_var(&name, value);
        }
        env.set_attr(&name, |a| {
            a.exported |= attrs.exported;
            a.readonly |= attrs.readonly;
            a.integer |= attrs.integer;
            a.lowercase |= attrs.lowercase;
            a.uppercase |= attrs.uppercase;
        });
    }
    Ok(Output::success())
}

fn parse_attr_flag(
    arg: &str,
    attrs: &mut VarAttrs,
    saw_array: &mut bool,
    saw_assoc: &mut bool,
) -> bool {
    let (enable, letters) = if let Some(rest) = arg.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = arg.strip_prefix('+') {
        (false, rest)
    } else {
        return false;
    };
    if letters.is_empty() || !letters.chars().all(|c| "aAilrux".contains(c)) {
        return false;
    }
    for c in letters.chars() {
        match c {
            'a' => *saw_array = enable,
            'A' => *saw_assoc = enable,
            'i' => attrs.integer = enable,
            'l' => attrs.lowercase = enable,
            'u' => attrs.uppercase = enable,
            'r' => attrs.readonly = enable,
            'x' => attrs.exported = enable,
            _ => {}
        }
    }
    true
}

fn declare_print(env: &Env, names: &[&String]) -> Exec {
    let mut lines: Vec<String> = Vec::new();
    for (name, var) in env.globals_iter() {
        if !names.is_empty() && !names.iter().any(|n| n.as_str() == name) {
            continue;
        }
        lines.push(render_declare(name, var));
    }
    lines.sort();
    Ok(Output::new(lines.concat(), "", 0))
}

fn render_declare(name: &str, var: &Var) -> String {
    let mut flags = String::new();
    if matches!(var.value, Value::Indexed(_)) {
        flags.push('a');
    }
    if matches!(var.value, Value::Assoc(_)) {
        flags.push('A');
    }
    if var.attrs.integer {
        flags.push('i');
    }
    if var.attrs.lowercase {
        flags.push('l');
    }
    if var.attrs.uppercase {
        flags.push('u');
    }
    if var.attrs.readonly {
        flags.push('r');
    }
    if var.attrs.exported {
        flags.push('x');
    }
    if flags.is_empty() {
        flags.push('-');
    }
    match &var.value {
        Value::Str(s) => format!("declare -{} {}={}\n", flags, name, sh_quote(s)),
        Value::Indexed(map) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{}]={}", k, sh_quote(v)))
                .collect();
            format!("declare -{} {}=({})\n", flags, name, body.join(" "))
        }
        Value::Assoc(map) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{}]={}", sh_quote(k), sh_quote(v)))
                .collect();
            format!("declare -{} {}=({})\n", flags, name, body.join(" "))
        }
    }
}

/// `declare x=$y` arrives with `$y` already expanded by the simple
/// command's word expansion, so the value text is normally literal; a
/// stray `$` is still honoured for robustness.
fn reexpand(walker: &Walker, env: &mut Env, text: &str) -> Result<String, crate::engine::flow::Flow> {
    if !text.contains('$') {
        return Ok(text.to_string());
    }
    let word = crate::syntax::Parser::new(text)
        .parse_word_to_end()
        .unwrap_or_else(|_| Word::lit(text));
    walker.expand_word_str(env, &word)
}
