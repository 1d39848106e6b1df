//! Control and Miscellaneous Builtins
//!
//! `exit`, `return`, `break`, `continue`, `eval`, `source`, `trap`,
//! `shift`, `let`, `getopts`, `type`, `command`, `which`.

use crate::engine::builtins::{fail, numeric_arg, usage_error};
use crate::engine::env::Env;
use crate::engine::flow::{Exec, Flow, FlowKind, Output};
use crate::engine::walker::Walker;
use crate::syntax::{parse, Parser};

pub fn exit(env: &mut Env, args: &[String]) -> Exec {
    let code = match args.first() {
        Some(text) => match numeric_arg("exit", text) {
            Ok(n) => (n & 0xff) as i32,
            Err(mut flow) => {
                // Invalid argument still exits, with status 2.
                flow.kind = FlowKind::Exit(2);
                return Err(flow);
            }
        },
        None => env.last_status,
    };
    Err(Flow::new(FlowKind::Exit(code)))
}

pub fn return_(env: &mut Env, args: &[String]) -> Exec {
    if env.func_stack.is_empty() && env.source_depth == 0 {
        return fail("return", "can only `return' from a function or sourced script");
    }
    let code = match args.first() {
        Some(text) => (numeric_arg("return", text)? & 0xff) as i32,
        None => env.last_status,
    };
    Err(Flow::new(FlowKind::Return(code)))
}

pub fn break_(_env: &mut Env, args: &[String]) -> Exec {
    let n = match args.first() {
        Some(text) => numeric_arg("break", text)?,
        None => 1,
    };
    if n < 1 {
        return usage_error("break", format!("{}: loop count out of range", n));
    }
    Err(Flow::new(FlowKind::Break(n as u32)))
}

pub fn continue_(_env: &mut Env, args: &[String]) -> Exec {
    let n = match args.first() {
        Some(text) => numeric_arg("continue", text)?,
        None => 1,
    };
    if n < 1 {
        return usage_error("continue", format!("{}: loop count out of range", n));
    }
    Err(Flow::new(FlowKind::Continue(n as u32)))
}

pub fn shift(env: &mut Env, args: &[String]) -> Exec {
    let n = match args.first() {
        Some(text) => numeric_arg("shift", text)?,
        None => 1,
    };
    if n < 0 {
        return usage_error("shift", format!("{}: numeric argument required", n));
    }
    if n as usize > env.positionals.len() {
        return Ok(Output::failure("bash: shift: shift count out of range\n", 1));
    }
    env.positionals.drain(..n as usize);
    Ok(Output::success())
}

pub fn eval(walker: &Walker, env: &mut Env, args: &[String], stdin: &str) -> Exec {
    let script_text = args.join(" ");
    if script_text.trim().is_empty() {
        return Ok(Output::success());
    }
    let script = match parse(&script_text) {
        Ok(script) => script,
        Err(e) => {
            return Ok(Output::failure(
                format!("bash: eval: syntax error: {}\n", e),
                2,
            ))
        }
    };
    walker.run_body(env, &script.items, stdin)
}

pub fn source(walker: &Walker, env: &mut Env, args: &[String], stdin: &str) -> Exec {
    let Some(file) = args.first() else {
        return usage_error("source", "filename argument required");
    };

    // Names with a slash are paths; bare names search $PATH before cwd.
    let path = if file.contains('/') {
        let path = walker.fs.resolve(&env.cwd, file);
        walker.fs.is_file(&path).then_some(path)
    } else {
        let path_var = env.get_str("PATH").unwrap_or_default();
        path_var
            .split(':')
            .filter(|d| !d.is_empty() && walker.fs.is_dir(d))
            .map(|d| format!("{}/{}", d, file))
            .find(|p| walker.fs.is_file(p))
            .or_else(|| {
                let local = walker.fs.resolve(&env.cwd, file);
                walker.fs.is_file(&local).then_some(local)
            })
    };

    let Some(path) = path else {
        return fail("source", format!("{}: No such file or directory", file));
    };
    let content = match walker.fs.read_to_string(&path) {
        Ok(content) => content,
        Err(e) => return fail("source", e.to_string()),
    };
    let script = match Parser::with_source_label(&content, &path).parse_script_to_end() {
        Ok(script) => script,
        Err(e) => {
            // A parse error aborts only the sourced file.
            return Ok(Output::failure(format!("bash: {}: {}\n", path, e), 2));
        }
    };

    let _guard = walker.gov.enter_call().map_err(Flow::limit)?;
    // Positional parameters are replaced for the duration when extra
    // arguments were given, and always restored.
    let replace_positionals = args.len() > 1;
    let saved_positionals = if replace_positionals {
        Some(std::mem::replace(&mut env.positionals, args[1..].to_vec()))
    } else {
        None
    };
    env.source_depth += 1;
    env.source_stack.push(path.clone());

    let result = walker.run_script(env, &script, stdin);

    env.source_stack.pop();
    env.source_depth -= 1;
    if let Some(saved) = saved_positionals {
        env.positionals = saved;
    }

    match result {
        // `return` leaves the sourced script, not the shell.
        Err(flow) if matches!(flow.kind, FlowKind::Return(_)) => Ok(flow.into_output()),
        other => other,
    }
}

pub fn trap(env: &mut Env, args: &[String]) -> Exec {
    if args.is_empty() {
        let mut lines: Vec<String> = env
            .traps
            .iter()
            .map(|(signal, action)| format!("trap -- '{}' {}\n", action, signal))
            .collect();
        lines.sort();
        return Ok(Output::new(lines.concat(), "", 0));
    }
    let mut iter = args.iter();
    let first = iter.next().map(String::as_str).unwrap_or("");
    if first == "-p" {
        let mut lines: Vec<String> = env
            .traps
            .iter()
            .map(|(signal, action)| format!("trap -- '{}' {}\n", action, signal))
            .collect();
        lines.sort();
        return Ok(Output::new(lines.concat(), "", 0));
    }
    let (action, signals): (&str, Vec<&String>) = if first == "--" {
        match iter.next() {
            Some(action) => (action, iter.collect()),
            None => return Ok(Output::success()),
        }
    } else {
        (first, iter.collect())
    };
    for signal in signals {
        let signal = signal.to_uppercase();
        let signal = signal.strip_prefix("SIG").unwrap_or(&signal).to_string();
        if action.is_empty() || action == "-" {
            env.traps.remove(&signal);
        } else {
            env.traps.insert(signal, action.to_string());
        }
    }
    Ok(Output::success())
}

pub fn let_(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    if args.is_empty() {
        return usage_error("let", "expression expected");
    }
    let mut last = 0;
    for arg in args {
        last = walker.eval_arith_text(env, arg)?;
    }
    Ok(Output::new("", "", if last != 0 { 0 } else { 1 }))
}

pub fn getopts(env: &mut Env, args: &[String]) -> Exec {
    let (Some(optstring), Some(var)) = (args.first(), args.get(1)) else {
        return usage_error("getopts", "usage: getopts optstring name [args]");
    };
    let operands: Vec<String> = if args.len() > 2 {
        args[2..].to_vec()
    } else {
        env.positionals.clone()
    };
    let mut index: usize = env
        .get_str("OPTIND")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    let silent = optstring.starts_with(':');
    let spec: Vec<char> = optstring.trim_start_matches(':').chars().collect();

    let Some(arg) = operands.get(index.wrapping_sub(1)) else {
        env.set_str(var, "?");
        return Ok(Output::new("", "", 1));
    };
    if !arg.starts_with('-') || arg == "-" || arg == "--" {
        env.set_str(var, "?");
        return Ok(Output::new("", "", 1));
    }

    let flag = arg.chars().nth(1).unwrap_or('?');
    index += 1;
    let pos = spec.iter().position(|&c| c == flag);
    match pos {
        None => {
            env.set_str(var, "?");
            if !silent {
                env.set_str("OPTIND", index.to_string());
                return Ok(Output::failure(
                    format!("bash: getopts: illegal option -- {}\n", flag),
                    0,
                ));
            }
        }
        Some(i) => {
            env.set_str(var, flag.to_string());
            if spec.get(i + 1) == Some(&':') {
                match operands.get(index.wrapping_sub(1)) {
                    Some(value) => {
                        env.set_str("OPTARG", value.clone());
                        index += 1;
                    }
                    None => {
                        env.set_str(var, if silent { ":" } else { "?" }.to_string());
                    }
                }
            }
        }
    }
    env.set_str("OPTIND", index.to_string());
    Ok(Output::success())
}

pub fn type_(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut status = 0;
    for name in args.iter().filter(|a| !a.starts_with('-')) {
        if env.aliases.contains_key(name) {
            stdout.push_str(&format!(
                "{} is aliased to `{}'\n",
                name,
                env.aliases[name.as_str()]
            ));
        } else if crate::engine::builtins::is_special_builtin(name) {
            // Mirrors dispatch: the special builtins outrank functions.
            stdout.push_str(&format!("{} is a shell builtin\n", name));
        } else if env.functions.contains_key(name) {
            stdout.push_str(&format!("{} is a function\n", name));
        } else if is_builtin_name(name) {
            stdout.push_str(&format!("{} is a shell builtin\n", name));
        } else if walker.tools.contains(name) {
            stdout.push_str(&format!("{} is /usr/bin/{}\n", name, name));
        } else if let Some(path) = path_lookup(walker, env, name) {
            stdout.push_str(&format!("{} is {}\n", name, path));
        } else {
            stderr.push_str(&format!("bash: type: {}: not found\n", name));
            status = 1;
        }
    }
    Ok(Output::new(stdout, stderr, status))
}

pub fn command(walker: &Walker, env: &mut Env, args: &[String], stdin: &str) -> Exec {
    let mut rest: Vec<String> = Vec::new();
    let mut describe = false;
    for arg in args {
        match arg.as_str() {
            "-v" | "-V" => describe = true,
            "-p" => {}
            _ => rest.push(arg.clone()),
        }
    }
    let Some(name) = rest.first().cloned() else {
        return Ok(Output::success());
    };
    if describe {
        if is_builtin_name(&name) || walker.tools.contains(&name) || env.functions.contains_key(&name)
        {
            return Ok(Output::new(format!("{}\n", name), "", 0));
        }
        if let Some(path) = path_lookup(walker, env, &name) {
            return Ok(Output::new(format!("{}\n", path), "", 0));
        }
        return Ok(Output::new("", "", 1));
    }
    // `command name` skips functions but keeps builtins and plugins.
    if let Some(result) = crate::engine::builtins::run(walker, env, &name, &rest[1..], stdin) {
        return result;
    }
    if let Some(tool) = walker.tools.get(&name) {
        return walker.run_registered_tool(env, tool, &rest[1..], stdin);
    }
    walker.dispatch(env, &name, &rest[1..], stdin)
}

pub fn which(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let mut stdout = String::new();
    let mut status = 0;
    for name in args {
        if is_builtin_name(name) || walker.tools.contains(name) {
            stdout.push_str(&format!("/usr/bin/{}\n", name));
        } else if let Some(path) = path_lookup(walker, env, name) {
            stdout.push_str(&format!("{}\n", path));
        } else {
            status = 1;
        }
    }
    Ok(Output::new(stdout, "", status))
}

fn path_lookup(walker: &Walker, env: &Env, name: &str) -> Option<String> {
    let path_var = env.get_str("PATH").unwrap_or_default();
    path_var
        .split(':')
        .filter(|d| !d.is_empty())
        .map(|d| format!("{}/{}", d, name))
        .find(|p| walker.fs.is_file(p))
}

pub(crate) fn is_builtin_name(name: &str) -> bool {
    matches!(
        name,
        ":" | "true"
            | "false"
            | "echo"
            | "printf"
            | "cd"
            | "pwd"
            | "pushd"
            | "popd"
            | "dirs"
            | "export"
            | "readonly"
            | "unset"
            | "local"
            | "declare"
            | "typeset"
            | "alias"
            | "unalias"
            | "set"
            | "shopt"
            | "exit"
            | "return"
            | "break"
            | "continue"
            | "eval"
            | "source"
            | "."
            | "trap"
            | "shift"
            | "let"
            | "getopts"
            | "read"
            | "test"
            | "["
            | "type"
            | "command"
            | "which"
            | "hash"
    )
}
