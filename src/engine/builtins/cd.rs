//! Directory Builtins
//!
//! `cd`, `pwd`, and the directory stack (`pushd`/`popd`/`dirs`).

use crate::engine::builtins::fail;
use crate::engine::env::Env;
use crate::engine::flow::{Exec, Output};
use crate::engine::walker::Walker;

pub fn cd(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    // -L/-P are accepted; path resolution is always logical here.
    let operands: Vec<&String> = args
        .iter()
        .filter(|a| a.as_str() != "-L" && a.as_str() != "-P")
        .collect();

    let mut print_target = false;
    let target = match operands.first().map(|s| s.as_str()) {
        None | Some("~") => env.get_str("HOME").unwrap_or_else(|| "/".to_string()),
        Some("-") => {
            print_target = true;
            env.prev_dir.clone()
        }
        Some(dir) => dir.to_string(),
    };

    change_dir(walker, env, &target, "cd", print_target)
}

fn change_dir(
    walker: &Walker,
    env: &mut Env,
    target: &str,
    name: &str,
    print_target: bool,
) -> Exec {
    let resolved = walker.fs.resolve(&env.cwd, target);
    match walker.fs.metadata(&resolved) {
        Ok(meta) if meta.is_dir() => {
            env.prev_dir = std::mem::replace(&mut env.cwd, resolved.clone());
            env.set_str("PWD", resolved.clone());
            env.set_str("OLDPWD", env.prev_dir.clone());
            let stdout = if print_target {
                format!("{}\n", resolved)
            } else {
                String::new()
            };
            Ok(Output::new(stdout, "", 0))
        }
        Ok(_) => fail(name, format!("{}: Not a directory", target)),
        Err(_) => fail(name, format!("{}: No such file or directory", target)),
    }
}

pub fn pwd(env: &mut Env, _args: &[String]) -> Exec {
    Ok(Output::new(format!("{}\n", env.cwd), "", 0))
}

pub fn pushd(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    match args.first().map(String::as_str) {
        None => {
            // Swap the two top entries.
            let Some(top) = env.dir_stack.pop() else {
                return fail("pushd", "no other directory");
            };
            let old = env.cwd.clone();
            let result = change_dir(walker, env, &top, "pushd", false)?;
            if result.status != 0 {
                env.dir_stack.push(top);
                return Ok(result);
            }
            env.dir_stack.push(old);
            Ok(stack_listing(env))
        }
        Some(dir) => {
            let old = env.cwd.clone();
            let result = change_dir(walker, env, dir, "pushd", false)?;
            if result.status != 0 {
                return Ok(result);
            }
            env.dir_stack.push(old);
            Ok(stack_listing(env))
        }
    }
}

pub fn popd(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let _ = args;
    let Some(top) = env.dir_stack.pop() else {
        return fail("popd", "directory stack empty");
    };
    let result = change_dir(walker, env, &top, "popd", false)?;
    if result.status != 0 {
        env.dir_stack.push(top);
        return Ok(result);
    }
    Ok(stack_listing(env))
}

pub fn dirs(env: &mut Env, args: &[String]) -> Exec {
    let mut clear = false;
    let mut per_line = false;
    let mut numbered = false;
    let mut literal = false;
    for arg in args {
        match arg.as_str() {
            "-c" => clear = true,
            "-p" => per_line = true,
            "-v" => {
                per_line = true;
                numbered = true;
            }
            "-l" => literal = true,
            _ => {}
        }
    }
    if clear {
        env.dir_stack.clear();
        return Ok(Output::success());
    }

    let home = env.get_str("HOME").unwrap_or_default();
    let render = |dir: &str| -> String {
        if literal {
            dir.to_string()
        } else {
            tilde_render(dir, &home)
        }
    };

    let mut entries: Vec<String> = vec![render(&env.cwd)];
    entries.extend(env.dir_stack.iter().rev().map(|d| render(d)));

    let stdout = if per_line {
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                if numbered {
                    format!(" {}  {}\n", i, e)
                } else {
                    format!("{}\n", e)
                }
            })
            .collect()
    } else {
        format!("{}\n", entries.join(" "))
    };
    Ok(Output::new(stdout, "", 0))
}

fn stack_listing(env: &Env) -> Output {
    let home = env.get_str("HOME").unwrap_or_default();
    let mut entries = vec![tilde_render(&env.cwd, &home)];
    entries.extend(env.dir_stack.iter().rev().map(|d| tilde_render(d, &home)));
    Output::new(format!("{}\n", entries.join(" ")), "", 0)
}

fn tilde_render(dir: &str, home: &str) -> String {
    if home.is_empty() {
        return dir.to_string();
    }
    if dir == home {
        "~".to_string()
    } else if let Some(rest) = dir.strip_prefix(&format!("{}/", home)) {
        format!("~/{}", rest)
    } else {
        dir.to_string()
    }
}
