//! `alias` / `unalias`

use crate::engine::env::Env;
use crate::engine::flow::{Exec, Output};

pub fn alias(env: &mut Env, args: &[String]) -> Exec {
    if args.is_empty() {
        let mut lines: Vec<String> = env
            .aliases
            .iter()
            .map(|(name, value)| format!("alias {}='{}'\n", name, value.replace('\'', r"'\''")))
            .collect();
        lines.sort();
        return Ok(Output::new(lines.concat(), "", 0));
    }

    let mut stderr = String::new();
    let mut stdout = String::new();
    let mut status = 0;
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => {
                env.aliases.insert(name.to_string(), value.to_string());
            }
            None => match env.aliases.get(arg) {
                Some(value) => {
                    stdout.push_str(&format!(
                        "alias {}='{}'\n",
                        arg,
                        value.replace('\'', r"'\''")
                    ));
                }
                None => {
                    stderr.push_str(&format!("bash: alias: {}: not found\n", arg));
                    status = 1;
                }
            },
        }
    }
    Ok(Output::new(stdout, stderr, status))
}

pub fn unalias(env: &mut Env, args: &[String]) -> Exec {
    if args.iter().any(|a| a == "-a") {
        env.aliases.clear();
        return Ok(Output::success());
    }
    let mut stderr = String::new();
    let mut status = 0;
    for arg in args {
        if env.aliases.remove(arg).is_none() {
            stderr.push_str(&format!("bash: unalias: {}: not found\n", arg));
            status = 1;
        }
    }
    Ok(Output::new("", stderr, status))
}
