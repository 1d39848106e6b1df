//! `set` and `shopt`

use crate::engine::builtins::usage_error;
use crate::engine::env::Env;
use crate::engine::flow::{Exec, Output};
use crate::engine::walker::Walker;

const SET_OPTIONS: &[(&str, char)] = &[
    ("allexport", 'a'),
    ("errexit", 'e'),
    ("noglob", 'f'),
    ("noclobber", 'C'),
    ("noexec", 'n'),
    ("nounset", 'u'),
    ("verbose", 'v'),
    ("xtrace", 'x'),
    ("pipefail", ' '),
];

fn apply_flag(env: &mut Env, letter: char, enable: bool) -> bool {
    match letter {
        'a' => env.flags.allexport = enable,
        'e' => env.flags.errexit = enable,
        'f' => env.flags.noglob = enable,
        'C' => env.flags.noclobber = enable,
        'n' => env.flags.noexec = enable,
        'u' => env.flags.nounset = enable,
        'v' => env.flags.verbose = enable,
        'x' => env.flags.xtrace = enable,
        _ => return false,
    }
    true
}

fn apply_named(env: &mut Env, name: &str, enable: bool) -> bool {
    match name {
        "pipefail" => env.flags.pipefail = enable,
        "errexit" => env.flags.errexit = enable,
        "nounset" => env.flags.nounset = enable,
        "xtrace" => env.flags.xtrace = enable,
        "verbose" => env.flags.verbose = enable,
        "noglob" => env.flags.noglob = enable,
        "noclobber" => env.flags.noclobber = enable,
        "noexec" => env.flags.noexec = enable,
        "allexport" => env.flags.allexport = enable,
        _ => return false,
    }
    true
}

fn named_state(env: &Env, name: &str) -> Option<bool> {
    Some(match name {
        "pipefail" => env.flags.pipefail,
        "errexit" => env.flags.errexit,
        "nounset" => env.flags.nounset,
        "xtrace" => env.flags.xtrace,
        "verbose" => env.flags.verbose,
        "noglob" => env.flags.noglob,
        "noclobber" => env.flags.noclobber,
        "noexec" => env.flags.noexec,
        "allexport" => env.flags.allexport,
        _ => return None,
    })
}

pub fn set(walker: &Walker, env: &mut Env, args: &[String]) -> Exec {
    let _ = walker;
    if args.is_empty() {
        // List variables, sorted, name=value.
        let mut lines: Vec<String> = env
            .globals_iter()
            .map(|(name, var)| format!("{}={}\n", name, var.value.as_scalar()))
            .collect();
        lines.sort();
        return Ok(Output::new(lines.concat(), "", 0));
    }

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--" => {
                env.positionals = args[i + 1..].to_vec();
                return Ok(Output::success());
            }
            "-o" | "+o" => {
                let enable = arg.starts_with('-');
                match args.get(i + 1) {
                    Some(name) => {
                        if !apply_named(env, name, enable) {
                            return usage_error("set", format!("{}: invalid option name", name));
                        }
                        i += 2;
                        continue;
                    }
                    None => {
                        // `set -o` alone lists option states.
                        let mut lines: Vec<String> = SET_OPTIONS
                            .iter()
                            .map(|(name, _)| {
                                let on = named_state(env, name).unwrap_or(false);
                                format!("{:<15} {}\n", name, if on { "on" } else { "off" })
                            })
                            .collect();
                        lines.sort();
                        return Ok(Output::new(lines.concat(), "", 0));
                    }
                }
            }
            _ if arg.starts_with('-') || arg.starts_with('+') => {
                let enable = arg.starts_with('-');
                for letter in arg[1..].chars() {
                    if !apply_flag(env, letter, enable) {
                        return usage_error("set", format!("-{}: invalid option", letter));
                    }
                }
            }
            _ => {
                env.positionals = args[i..].to_vec();
                return Ok(Output::success());
            }
        }
        i += 1;
    }
    Ok(Output::success())
}

fn shopt_state(env: &Env, name: &str) -> Option<bool> {
    Some(match name {
        "extglob" => env.shopts.extglob,
        "dotglob" => env.shopts.dotglob,
        "nullglob" => env.shopts.nullglob,
        "failglob" => env.shopts.failglob,
        "globstar" => env.shopts.globstar,
        "nocaseglob" => env.shopts.nocaseglob,
        "nocasematch" => env.shopts.nocasematch,
        "expand_aliases" => env.shopts.expand_aliases,
        "lastpipe" => env.shopts.lastpipe,
        _ => return None,
    })
}

fn shopt_apply(env: &mut Env, name: &str, enable: bool) -> bool {
    match name {
        "extglob" => env.shopts.extglob = enable,
        "dotglob" => env.shopts.dotglob = enable,
        "nullglob" => env.shopts.nullglob = enable,
        "failglob" => env.shopts.failglob = enable,
        "globstar" => env.shopts.globstar = enable,
        "nocaseglob" => env.shopts.nocaseglob = enable,
        "nocasematch" => env.shopts.nocasematch = enable,
        "expand_aliases" => env.shopts.expand_aliases = enable,
        "lastpipe" => env.shopts.lastpipe = enable,
        _ => return false,
    }
    true
}

const SHOPT_NAMES: &[&str] = &[
    "dotglob",
    "expand_aliases",
    "extglob",
    "failglob",
    "globstar",
    "lastpipe",
    "nocaseglob",
    "nocasematch",
    "nullglob",
];

pub fn shopt(env: &mut Env, args: &[String]) -> Exec {
    let mut mode: Option<bool> = None;
    let mut print_only = false;
    let mut names: Vec<&String> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-s" => mode = Some(true),
            "-u" => mode = Some(false),
            "-p" => print_only = true,
            "-q" => {}
            _ => names.push(arg),
        }
    }

    if names.is_empty() {
        let mut out = String::new();
        for name in SHOPT_NAMES {
            let on = shopt_state(env, name).unwrap_or(false);
            if print_only {
                out.push_str(&format!(
                    "shopt {} {}\n",
                    if on { "-s" } else { "-u" },
                    name
                ));
            } else {
                out.push_str(&format!("{:<15}\t{}\n", name, if on { "on" } else { "off" }));
            }
        }
        return Ok(Output::new(out, "", 0));
    }

    let mut stderr = String::new();
    let mut status = 0;
    for name in names {
        match mode {
            Some(enable) => {
                if !shopt_apply(env, name, enable) {
                    stderr.push_str(&format!("bash: shopt: {}: invalid shell option name\n", name));
                    status = 1;
                }
            }
            None => match shopt_state(env, name) {
                Some(on) => {
                    if !on {
                        status = 1;
                    }
                }
                None => {
                    stderr.push_str(&format!("bash: shopt: {}: invalid shell option name\n", name));
                    status = 1;
                }
            },
        }
    }
    Ok(Output::new("", stderr, status))
}
