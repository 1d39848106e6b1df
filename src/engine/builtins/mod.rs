//! Builtin Suite
//!
//! Shell builtins run inside the interpreter with direct access to the
//! environment. The special builtins (the POSIX set: `:`, `.`, `break`,
//! `continue`, `eval`, `exit`, `export`, `readonly`, `return`, `set`,
//! `shift`, `source`, `trap`, `unset`) resolve before functions, so a
//! script cannot shadow them; the rest are consulted after functions and
//! before the plugin registry. Each file groups related builtins; the
//! table here is the single dispatch point.

mod alias;
mod cd;
mod control;
mod echo;
mod opts;
mod read;
mod testcmd;
mod vars;

use crate::engine::env::Env;
use crate::engine::flow::{Exec, Flow, FlowKind, Output};
use crate::engine::walker::Walker;

/// The builtins that resolve before user functions. Defining a function
/// named `exit` or `export` must not capture the real thing.
pub fn is_special_builtin(name: &str) -> bool {
    matches!(
        name,
        ":" | "."
            | "break"
            | "continue"
            | "eval"
            | "exit"
            | "export"
            | "readonly"
            | "return"
            | "set"
            | "shift"
            | "source"
            | "trap"
            | "unset"
    )
}

/// Run `name` as a builtin, or report that it is not one.
pub fn run(
    walker: &Walker,
    env: &mut Env,
    name: &str,
    args: &[String],
    stdin: &str,
) -> Option<Exec> {
    let result = match name {
        ":" | "true" => Ok(Output::success()),
        "false" => Ok(Output::new("", "", 1)),

        "echo" => echo::echo(env, args),
        "printf" => echo::printf(env, args),

        "cd" => cd::cd(walker, env, args),
        "pwd" => cd::pwd(env, args),
        "pushd" => cd::pushd(walker, env, args),
        "popd" => cd::popd(walker, env, args),
        "dirs" => cd::dirs(env, args),

        "export" => vars::export(walker, env, args),
        "readonly" => vars::readonly(walker, env, args),
        "unset" => vars::unset(env, args),
        "local" => vars::local(walker, env, args),
        "declare" | "typeset" => vars::declare(walker, env, args),

        "alias" => alias::alias(env, args),
        "unalias" => alias::unalias(env, args),

        "set" => opts::set(walker, env, args),
        "shopt" => opts::shopt(env, args),

        "exit" => control::exit(env, args),
        "return" => control::return_(env, args),
        "break" => control::break_(env, args),
        "continue" => control::continue_(env, args),
        "eval" => control::eval(walker, env, args, stdin),
        "source" | "." => control::source(walker, env, args, stdin),
        "trap" => control::trap(env, args),
        "shift" => control::shift(env, args),
        "let" => control::let_(walker, env, args),
        "getopts" => control::getopts(env, args),

        "read" => read::read(walker, env, args, stdin),

        "test" | "[" => testcmd::test(walker, env, name, args),

        "type" => control::type_(walker, env, args),
        "command" => control::command(walker, env, args, stdin),
        "which" => control::which(walker, env, args),
        "hash" => Ok(Output::success()),

        _ => return None,
    };
    Some(result)
}

/// Builtin-misuse failure: message on stderr, exit 2.
pub(crate) fn usage_error(name: &str, message: impl Into<String>) -> Exec {
    Ok(Output::failure(
        format!("bash: {}: {}\n", name, message.into()),
        2,
    ))
}

/// Generic builtin failure with exit 1.
pub(crate) fn fail(name: &str, message: impl Into<String>) -> Exec {
    Ok(Output::failure(
        format!("bash: {}: {}\n", name, message.into()),
        1,
    ))
}

/// Shared numeric-argument parsing for `exit`/`return`/`break`/`shift`.
pub(crate) fn numeric_arg(name: &str, text: &str) -> Result<i64, Flow> {
    text.parse::<i64>().map_err(|_| {
        let mut flow = Flow::new(FlowKind::Fail(2));
        flow.stderr = format!("bash: {}: {}: numeric argument required\n", name, text);
        flow
    })
}
