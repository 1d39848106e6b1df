//! `test` / `[`
//!
//! The classic word-based test command. Operands arrive fully expanded,
//! so this is a tiny evaluator over strings that reuses the walker's
//! file probes.

use crate::engine::env::Env;
use crate::engine::flow::{Exec, Output};
use crate::engine::walker::Walker;
use crate::syntax::ast::Word;

pub fn test(walker: &Walker, env: &mut Env, name: &str, args: &[String]) -> Exec {
    let mut operands: &[String] = args;
    if name == "[" {
        match operands.last().map(String::as_str) {
            Some("]") => operands = &operands[..operands.len() - 1],
            _ => {
                return Ok(Output::failure("bash: [: missing `]'\n", 2));
            }
        }
    }
    match eval(walker, env, operands) {
        Ok(true) => Ok(Output::success()),
        Ok(false) => Ok(Output::new("", "", 1)),
        Err(message) => Ok(Output::failure(format!("bash: {}: {}\n", name, message), 2)),
    }
}

fn eval(walker: &Walker, env: &mut Env, operands: &[String]) -> Result<bool, String> {
    match operands.len() {
        0 => Ok(false),
        1 => Ok(!operands[0].is_empty()),
        2 => {
            if operands[0] == "!" {
                return Ok(!eval(walker, env, &operands[1..])?);
            }
            unary(walker, env, &operands[0], &operands[1])
        }
        3 => {
            if operands[0] == "!" {
                return Ok(!eval(walker, env, &operands[1..])?);
            }
            binary(env, &operands[1], &operands[0], &operands[2])
        }
        _ => {
            if operands[0] == "!" {
                return Ok(!eval(walker, env, &operands[1..])?);
            }
            // Left-to-right -a / -o folding.
            if let Some(pos) = operands.iter().position(|o| o == "-a" || o == "-o") {
                let lhs = eval(walker, env, &operands[..pos])?;
                let rhs = eval(walker, env, &operands[pos + 1..])?;
                return Ok(if operands[pos] == "-a" {
                    lhs && rhs
                } else {
                    lhs || rhs
                });
            }
            Err("too many arguments".to_string())
        }
    }
}

fn unary(walker: &Walker, env: &mut Env, op: &str, operand: &str) -> Result<bool, String> {
    let Some(letter) = op.strip_prefix('-').and_then(|s| {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }) else {
        return Err(format!("{}: unary operator expected", op));
    };
    walker
        .eval_unary_test(env, letter, &Word::lit(operand))
        .map_err(|flow| flow.stderr.trim().to_string())
}

fn binary(env: &Env, op: &str, lhs: &str, rhs: &str) -> Result<bool, String> {
    let _ = env;
    let num = |text: &str| -> Result<i64, String> {
        text.trim()
            .parse::<i64>()
            .map_err(|_| format!("{}: integer expression expected", text))
    };
    match op {
        "=" | "==" => Ok(lhs == rhs),
        "!=" => Ok(lhs != rhs),
        "<" => Ok(lhs < rhs),
        ">" => Ok(lhs > rhs),
        "-eq" => Ok(num(lhs)? == num(rhs)?),
        "-ne" => Ok(num(lhs)? != num(rhs)?),
        "-lt" => Ok(num(lhs)? < num(rhs)?),
        "-le" => Ok(num(lhs)? <= num(rhs)?),
        "-gt" => Ok(num(lhs)? > num(rhs)?),
        "-ge" => Ok(num(lhs)? >= num(rhs)?),
        _ => Err(format!("{}: binary operator expected", op)),
    }
}
