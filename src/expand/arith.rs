//! Arithmetic Evaluation
//!
//! 64-bit signed wrapping semantics. Variable references resolve through
//! the environment and re-evaluate their text as an expression, so
//! `x=y; y=3; echo $((x))` prints 3; a recursion budget keeps reference
//! cycles from spinning.

use crate::engine::env::{Env, Value};
use crate::engine::flow::Flow;
use crate::engine::walker::Walker;
use crate::syntax::ast::{ArithAssignOp, ArithBinary, ArithExpr, ArithUnary};
use crate::syntax::parse_arith_text;

const MAX_EVAL_DEPTH: u32 = 64;

impl Walker {
    pub fn eval_arith(&self, env: &mut Env, expr: &ArithExpr) -> Result<i64, Flow> {
        self.eval_depth(env, expr, 0)
    }

    /// Evaluate a string as an arithmetic expression (variable values,
    /// subscripts, `let` arguments).
    pub(crate) fn eval_arith_text(&self, env: &mut Env, text: &str) -> Result<i64, Flow> {
        self.eval_text_depth(env, text, 0)
    }

    fn eval_text_depth(&self, env: &mut Env, text: &str, depth: u32) -> Result<i64, Flow> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        if depth > MAX_EVAL_DEPTH {
            return Err(Flow::fail(1, "expression recursion level exceeded"));
        }
        let expr = parse_arith_text(trimmed)
            .map_err(|e| Flow::fail(1, format!("arithmetic syntax error: {}", e.message)))?;
        self.eval_depth(env, &expr, depth + 1)
    }

    fn eval_depth(&self, env: &mut Env, expr: &ArithExpr, depth: u32) -> Result<i64, Flow> {
        if depth > MAX_EVAL_DEPTH {
            return Err(Flow::fail(1, "expression recursion level exceeded"));
        }
        match expr {
            ArithExpr::Num(n) => Ok(*n),
            ArithExpr::Group(inner) => self.eval_depth(env, inner, depth + 1),
            ArithExpr::Var { name, index, key } => {
                let text = self.read_arith_var(env, name, index.as_deref(), key.as_deref(), depth)?;
                self.eval_text_depth(env, &text, depth + 1)
            }
            ArithExpr::WordExpr(word) => {
                let text = self.expand_word_str(env, word)?;
                self.eval_text_depth(env, &text, depth + 1)
            }
            ArithExpr::Unary {
                op,
                operand,
                postfix,
            } => self.eval_unary(env, *op, operand, *postfix, depth),
            ArithExpr::Binary { op, lhs, rhs } => self.eval_binary(env, *op, lhs, rhs, depth),
            ArithExpr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_depth(env, cond, depth + 1)? != 0 {
                    self.eval_depth(env, then, depth + 1)
                } else {
                    self.eval_depth(env, otherwise, depth + 1)
                }
            }
            ArithExpr::Assign {
                name,
                index,
                key,
                op,
                rhs,
            } => {
                let rhs_value = self.eval_depth(env, rhs, depth + 1)?;
                let new = if *op == ArithAssignOp::Set {
                    rhs_value
                } else {
                    let current_text =
                        self.read_arith_var(env, name, index.as_deref(), key.as_deref(), depth)?;
                    let current = self.eval_text_depth(env, &current_text, depth + 1)?;
                    apply_compound(*op, current, rhs_value)?
                };
                self.write_arith_var(env, name, index.as_deref(), key.as_deref(), new, depth)?;
                Ok(new)
            }
        }
    }

    fn eval_unary(
        &self,
        env: &mut Env,
        op: ArithUnary,
        operand: &ArithExpr,
        postfix: bool,
        depth: u32,
    ) -> Result<i64, Flow> {
        match op {
            ArithUnary::Neg => Ok(self.eval_depth(env, operand, depth + 1)?.wrapping_neg()),
            ArithUnary::Pos => self.eval_depth(env, operand, depth + 1),
            ArithUnary::Not => Ok((self.eval_depth(env, operand, depth + 1)? == 0) as i64),
            ArithUnary::BitNot => Ok(!self.eval_depth(env, operand, depth + 1)?),
            ArithUnary::Inc | ArithUnary::Dec => {
                let ArithExpr::Var { name, index, key } = operand else {
                    return Err(Flow::fail(1, "++/-- requires a variable"));
                };
                let text =
                    self.read_arith_var(env, name, index.as_deref(), key.as_deref(), depth)?;
                let old = self.eval_text_depth(env, &text, depth + 1)?;
                let new = if op == ArithUnary::Inc {
                    old.wrapping_add(1)
                } else {
                    old.wrapping_sub(1)
                };
                self.write_arith_var(env, name, index.as_deref(), key.as_deref(), new, depth)?;
                Ok(if postfix { old } else { new })
            }
        }
    }

    fn eval_binary(
        &self,
        env: &mut Env,
        op: ArithBinary,
        lhs: &ArithExpr,
        rhs: &ArithExpr,
        depth: u32,
    ) -> Result<i64, Flow> {
        // Short-circuit forms evaluate the right side lazily.
        match op {
            ArithBinary::LogAnd => {
                if self.eval_depth(env, lhs, depth + 1)? == 0 {
                    return Ok(0);
                }
                return Ok((self.eval_depth(env, rhs, depth + 1)? != 0) as i64);
            }
            ArithBinary::LogOr => {
                if self.eval_depth(env, lhs, depth + 1)? != 0 {
                    return Ok(1);
                }
                return Ok((self.eval_depth(env, rhs, depth + 1)? != 0) as i64);
            }
            ArithBinary::Comma => {
                self.eval_depth(env, lhs, depth + 1)?;
                return self.eval_depth(env, rhs, depth + 1);
            }
            _ => {}
        }

        let a = self.eval_depth(env, lhs, depth + 1)?;
        let b = self.eval_depth(env, rhs, depth + 1)?;
        match op {
            ArithBinary::Add => Ok(a.wrapping_add(b)),
            ArithBinary::Sub => Ok(a.wrapping_sub(b)),
            ArithBinary::Mul => Ok(a.wrapping_mul(b)),
            ArithBinary::Div => {
                if b == 0 {
                    Err(Flow::fail(1, "division by 0"))
                } else {
                    Ok(a.wrapping_div(b))
                }
            }
            ArithBinary::Rem => {
                if b == 0 {
                    Err(Flow::fail(1, "division by 0"))
                } else {
                    Ok(a.wrapping_rem(b))
                }
            }
            ArithBinary::Pow => {
                if b < 0 {
                    Err(Flow::fail(1, "exponent less than 0"))
                } else {
                    let mut result: i64 = 1;
                    for _ in 0..b {
                        result = result.wrapping_mul(a);
                    }
                    Ok(result)
                }
            }
            ArithBinary::Shl => Ok(a.wrapping_shl(b as u32 & 63)),
            ArithBinary::Shr => Ok(a.wrapping_shr(b as u32 & 63)),
            ArithBinary::Lt => Ok((a < b) as i64),
            ArithBinary::Le => Ok((a <= b) as i64),
            ArithBinary::Gt => Ok((a > b) as i64),
            ArithBinary::Ge => Ok((a >= b) as i64),
            ArithBinary::Eq => Ok((a == b) as i64),
            ArithBinary::Ne => Ok((a != b) as i64),
            ArithBinary::BitAnd => Ok(a & b),
            ArithBinary::BitXor => Ok(a ^ b),
            ArithBinary::BitOr => Ok(a | b),
            ArithBinary::LogAnd | ArithBinary::LogOr | ArithBinary::Comma => {
                Err(Flow::fail(1, "unexpected operator"))
            }
        }
    }

    fn read_arith_var(
        &self,
        env: &mut Env,
        name: &str,
        index: Option<&ArithExpr>,
        key: Option<&str>,
        depth: u32,
    ) -> Result<String, Flow> {
        if let Some(key) = key {
            if let Some(Value::Assoc(map)) = env.get(name).map(|v| &v.value) {
                return Ok(map.get(key).cloned().unwrap_or_default());
            }
            return Ok(String::new());
        }
        if let Some(index) = index {
            let i = self.eval_depth(env, index, depth + 1)?;
            match env.get(name).map(|v| v.value.clone()) {
                Some(Value::Indexed(map)) => return Ok(map.get(&i).cloned().unwrap_or_default()),
                Some(Value::Assoc(map)) => {
                    return Ok(map.get(&i.to_string()).cloned().unwrap_or_default())
                }
                Some(Value::Str(s)) => {
                    return Ok(if i == 0 { s } else { String::new() });
                }
                None => return Ok(String::new()),
            }
        }
        if env.flags.nounset && !env.is_set(name) {
            return Err(Flow::unbound(name));
        }
        Ok(env.get_str(name).unwrap_or_default())
    }

    fn write_arith_var(
        &self,
        env: &mut Env,
        name: &str,
        index: Option<&ArithExpr>,
        key: Option<&str>,
        value: i64,
        depth: u32,
    ) -> Result<(), Flow> {
        if env.is_readonly(name) {
            return Err(Flow::fail(1, format!("{}: readonly variable", name)));
        }
        if let Some(key) = key {
            env.set_key(name, key, value.to_string());
            return Ok(());
        }
        if let Some(index) = index {
            let i = self.eval_depth(env, index, depth + 1)?;
            env.set_index(name, i, value.to_string());
            return Ok(());
        }
        env.set_str(name, value.to_string());
        Ok(())
    }
}

/// `x op= y` combination for the compound assignment operators.
fn apply_compound(op: ArithAssignOp, current: i64, rhs: i64) -> Result<i64, Flow> {
    Ok(match op {
        ArithAssignOp::Set => rhs,
        ArithAssignOp::Add => current.wrapping_add(rhs),
        ArithAssignOp::Sub => current.wrapping_sub(rhs),
        ArithAssignOp::Mul => current.wrapping_mul(rhs),
        ArithAssignOp::Div => {
            if rhs == 0 {
                return Err(Flow::fail(1, "division by 0"));
            }
            current.wrapping_div(rhs)
        }
        ArithAssignOp::Rem => {
            if rhs == 0 {
                return Err(Flow::fail(1, "division by 0"));
            }
            current.wrapping_rem(rhs)
        }
        ArithAssignOp::Shl => current.wrapping_shl(rhs as u32 & 63),
        ArithAssignOp::Shr => current.wrapping_shr(rhs as u32 & 63),
        ArithAssignOp::And => current & rhs,
        ArithAssignOp::Xor => current ^ rhs,
        ArithAssignOp::Or => current | rhs,
    })
}
