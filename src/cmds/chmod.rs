//! chmod

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Chmod;

#[async_trait]
impl Tool for Chmod {
    fn name(&self) -> &'static str {
        "chmod"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let operands: Vec<&String> = inv.args.iter().filter(|a| *a != "-R").collect();
        let (Some(mode_arg), rest) = (operands.first(), &operands[1.min(operands.len())..]) else {
            return ToolOutput::failure("chmod: missing operand\n", 1);
        };
        if rest.is_empty() {
            return ToolOutput::failure("chmod: missing operand\n", 1);
        }

        let mut stderr = String::new();
        let mut status = 0;
        for file in rest {
            let path = inv.path(file);
            let current = match inv.fs.metadata(&path).await {
                Ok(meta) => meta.mode,
                Err(e) => {
                    stderr.push_str(&format!("chmod: cannot access '{}': {}\n", file, e));
                    status = 1;
                    continue;
                }
            };
            let Some(mode) = apply_mode(mode_arg, current) else {
                return ToolOutput::failure(format!("chmod: invalid mode: '{}'\n", mode_arg), 1);
            };
            if let Err(e) = inv.fs.set_mode(&path, mode).await {
                stderr.push_str(&format!("chmod: changing permissions of '{}': {}\n", file, e));
                status = 1;
            }
        }
        ToolOutput::new("", stderr, status)
    }
}

/// Octal modes plus the common symbolic forms (`u+x`, `a-w`, `+x`).
fn apply_mode(spec: &str, current: u32) -> Option<u32> {
    if let Ok(octal) = u32::from_str_radix(spec, 8) {
        return Some(octal);
    }
    let mut mode = current;
    for clause in spec.split(',') {
        let op_pos = clause.find(['+', '-', '='])?;
        let (who, rest) = clause.split_at(op_pos);
        let op = rest.chars().next()?;
        let perms = &rest[1..];
        let who_mask: u32 = if who.is_empty() || who.contains('a') {
            0o777
        } else {
            let mut m = 0;
            if who.contains('u') {
                m |= 0o700;
            }
            if who.contains('g') {
                m |= 0o070;
            }
            if who.contains('o') {
                m |= 0o007;
            }
            m
        };
        let mut bits = 0;
        for p in perms.chars() {
            bits |= match p {
                'r' => 0o444,
                'w' => 0o222,
                'x' => 0o111,
                _ => return None,
            };
        }
        let bits = bits & who_mask;
        match op {
            '+' => mode |= bits,
            '-' => mode &= !bits,
            '=' => mode = (mode & !who_mask) | bits,
            _ => return None,
        }
    }
    Some(mode)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;
    use crate::vfs::Vfs;

    #[tokio::test]
    async fn test_chmod_octal() {
        let inv = invocation(&["755", "/f"], "", &[("/f", "x")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Chmod.run(inv).await.status, 0);
        assert_eq!(fs.metadata("/f").await.unwrap().mode, 0o755);
    }

    #[tokio::test]
    async fn test_chmod_symbolic_add() {
        let inv = invocation(&["u+x", "/f"], "", &[("/f", "x")]).await;
        let fs = inv.fs.clone();
        assert_eq!(Chmod.run(inv).await.status, 0);
        assert_eq!(fs.metadata("/f").await.unwrap().mode & 0o100, 0o100);
    }

    #[test]
    fn test_apply_mode_forms() {
        assert_eq!(apply_mode("644", 0), Some(0o644));
        assert_eq!(apply_mode("+x", 0o644), Some(0o755));
        assert_eq!(apply_mode("a-w", 0o666), Some(0o444));
        assert_eq!(apply_mode("nonsense", 0o644), None);
    }
}
