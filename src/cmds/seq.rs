//! seq

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Seq;

#[async_trait]
impl Tool for Seq {
    fn name(&self) -> &'static str {
        "seq"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut separator = "\n".to_string();
        let mut width_pad = false;
        let mut numbers: Vec<&String> = Vec::new();
        let mut i = 0;
        while i < inv.args.len() {
            match inv.args[i].as_str() {
                "-s" => {
                    if let Some(s) = inv.args.get(i + 1) {
                        separator = s.clone();
                        i += 1;
                    }
                }
                "-w" => width_pad = true,
                _ => numbers.push(&inv.args[i]),
            }
            i += 1;
        }

        let parse = |s: &String| -> Option<i64> { s.parse().ok() };
        let (first, step, last) = match numbers.len() {
            1 => (1, 1, parse(numbers[0])),
            2 => (parse(numbers[0]).unwrap_or(1), 1, parse(numbers[1])),
            3 => (
                parse(numbers[0]).unwrap_or(1),
                parse(numbers[1]).unwrap_or(1),
                parse(numbers[2]),
            ),
            _ => {
                return ToolOutput::failure("seq: missing operand\n", 1);
            }
        };
        let Some(last) = last else {
            return ToolOutput::failure("seq: invalid operand\n", 1);
        };
        if step == 0 {
            return ToolOutput::failure("seq: invalid Zero increment value: '0'\n", 1);
        }

        let width = last.to_string().len().max(first.to_string().len());
        let mut values = Vec::new();
        let mut n = first;
        loop {
            if (step > 0 && n > last) || (step < 0 && n < last) {
                break;
            }
            if let Err(breach) = inv.governor.charge_loop() {
                return ToolOutput::failure(format!("seq: {}\n", breach.message()), 125);
            }
            if width_pad {
                values.push(format!("{:0width$}", n, width = width));
            } else {
                values.push(n.to_string());
            }
            n += step;
        }
        let mut out = values.join(&separator);
        if !out.is_empty() {
            out.push('\n');
        }
        ToolOutput::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_seq_single_operand() {
        let inv = invocation(&["3"], "", &[]).await;
        let out = Seq.run(inv).await;
        assert_eq!(out.stdout, "1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_seq_range_with_step() {
        let inv = invocation(&["2", "2", "8"], "", &[]).await;
        let out = Seq.run(inv).await;
        assert_eq!(out.stdout, "2\n4\n6\n8\n");
    }

    #[tokio::test]
    async fn test_seq_descending() {
        let inv = invocation(&["3", "-1", "1"], "", &[]).await;
        let out = Seq.run(inv).await;
        assert_eq!(out.stdout, "3\n2\n1\n");
    }
}
