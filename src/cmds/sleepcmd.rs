//! sleep

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Sleep;

#[async_trait]
impl Tool for Sleep {
    fn name(&self) -> &'static str {
        "sleep"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let Some(spec) = inv.args.first() else {
            return ToolOutput::failure("sleep: missing operand\n", 1);
        };
        let multiplier = match spec.chars().last() {
            Some('s') | Some('0'..='9') | Some('.') => 1.0,
            Some('m') => 60.0,
            Some('h') => 3600.0,
            Some('d') => 86400.0,
            _ => {
                return ToolOutput::failure(
                    format!("sleep: invalid time interval '{}'\n", spec),
                    1,
                )
            }
        };
        let digits = spec.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        let Ok(seconds) = digits.parse::<f64>() else {
            return ToolOutput::failure(format!("sleep: invalid time interval '{}'\n", spec), 1);
        };
        let millis = (seconds * multiplier * 1000.0) as u64;
        if let Some(sleep) = &inv.sleep {
            sleep(millis).await;
        }
        ToolOutput::success("")
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_sleep_without_hook_is_instant() {
        let inv = invocation(&["5"], "", &[]).await;
        let out = Sleep.run(inv).await;
        assert_eq!(out.status, 0);
    }

    #[tokio::test]
    async fn test_sleep_invalid() {
        let inv = invocation(&["soon"], "", &[]).await;
        let out = Sleep.run(inv).await;
        assert_eq!(out.status, 1);
    }
}
