//! date

use async_trait::async_trait;
use chrono::{Local, Utc};

use super::{Invocation, Tool, ToolOutput};

pub struct Date;

#[async_trait]
impl Tool for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut utc = false;
        let mut format: Option<String> = None;
        for arg in &inv.args {
            match arg.as_str() {
                "-u" | "--utc" => utc = true,
                _ if arg.starts_with('+') => format = Some(arg[1..].to_string()),
                _ => {}
            }
        }
        let spec = format.unwrap_or_else(|| "%a %b %e %H:%M:%S %Z %Y".to_string());
        let rendered = if utc {
            Utc::now().format(&spec).to_string()
        } else {
            Local::now().format(&spec).to_string()
        };
        ToolOutput::success(format!("{}\n", rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_date_custom_format() {
        let inv = invocation(&["+%Y"], "", &[]).await;
        let out = Date.run(inv).await;
        let year: i32 = out.stdout.trim().parse().unwrap();
        assert!(year >= 2024);
    }
}
