//! base64

use async_trait::async_trait;
use base64::Engine;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Base64;

#[async_trait]
impl Tool for Base64 {
    fn name(&self) -> &'static str {
        "base64"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut decode = false;
        let mut wrap = 76usize;
        let mut files: Vec<String> = Vec::new();
        let mut i = 0;
        while i < inv.args.len() {
            match inv.args[i].as_str() {
                "-d" | "--decode" => decode = true,
                "-w" => {
                    if let Some(value) = inv.args.get(i + 1) {
                        wrap = value.parse().unwrap_or(76);
                        i += 1;
                    }
                }
                arg => files.push(arg.to_string()),
            }
            i += 1;
        }

        let engine = base64::engine::general_purpose::STANDARD;
        let mut stdout = String::new();
        let mut decode_err = false;
        let (stderr, status) = for_each_input(&inv, &files, "base64", |text, _| {
            if decode {
                let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                match engine.decode(cleaned) {
                    Ok(bytes) => stdout.push_str(&String::from_utf8_lossy(&bytes)),
                    Err(_) => decode_err = true,
                }
            } else {
                let encoded = engine.encode(text.as_bytes());
                if wrap == 0 {
                    stdout.push_str(&encoded);
                    stdout.push('\n');
                } else {
                    for chunk in encoded.as_bytes().chunks(wrap) {
                        stdout.push_str(&String::from_utf8_lossy(chunk));
                        stdout.push('\n');
                    }
                }
            }
        })
        .await;
        if decode_err {
            return ToolOutput::failure("base64: invalid input\n", 1);
        }
        ToolOutput::new(stdout, stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_base64_roundtrip() {
        let inv = invocation(&[], "hello", &[]).await;
        let out = Base64.run(inv).await;
        assert_eq!(out.stdout, "aGVsbG8=\n");

        let inv = invocation(&["-d"], "aGVsbG8=\n", &[]).await;
        let out = Base64.run(inv).await;
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn test_base64_invalid_decode() {
        let inv = invocation(&["-d"], "!!!", &[]).await;
        let out = Base64.run(inv).await;
        assert_eq!(out.status, 1);
    }
}
