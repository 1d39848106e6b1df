//! curl
//!
//! The engine's only network-facing plugin. Every request is submitted
//! to the policy evaluator first and then carried by the embedder's
//! fetch hook; with either one absent the command fails closed with the
//! classic "couldn't connect" exit code.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{Invocation, Tool, ToolOutput};

pub struct Curl;

#[async_trait]
impl Tool for Curl {
    fn name(&self) -> &'static str {
        "curl"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut method: Option<String> = None;
        let mut headers: HashMap<String, String> = HashMap::new();
        let mut body: Option<String> = None;
        let mut silent = false;
        let mut include_headers = false;
        let mut fail_on_error = false;
        let mut output: Option<String> = None;
        let mut url: Option<String> = None;

        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            match arg.as_str() {
                "-X" | "--request" => {
                    method = inv.args.get(i + 1).cloned();
                    i += 1;
                }
                "-H" | "--header" => {
                    if let Some(header) = inv.args.get(i + 1) {
                        if let Some((name, value)) = header.split_once(':') {
                            headers.insert(name.trim().to_string(), value.trim().to_string());
                        }
                        i += 1;
                    }
                }
                "-d" | "--data" | "--data-raw" => {
                    body = inv.args.get(i + 1).cloned();
                    i += 1;
                }
                "-o" | "--output" => {
                    output = inv.args.get(i + 1).cloned();
                    i += 1;
                }
                "-s" | "--silent" => silent = true,
                "-i" | "--include" => include_headers = true,
                "-f" | "--fail" => fail_on_error = true,
                "-L" | "--location" => {}
                _ if !arg.starts_with('-') => url = Some(arg.clone()),
                _ => {}
            }
            i += 1;
        }

        let Some(url) = url else {
            return ToolOutput::failure("curl: no URL specified\n", 2);
        };
        let method = method.unwrap_or_else(|| {
            if body.is_some() {
                "POST".to_string()
            } else {
                "GET".to_string()
            }
        });

        if !inv.net.allows(&url, &method) {
            return ToolOutput::failure(
                format!("curl: (7) access to {} is not allowed\n", url),
                7,
            );
        }
        let Some(fetch) = &inv.fetch else {
            return ToolOutput::failure(
                "curl: (7) network access is not configured\n",
                7,
            );
        };

        match fetch(url.clone(), method, headers, body).await {
            Ok(response) => {
                if fail_on_error && response.status >= 400 {
                    return ToolOutput::failure(
                        format!("curl: (22) The requested URL returned error: {}\n", response.status),
                        22,
                    );
                }
                let mut text = String::new();
                if include_headers {
                    text.push_str(&format!("HTTP/1.1 {}\r\n", response.status));
                    let mut names: Vec<&String> = response.headers.keys().collect();
                    names.sort();
                    for name in names {
                        text.push_str(&format!("{}: {}\r\n", name, response.headers[name]));
                    }
                    text.push_str("\r\n");
                }
                text.push_str(&response.body);
                if let Some(path) = output {
                    let target = inv.path(&path);
                    if let Err(e) = inv.fs.write(&target, text.as_bytes()).await {
                        return ToolOutput::failure(format!("curl: {}\n", e), 23);
                    }
                    return ToolOutput::success("");
                }
                ToolOutput::success(text)
            }
            Err(message) => {
                let stderr = if silent {
                    String::new()
                } else {
                    format!("curl: (7) {}\n", message)
                };
                ToolOutput::failure(stderr, 7)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;
    use crate::net::{FetchResponse, UrlAllowList};
    use std::sync::Arc;

    fn fake_fetch() -> crate::net::FetchFn {
        Arc::new(|url, _method, _headers, _body| {
            Box::pin(async move {
                Ok(FetchResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: format!("fetched {}", url),
                    url,
                })
            })
        })
    }

    #[tokio::test]
    async fn test_curl_denied_by_policy() {
        let mut inv = invocation(&["https://example.com/x"], "", &[]).await;
        inv.fetch = Some(fake_fetch());
        let out = Curl.run(inv).await;
        assert_eq!(out.status, 7);
        assert!(out.stderr.contains("not allowed"));
    }

    #[tokio::test]
    async fn test_curl_allowed_fetches() {
        let mut inv = invocation(&["https://api.test/data"], "", &[]).await;
        inv.net = Arc::new(UrlAllowList::new(vec!["https://api.test".to_string()]));
        inv.fetch = Some(fake_fetch());
        let out = Curl.run(inv).await;
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout, "fetched https://api.test/data");
    }

    #[tokio::test]
    async fn test_curl_no_transport_fails_closed() {
        let mut inv = invocation(&["https://api.test/data"], "", &[]).await;
        inv.net = Arc::new(UrlAllowList::new(vec!["https://api.test".to_string()]));
        let out = Curl.run(inv).await;
        assert_eq!(out.status, 7);
    }

    #[tokio::test]
    async fn test_curl_method_gate() {
        let mut inv = invocation(&["-X", "DELETE", "https://api.test/data"], "", &[]).await;
        inv.net = Arc::new(UrlAllowList::new(vec!["https://api.test".to_string()]));
        inv.fetch = Some(fake_fetch());
        let out = Curl.run(inv).await;
        assert_eq!(out.status, 7);
    }
}
