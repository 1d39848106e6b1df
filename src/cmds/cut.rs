//! cut

use async_trait::async_trait;

use super::{for_each_input, Invocation, Tool, ToolOutput};

pub struct Cut;

/// A `-f`/`-c` list: `1,3-5,7-`.
#[derive(Debug, Clone)]
struct Ranges(Vec<(usize, Option<usize>)>);

impl Ranges {
    fn parse(spec: &str) -> Option<Self> {
        let mut ranges = Vec::new();
        for part in spec.split(',') {
            if let Some((a, b)) = part.split_once('-') {
                let start = if a.is_empty() { 1 } else { a.parse().ok()? };
                let end = if b.is_empty() {
                    None
                } else {
                    Some(b.parse().ok()?)
                };
                ranges.push((start, end));
            } else {
                let n: usize = part.parse().ok()?;
                ranges.push((n, Some(n)));
            }
        }
        Some(Self(ranges))
    }

    fn contains(&self, n: usize) -> bool {
        self.0
            .iter()
            .any(|(start, end)| n >= *start && end.map(|e| n <= e).unwrap_or(true))
    }
}

#[async_trait]
impl Tool for Cut {
    fn name(&self) -> &'static str {
        "cut"
    }

    async fn run(&self, inv: Invocation) -> ToolOutput {
        let mut delim = '\t';
        let mut fields: Option<Ranges> = None;
        let mut chars_spec: Option<Ranges> = None;
        let mut only_delimited = false;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        while i < inv.args.len() {
            let arg = &inv.args[i];
            match arg.as_str() {
                "-d" => {
                    if let Some(d) = inv.args.get(i + 1) {
                        delim = d.chars().next().unwrap_or('\t');
                        i += 1;
                    }
                }
                "-f" => {
                    if let Some(spec) = inv.args.get(i + 1) {
                        fields = Ranges::parse(spec);
                        i += 1;
                    }
                }
                "-c" => {
                    if let Some(spec) = inv.args.get(i + 1) {
                        chars_spec = Ranges::parse(spec);
                        i += 1;
                    }
                }
                "-s" => only_delimited = true,
                _ if arg.starts_with("-d") => delim = arg[2..].chars().next().unwrap_or('\t'),
                _ if arg.starts_with("-f") => fields = Ranges::parse(&arg[2..]),
                _ if arg.starts_with("-c") => chars_spec = Ranges::parse(&arg[2..]),
                _ => files.push(arg.clone()),
            }
            i += 1;
        }

        if fields.is_none() && chars_spec.is_none() {
            return ToolOutput::failure(
                "cut: you must specify a list of bytes, characters, or fields\n",
                1,
            );
        }

        let mut stdout = String::new();
        let (stderr, status) = for_each_input(&inv, &files, "cut", |text, _| {
            for line in text.lines() {
                if let Some(ranges) = &chars_spec {
                    let selected: String = line
                        .chars()
                        .enumerate()
                        .filter(|(i, _)| ranges.contains(i + 1))
                        .map(|(_, c)| c)
                        .collect();
                    stdout.push_str(&selected);
                    stdout.push('\n');
                    continue;
                }
                let Some(ranges) = fields.as_ref() else {
                    continue;
                };
                if !line.contains(delim) {
                    if !only_delimited {
                        stdout.push_str(line);
                        stdout.push('\n');
                    }
                    continue;
                }
                let cols: Vec<&str> = line.split(delim).collect();
                let selected: Vec<&str> = cols
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| ranges.contains(i + 1))
                    .map(|(_, c)| *c)
                    .collect();
                stdout.push_str(&selected.join(&delim.to_string()));
                stdout.push('\n');
            }
        })
        .await;
        ToolOutput::new(stdout, stderr, status)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::invocation;
    use super::*;

    #[tokio::test]
    async fn test_cut_fields() {
        let inv = invocation(&["-d", ":", "-f", "1,3"], "a:b:c\nd:e:f\n", &[]).await;
        let out = Cut.run(inv).await;
        assert_eq!(out.stdout, "a:c\nd:f\n");
    }

    #[tokio::test]
    async fn test_cut_field_range() {
        let inv = invocation(&["-d", ",", "-f", "2-"], "1,2,3,4\n", &[]).await;
        let out = Cut.run(inv).await;
        assert_eq!(out.stdout, "2,3,4\n");
    }

    #[tokio::test]
    async fn test_cut_chars() {
        let inv = invocation(&["-c", "1-3"], "abcdef\n", &[]).await;
        let out = Cut.run(inv).await;
        assert_eq!(out.stdout, "abc\n");
    }
}
