//! Control Flow
//!
//! `break`, `continue`, `return`, `exit`, errexit aborts, unbound
//! variables under `set -u`, and governor breaches all unwind the walker
//! as an error value. Each carries the output accumulated so far, so the
//! frame that finally handles it can splice the text back into its own
//! stream.

use crate::governor::{LimitBreach, LIMIT_EXIT_CODE};

/// The normal result of running anything: captured streams and a status.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl Output {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(stderr: impl Into<String>, status: i32) -> Self {
        Self::new("", stderr, status)
    }

    pub fn ok(&self) -> bool {
        self.status == 0
    }

    /// Append another result's streams, keeping its status.
    pub fn absorb(&mut self, other: Output) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
        self.status = other.status;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowKind {
    /// `break [n]`
    Break(u32),
    /// `continue [n]`
    Continue(u32),
    /// `return [n]` — caught by function call or `source`.
    Return(i32),
    /// `exit [n]` — caught at the script root.
    Exit(i32),
    /// `set -e` abort.
    Errexit(i32),
    /// Unbound variable under `set -u`; aborts the script.
    Unbound(String),
    /// Expansion failure (bad substitution, arithmetic error, failed
    /// glob under `failglob`): fails the current command only.
    Fail(i32),
    /// Governor counter saturated; aborts everything.
    Limit(LimitBreach),
}

/// A control-flow unwind in progress.
#[derive(Debug, Clone)]
pub struct Flow {
    pub kind: FlowKind,
    pub stdout: String,
    pub stderr: String,
}

impl Flow {
    pub fn new(kind: FlowKind) -> Self {
        Self {
            kind,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn exit(status: i32) -> Self {
        Self::new(FlowKind::Exit(status))
    }

    pub fn errexit(status: i32) -> Self {
        Self::new(FlowKind::Errexit(status))
    }

    pub fn unbound(name: &str) -> Self {
        let mut flow = Self::new(FlowKind::Unbound(name.to_string()));
        flow.stderr = format!("bash: {}: unbound variable\n", name);
        flow
    }

    pub fn fail(status: i32, message: impl Into<String>) -> Self {
        let mut flow = Self::new(FlowKind::Fail(status));
        flow.stderr = format!("bash: {}\n", message.into());
        flow
    }

    pub fn limit(breach: LimitBreach) -> Self {
        let mut flow = Self::new(FlowKind::Limit(breach.clone()));
        flow.stderr = format!("bash: {}\n", breach.message());
        flow
    }

    /// Splice output that was produced before this unwind started.
    pub fn preface(mut self, stdout: &str, stderr: &str) -> Self {
        self.stdout = format!("{}{}", stdout, self.stdout);
        self.stderr = format!("{}{}", stderr, self.stderr);
        self
    }

    /// The exit status this unwind represents if it reaches the root.
    pub fn status(&self) -> i32 {
        match &self.kind {
            FlowKind::Break(_) | FlowKind::Continue(_) => 0,
            FlowKind::Return(code) | FlowKind::Exit(code) | FlowKind::Errexit(code) => *code,
            FlowKind::Unbound(_) => 1,
            FlowKind::Fail(status) => *status,
            FlowKind::Limit(_) => LIMIT_EXIT_CODE,
        }
    }

    /// Collapse into a plain result at a boundary that absorbs the
    /// unwind (script root, subshell edge).
    pub fn into_output(self) -> Output {
        let status = self.status();
        Output {
            stdout: self.stdout,
            stderr: self.stderr,
            status,
        }
    }
}

/// Walker methods return this: a result, or an unwind in progress.
pub type Exec = Result<Output, Flow>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preface_prepends() {
        let flow = Flow::exit(3).preface("early-out ", "early-err ");
        assert_eq!(flow.stdout, "early-out ");
        assert_eq!(flow.stderr, "early-err ");
        assert_eq!(flow.status(), 3);
    }

    #[test]
    fn test_limit_flow_status() {
        let breach = LimitBreach {
            limit: "command count",
            max: 10,
        };
        let flow = Flow::limit(breach);
        assert_eq!(flow.status(), LIMIT_EXIT_CODE);
        assert!(flow.stderr.contains("command count"));
    }

    #[test]
    fn test_into_output_carries_streams() {
        let mut flow = Flow::new(FlowKind::Return(7));
        flow.stdout = "kept".to_string();
        let out = flow.into_output();
        assert_eq!(out.stdout, "kept");
        assert_eq!(out.status, 7);
    }
}
