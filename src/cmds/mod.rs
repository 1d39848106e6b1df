//! Command Plugins
//!
//! The user-land utilities are plugins behind one small contract: argv
//! and stdin go in, `{stdout, stderr, status}` comes out. Plugins touch
//! files only through the [`crate::vfs::Vfs`] handed to them, honour the
//! governor's budgets, and reach the network only through the fetch hook
//! after the policy evaluator approves.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::governor::Governor;
use crate::net::{FetchFn, NetPolicy};
use crate::vfs::Vfs;

mod base64cmd;
mod basename;
mod cat;
mod chmod;
mod cp;
mod curl;
mod cut;
mod date;
mod dirname;
mod envcmd;
mod find;
mod grep;
mod head;
mod ln;
mod ls;
mod mkdir;
mod mv;
mod rm;
mod seq;
mod sleepcmd;
mod sort;
mod stat;
mod tail;
mod tee;
mod touch;
mod tr;
mod uniq;
mod wc;
mod xargs;

/// What a plugin returns.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: 0,
        }
    }

    pub fn failure(stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }
}

/// Suspension hook for `sleep`: milliseconds to wait.
pub type SleepFn = Arc<dyn Fn(u64) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Randomness hook (`$RANDOM`, `sort -R` style needs): yields in [0, 1).
pub type RandomFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Script re-entry hook for `xargs`/`find -exec`:
/// (command line, stdin, cwd, env) → result.
pub type ExecFn = Arc<
    dyn Fn(
            String,
            String,
            String,
            HashMap<String, String>,
        ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>>
        + Send
        + Sync,
>;

/// Everything a plugin gets for one run.
pub struct Invocation {
    pub args: Vec<String>,
    pub stdin: String,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub fs: Arc<dyn Vfs>,
    pub governor: Governor,
    pub net: Arc<dyn NetPolicy>,
    pub fetch: Option<FetchFn>,
    pub sleep: Option<SleepFn>,
    pub random: Option<RandomFn>,
    pub exec: Option<ExecFn>,
}

impl Invocation {
    /// Resolve a command-line path argument against the invocation cwd.
    pub fn path(&self, arg: &str) -> String {
        self.fs.resolve(&self.cwd, arg)
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, inv: Invocation) -> ToolOutput;
}

/// Name → plugin table consulted by the dispatcher before `$PATH`.
pub struct Registry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// The bundled utility set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let defaults: Vec<Arc<dyn Tool>> = vec![
            Arc::new(base64cmd::Base64),
            Arc::new(basename::Basename),
            Arc::new(cat::Cat),
            Arc::new(chmod::Chmod),
            Arc::new(cp::Cp),
            Arc::new(curl::Curl),
            Arc::new(cut::Cut),
            Arc::new(date::Date),
            Arc::new(dirname::Dirname),
            Arc::new(envcmd::EnvCmd),
            Arc::new(find::Find),
            Arc::new(grep::Grep),
            Arc::new(head::Head),
            Arc::new(ln::Ln),
            Arc::new(ln::Readlink),
            Arc::new(ls::Ls),
            Arc::new(mkdir::Mkdir),
            Arc::new(mv::Mv),
            Arc::new(rm::Rm),
            Arc::new(rm::Rmdir),
            Arc::new(seq::Seq),
            Arc::new(sleepcmd::Sleep),
            Arc::new(sort::Sort),
            Arc::new(stat::Stat),
            Arc::new(tail::Tail),
            Arc::new(tee::Tee),
            Arc::new(touch::Touch),
            Arc::new(tr::Tr),
            Arc::new(uniq::Uniq),
            Arc::new(wc::Wc),
            Arc::new(xargs::Xargs),
        ];
        for tool in defaults {
            registry.register(tool);
        }
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

/// Read each operand (or stdin for `-`/no operands) and hand the text to
/// `each`. The shared skeleton of the line-oriented text tools.
pub(crate) async fn for_each_input(
    inv: &Invocation,
    files: &[String],
    tool: &str,
    mut each: impl FnMut(&str, Option<&str>),
) -> (String, i32) {
    let mut stderr = String::new();
    let mut status = 0;
    if files.is_empty() {
        each(&inv.stdin, None);
        return (stderr, status);
    }
    for file in files {
        if file == "-" {
            each(&inv.stdin, None);
            continue;
        }
        let path = inv.path(file);
        match inv.fs.read_to_string(&path).await {
            Ok(text) => each(&text, Some(file)),
            Err(_) => {
                stderr.push_str(&format!("{}: {}: No such file or directory\n", tool, file));
                status = if tool == "grep" { 2 } else { 1 };
            }
        }
    }
    (stderr, status)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::net::DenyAll;
    use crate::vfs::MemFs;

    /// Invocation over a fresh in-memory filesystem seeded with files.
    pub async fn invocation(args: &[&str], stdin: &str, files: &[(&str, &str)]) -> Invocation {
        let fs = MemFs::new();
        for (path, content) in files {
            fs.write(path, content.as_bytes()).await.unwrap();
        }
        Invocation {
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(fs),
            governor: Governor::new(Default::default()),
            net: Arc::new(DenyAll),
            fetch: None,
            sleep: None,
            random: None,
            exec: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults_present() {
        let registry = Registry::with_defaults();
        for name in ["cat", "grep", "wc", "ls", "xargs", "curl"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!registry.contains("awk"));
    }

    #[test]
    fn test_registry_custom_overrides() {
        struct Fake;
        #[async_trait]
        impl Tool for Fake {
            fn name(&self) -> &'static str {
                "cat"
            }
            async fn run(&self, _inv: Invocation) -> ToolOutput {
                ToolOutput::success("fake")
            }
        }
        let mut registry = Registry::with_defaults();
        registry.register(Arc::new(Fake));
        assert!(registry.contains("cat"));
        assert_eq!(registry.tools.get("cat").unwrap().name(), "cat");
    }
}
