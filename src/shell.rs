//! Shell Facade
//!
//! The embedding surface: construct a [`Shell`] with files, environment,
//! limits, and optional hooks, then `exec` scripts against it. Each
//! `exec` starts from a deep copy of the configured base environment —
//! variable and cwd mutations never leak into the next call — while the
//! virtual filesystem persists for the lifetime of the instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cmds::{RandomFn, Registry, SleepFn, Tool};
use crate::engine::{Env, Output, SyncFs, Walker};
use crate::governor::{Governor, Limits};
use crate::net::{DenyAll, FetchFn, NetPolicy};
use crate::syntax::{self, Parser};
use crate::vfs::{MemFs, Vfs};

/// Construction options.
#[derive(Default)]
pub struct ShellConfig {
    /// Files seeded into the filesystem before the first command runs.
    pub files: HashMap<String, String>,
    /// Extra environment variables (exported).
    pub env: HashMap<String, String>,
    /// Starting working directory; defaults to `/home/user`.
    pub cwd: Option<String>,
    pub limits: Option<Limits>,
    /// URL/method evaluator; denies everything when absent.
    pub net: Option<Arc<dyn NetPolicy>>,
    /// Transport for `curl`; network fails closed when absent.
    pub fetch: Option<FetchFn>,
    /// Additional command plugins (may shadow bundled ones).
    pub tools: Vec<Arc<dyn Tool>>,
    /// Backing filesystem; defaults to a fresh [`MemFs`].
    pub fs: Option<Arc<dyn Vfs>>,
    pub sleep: Option<SleepFn>,
    pub random: Option<RandomFn>,
}

/// Per-call overrides.
#[derive(Default)]
pub struct ExecOverrides {
    pub env: Option<HashMap<String, String>>,
    pub cwd: Option<String>,
    /// Skip the indentation-normalisation pass.
    pub raw_script: bool,
}

/// What `exec` returns. Serialises to the CLI's
/// `{"stdout", "stderr", "exitCode"}` shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    /// Final variable snapshot of the call.
    #[serde(skip)]
    pub env: HashMap<String, String>,
}

pub struct Shell {
    fs: Arc<dyn Vfs>,
    gov: Governor,
    tools: Arc<Registry>,
    net: Arc<dyn NetPolicy>,
    fetch: Option<FetchFn>,
    sleep: Option<SleepFn>,
    random: Option<RandomFn>,
    base_env: Env,
}

impl Shell {
    pub async fn new(config: ShellConfig) -> Self {
        let default_layout = config.cwd.is_none();
        let cwd = config.cwd.unwrap_or_else(|| "/home/user".to_string());
        let fs: Arc<dyn Vfs> = config.fs.unwrap_or_else(|| Arc::new(MemFs::new()));

        seed_filesystem(&*fs, default_layout, &cwd).await;
        for (path, content) in &config.files {
            let absolute = fs.resolve(&cwd, path);
            let _ = fs.write(&absolute, content.as_bytes()).await;
        }

        let mut registry = Registry::with_defaults();
        for tool in config.tools {
            registry.register(tool);
        }

        let mut env = Env::default();
        env.cwd = cwd.clone();
        env.prev_dir = cwd.clone();
        let home = if default_layout { "/home/user" } else { "/" };
        for (name, value) in [
            ("HOME", home),
            ("PATH", "/usr/bin:/bin"),
            ("IFS", " \t\n"),
            ("PS1", "$ "),
            ("PS2", "> "),
            ("PS4", "+ "),
            ("HOSTNAME", "sandbox"),
            ("OSTYPE", "linux-gnu"),
            ("OPTIND", "1"),
        ] {
            env.set_str(name, value);
        }
        for name in ["HOME", "PATH", "PWD", "OLDPWD"] {
            env.set_attr(name, |a| a.exported = true);
        }
        for (name, value) in config.env {
            env.set_str(&name, value);
            env.set_attr(&name, |a| a.exported = true);
        }

        let random = config
            .random
            .or_else(|| Some(Arc::new(rand::random::<f64>) as RandomFn));

        Self {
            fs,
            gov: Governor::new(config.limits.unwrap_or_default()),
            tools: Arc::new(registry),
            net: config.net.unwrap_or_else(|| Arc::new(DenyAll)),
            fetch: config.fetch,
            sleep: config.sleep,
            random,
            base_env: env,
        }
    }

    /// Execute one script. Must run on a multi-threaded tokio runtime
    /// (the interpreter core bridges to the async filesystem with
    /// `block_in_place`).
    pub async fn exec(&mut self, script: &str, overrides: Option<ExecOverrides>) -> ExecOutcome {
        let overrides = overrides.unwrap_or_default();
        self.gov.reset();

        if script.trim().is_empty() {
            return ExecOutcome {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
                env: self.base_env.as_string_map(),
            };
        }

        let text = if overrides.raw_script {
            script.to_string()
        } else {
            syntax::normalize_script(script)
        };
        let ast = match Parser::new(&text).parse_script_to_end() {
            Ok(ast) => ast,
            Err(e) => {
                return ExecOutcome {
                    stdout: String::new(),
                    stderr: format!("bash: syntax error: {}\n", e),
                    exit_code: 2,
                    env: self.base_env.as_string_map(),
                };
            }
        };

        // Fresh copy of the configured base state: exec-to-exec
        // isolation is part of the contract.
        let mut env = self.base_env.clone();
        if let Some(extra) = overrides.env {
            for (name, value) in extra {
                env.set_str(&name, value);
                env.set_attr(&name, |a| a.exported = true);
            }
        }
        if let Some(cwd) = overrides.cwd {
            env.cwd = self.fs.resolve(&env.cwd, &cwd);
        }

        let walker = Walker {
            gov: self.gov.clone(),
            fs: SyncFs::new(self.fs.clone(), tokio::runtime::Handle::current()),
            tools: self.tools.clone(),
            net: self.net.clone(),
            fetch: self.fetch.clone(),
            sleep: self.sleep.clone(),
            random: self.random.clone(),
        };

        let mut result = tokio::task::block_in_place(|| {
            match walker.run_script(&mut env, &ast, "") {
                Ok(out) => out,
                Err(flow) => flow.into_output(),
            }
        });

        self.run_exit_trap(&walker, &mut env, &mut result);

        ExecOutcome {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.status,
            env: env.as_string_map(),
        }
    }

    /// Fire a recorded `trap … EXIT` at the end of the run.
    fn run_exit_trap(&self, walker: &Walker, env: &mut Env, result: &mut Output) {
        let Some(action) = env.traps.get("EXIT").cloned() else {
            return;
        };
        env.traps.remove("EXIT");
        let Ok(ast) = syntax::parse(&action) else {
            return;
        };
        let trap_out = tokio::task::block_in_place(|| {
            match walker.run_script(env, &ast, "") {
                Ok(out) => out,
                Err(flow) => flow.into_output(),
            }
        });
        result.stdout.push_str(&trap_out.stdout);
        result.stderr.push_str(&trap_out.stderr);
    }

    pub async fn read_file(&self, path: &str) -> Result<String, crate::vfs::VfsError> {
        let absolute = self.fs.resolve(&self.base_env.cwd, path);
        self.fs.read_to_string(&absolute).await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), crate::vfs::VfsError> {
        let absolute = self.fs.resolve(&self.base_env.cwd, path);
        self.fs.write(&absolute, content.as_bytes()).await
    }

    pub async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), crate::vfs::VfsError> {
        let absolute = self.fs.resolve(&self.base_env.cwd, path);
        self.fs.mkdir(&absolute, recursive).await
    }

    pub fn fs(&self) -> Arc<dyn Vfs> {
        self.fs.clone()
    }

    pub fn cwd(&self) -> &str {
        &self.base_env.cwd
    }

    /// The reserved exit code produced when a governor limit fires.
    pub fn limit_exit_code() -> i32 {
        crate::governor::LIMIT_EXIT_CODE
    }
}

/// Standard directory layout plus the device files scripts expect.
async fn seed_filesystem(fs: &dyn Vfs, default_layout: bool, cwd: &str) {
    let _ = fs.mkdir("/bin", true).await;
    let _ = fs.mkdir("/usr/bin", true).await;
    let _ = fs.mkdir("/tmp", true).await;
    let _ = fs.mkdir("/dev", true).await;
    let _ = fs.write("/dev/null", b"").await;
    if default_layout {
        let _ = fs.mkdir("/home/user", true).await;
    }
    let _ = fs.mkdir(cwd, true).await;
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn shell() -> Shell {
        Shell::new(ShellConfig::default()).await
    }

    async fn run(sh: &mut Shell, script: &str) -> ExecOutcome {
        sh.exec(script, None).await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_echo_pipeline_wc() {
        let mut sh = shell().await;
        let out = run(&mut sh, "echo hello | wc -w").await;
        assert_eq!(out.stdout.trim(), "1");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_for_loop() {
        let mut sh = shell().await;
        let out = run(&mut sh, "for i in 1 2 3; do echo $i; done").await;
        assert_eq!(out.stdout, "1\n2\n3\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_and_or_chain() {
        let mut sh = shell().await;
        let out = run(&mut sh, "false && echo x || echo y").await;
        assert_eq!(out.stdout, "y\n");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pipefail() {
        let mut sh = shell().await;
        let out = run(&mut sh, "set -o pipefail; false | true; echo $?").await;
        assert_eq!(out.stdout, "1\n");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_scoping() {
        let mut sh = shell().await;
        let out = run(&mut sh, "f(){ local x=1; echo $x; }; x=2; f; echo $x").await;
        assert_eq!(out.stdout, "1\n2\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_arrays() {
        let mut sh = shell().await;
        let out = run(&mut sh, "a=(1 2 3); echo ${a[@]}; echo ${#a[@]}").await;
        assert_eq!(out.stdout, "1 2 3\n3\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_default_value_expansion() {
        let mut sh = shell().await;
        let out = run(&mut sh, "echo \"${v:-default}\"; echo ${v}").await;
        assert_eq!(out.stdout, "default\n\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_regex_rematch() {
        let mut sh = shell().await;
        let out = run(
            &mut sh,
            "if [[ \"abc\" =~ ^a(b)c$ ]]; then echo ${BASH_REMATCH[1]}; fi",
        )
        .await;
        assert_eq!(out.stdout, "b\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_grep_missing_file_exit_two() {
        let mut sh = shell().await;
        let out = run(&mut sh, "grep foo /missing.txt").await;
        assert_eq!(out.exit_code, 2);
        assert_eq!(out.stderr, "grep: /missing.txt: No such file or directory\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_loop_limit_reserved_code() {
        let mut sh = Shell::new(ShellConfig {
            limits: Some(Limits {
                max_loop_iterations: 5,
                ..Default::default()
            }),
            ..Default::default()
        })
        .await;
        let out = run(&mut sh, "while :; do :; done").await;
        assert_eq!(out.exit_code, Shell::limit_exit_code());
        assert!(out.stderr.contains("loop iterations"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_isolation() {
        let mut sh = shell().await;
        run(&mut sh, "VAR=1").await;
        let out = run(&mut sh, "echo \"[$VAR]\"").await;
        assert_eq!(out.stdout, "[]\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initial_env_persists_every_exec() {
        let mut sh = Shell::new(ShellConfig {
            env: [("GREETING".to_string(), "hi".to_string())].into(),
            ..Default::default()
        })
        .await;
        for _ in 0..2 {
            let out = sh.exec("echo $GREETING", None).await;
            assert_eq!(out.stdout, "hi\n");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_vfs_persists_across_execs() {
        let mut sh = shell().await;
        run(&mut sh, "echo data > keep.txt").await;
        let out = run(&mut sh, "cat keep.txt").await;
        assert_eq!(out.stdout, "data\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_subshell_purity() {
        let mut sh = shell().await;
        let out = run(&mut sh, "( VAR=1 ); echo \"[$VAR]\"").await;
        assert_eq!(out.stdout, "[]\n");
        let out = run(&mut sh, "( cd /tmp ); pwd").await;
        assert_eq!(out.stdout, "/home/user\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pipestatus_length() {
        let mut sh = shell().await;
        let out = run(&mut sh, "true | false | true; echo ${PIPESTATUS[@]}").await;
        assert_eq!(out.stdout, "0 1 0\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exit_code_propagation() {
        let mut sh = shell().await;
        let out = run(&mut sh, "exit 42").await;
        assert_eq!(out.exit_code, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_syntax_error_exit_two() {
        let mut sh = shell().await;
        let out = run(&mut sh, "if then").await;
        assert_eq!(out.exit_code, 2);
        assert!(out.stderr.contains("syntax error"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_special_builtins_resist_shadowing() {
        let mut sh = shell().await;
        // `exit` is a special builtin: the function definition is inert.
        let out = run(&mut sh, "exit(){ echo nope; }; exit 7").await;
        assert_eq!(out.stdout, "");
        assert_eq!(out.exit_code, 7);
        // Ordinary builtins still yield to functions.
        let out = run(&mut sh, "pwd(){ echo fn; }; pwd").await;
        assert_eq!(out.stdout, "fn\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_not_found_127() {
        let mut sh = shell().await;
        let out = run(&mut sh, "no_such_command_anywhere").await;
        assert_eq!(out.exit_code, 127);
        assert!(out.stderr.contains("command not found"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_seeded_files() {
        let mut sh = Shell::new(ShellConfig {
            files: [("/data/in.txt".to_string(), "seeded\n".to_string())].into(),
            ..Default::default()
        })
        .await;
        let out = run(&mut sh, "cat /data/in.txt").await;
        assert_eq!(out.stdout, "seeded\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_custom_tool_registration() {
        use crate::cmds::{Invocation, ToolOutput};
        use async_trait::async_trait;

        struct Shout;
        #[async_trait]
        impl Tool for Shout {
            fn name(&self) -> &'static str {
                "shout"
            }
            async fn run(&self, inv: Invocation) -> ToolOutput {
                ToolOutput::success(format!("{}!\n", inv.args.join(" ").to_uppercase()))
            }
        }

        let mut sh = Shell::new(ShellConfig {
            tools: vec![Arc::new(Shout)],
            ..Default::default()
        })
        .await;
        let out = run(&mut sh, "shout hello world").await;
        assert_eq!(out.stdout, "HELLO WORLD!\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exit_trap_runs() {
        let mut sh = shell().await;
        let out = run(&mut sh, "trap 'echo bye' EXIT; echo hi").await;
        assert_eq!(out.stdout, "hi\nbye\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_overrides() {
        let mut sh = shell().await;
        let out = sh
            .exec(
                "echo $EXTRA; pwd",
                Some(ExecOverrides {
                    env: Some([("EXTRA".to_string(), "v".to_string())].into()),
                    cwd: Some("/tmp".to_string()),
                    raw_script: false,
                }),
            )
            .await;
        assert_eq!(out.stdout, "v\n/tmp\n");
        // Overrides do not stick.
        let out = run(&mut sh, "pwd").await;
        assert_eq!(out.stdout, "/home/user\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_here_document() {
        let mut sh = shell().await;
        let out = run(&mut sh, "name=world\ncat <<EOF\nhello $name\nEOF").await;
        assert_eq!(out.stdout, "hello world\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_case_statement() {
        let mut sh = shell().await;
        let out = run(
            &mut sh,
            "x=banana; case $x in a*) echo a;; b*na*) echo yes;; *) echo no;; esac",
        )
        .await;
        assert_eq!(out.stdout, "yes\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_arithmetic() {
        let mut sh = shell().await;
        let out = run(&mut sh, "echo $((2 ** 10)); echo $((17 % 5)); x=5; echo $((x*2))").await;
        assert_eq!(out.stdout, "1024\n2\n10\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_substitution() {
        let mut sh = shell().await;
        let out = run(&mut sh, "echo \"got $(echo inner)\"").await;
        assert_eq!(out.stdout, "got inner\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_glob_expansion() {
        let mut sh = shell().await;
        run(&mut sh, "touch a.rs b.rs c.txt").await;
        let out = run(&mut sh, "echo *.rs").await;
        assert_eq!(out.stdout, "a.rs b.rs\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_errexit_stops_script() {
        let mut sh = shell().await;
        let out = run(&mut sh, "set -e\necho one\nfalse\necho two").await;
        assert_eq!(out.stdout, "one\n");
        assert_eq!(out.exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_while_read_loop() {
        let mut sh = shell().await;
        let out = run(
            &mut sh,
            "printf 'a\\nb\\nc\\n' | while read line; do echo \"<$line>\"; done",
        )
        .await;
        assert_eq!(out.stdout, "<a>\n<b>\n<c>\n");
    }
}
