use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use clap::Parser;

use shellbox::vfs::{HostFs, MountFs, OverlayFs, Vfs};
use shellbox::{Shell, ShellConfig, UrlAllowList};

#[derive(Parser)]
#[command(name = "shellbox")]
#[command(about = "A sandboxed bash-style shell with a virtual filesystem")]
#[command(version)]
struct Cli {
    /// Execute the script given on the command line
    #[arg(short = 'c')]
    script: Option<String>,

    /// Exit immediately when a command fails (set -e)
    #[arg(short = 'e', long = "errexit")]
    errexit: bool,

    /// Working directory inside the sandbox
    #[arg(long = "cwd")]
    cwd: Option<String>,

    /// Mount a host directory read-only: HOST:GUEST
    #[arg(long = "mount")]
    mounts: Vec<String>,

    /// Make --mount directories writable (writes hit the host!)
    #[arg(long = "allow-write")]
    allow_write: bool,

    /// Allow network access to these URL prefixes
    #[arg(long = "allow-url")]
    allow_urls: Vec<String>,

    /// Emit {stdout, stderr, exitCode} as JSON
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    let script = if let Some(script) = cli.script {
        script
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("shellbox: cannot read script file {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("shellbox: no script; use -c 'script', a script file, or pipe via stdin");
            std::process::exit(1);
        }
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer).unwrap_or_default();
        buffer
    };

    let fs = build_fs(&cli.mounts, cli.allow_write).await;
    let net = (!cli.allow_urls.is_empty())
        .then(|| Arc::new(UrlAllowList::new(cli.allow_urls.clone())) as _);

    let mut shell = Shell::new(ShellConfig {
        cwd: cli.cwd,
        fs,
        net,
        env: HashMap::new(),
        ..Default::default()
    })
    .await;

    let script = if cli.errexit {
        format!("set -e\n{}", script)
    } else {
        script
    };
    let outcome = shell.exec(&script, None).await;

    if cli.json {
        match serde_json::to_string(&outcome) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("shellbox: cannot serialise outcome: {}", e),
        }
    } else {
        if !outcome.stdout.is_empty() {
            print!("{}", outcome.stdout);
        }
        if !outcome.stderr.is_empty() {
            eprint!("{}", outcome.stderr);
        }
    }
    std::process::exit(outcome.exit_code);
}

/// `--mount HOST:GUEST` entries become read-only host windows under an
/// in-memory overlay, routed through one mount table.
async fn build_fs(mounts: &[String], allow_write: bool) -> Option<Arc<dyn Vfs>> {
    if mounts.is_empty() {
        return None;
    }
    let base = Arc::new(shellbox::MemFs::new());
    let mounted = MountFs::new(base);
    for spec in mounts {
        let Some((host, guest)) = spec.split_once(':') else {
            eprintln!("shellbox: ignoring malformed --mount {:?} (want HOST:GUEST)", spec);
            continue;
        };
        let inner: Arc<dyn Vfs> = if allow_write {
            Arc::new(HostFs::writable(host))
        } else {
            Arc::new(OverlayFs::new(Arc::new(HostFs::read_only(host))))
        };
        mounted.mount(guest, inner).await;
    }
    Some(Arc::new(mounted))
}
