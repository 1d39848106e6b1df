//! End-to-end script scenarios run through the public embedding API.

use std::collections::HashMap;
use std::sync::Arc;

use shellbox::vfs::{MemFs, MountFs, OverlayFs, Vfs};
use shellbox::{Limits, Shell, ShellConfig, LIMIT_EXIT_CODE};

async fn fresh() -> Shell {
    Shell::new(ShellConfig::default()).await
}

async fn run(shell: &mut Shell, script: &str) -> shellbox::ExecOutcome {
    shell.exec(script, None).await
}

// ---------------------------------------------------------------------------
// The documented black-box scenarios
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn scenario_echo_wc() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "echo hello | wc -w").await;
    assert_eq!(out.stdout.trim(), "1");
    assert_eq!(out.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_for_loop() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "for i in 1 2 3; do echo $i; done").await;
    assert_eq!(out.stdout, "1\n2\n3\n");
    assert_eq!(out.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_and_or() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "false && echo x || echo y").await;
    assert_eq!(out.stdout, "y\n");
    assert_eq!(out.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_pipefail() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "set -o pipefail; false | true; echo $?").await;
    assert_eq!(out.stdout, "1\n");
    assert_eq!(out.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_local_scope() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "f(){ local x=1; echo $x; }; x=2; f; echo $x").await;
    assert_eq!(out.stdout, "1\n2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_arrays() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "a=(1 2 3); echo ${a[@]}; echo ${#a[@]}").await;
    assert_eq!(out.stdout, "1 2 3\n3\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_default_expansion() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "echo \"${v:-default}\"; echo ${v}").await;
    assert_eq!(out.stdout, "default\n\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_regex_match() {
    let mut sh = fresh().await;
    let out = run(
        &mut sh,
        "if [[ \"abc\" =~ ^a(b)c$ ]]; then echo ${BASH_REMATCH[1]}; fi",
    )
    .await;
    assert_eq!(out.stdout, "b\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_grep_missing_file() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "grep foo /missing.txt").await;
    assert!(out.stdout.is_empty());
    assert_eq!(out.stderr, "grep: /missing.txt: No such file or directory\n");
    assert_eq!(out.exit_code, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_loop_limit() {
    let mut sh = Shell::new(ShellConfig {
        limits: Some(Limits {
            max_loop_iterations: 5,
            ..Default::default()
        }),
        ..Default::default()
    })
    .await;
    let out = run(&mut sh, "while :; do :; done").await;
    assert_eq!(out.exit_code, LIMIT_EXIT_CODE);
    assert!(out.stderr.contains("loop iterations"));
}

// ---------------------------------------------------------------------------
// Contract invariants
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn invariant_env_isolation_between_execs() {
    let mut sh = fresh().await;
    run(&mut sh, "VAR=1").await;
    let out = run(&mut sh, "echo \"[$VAR]\"").await;
    assert_eq!(out.stdout, "[]\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invariant_vfs_persistence_between_execs() {
    let mut sh = fresh().await;
    run(&mut sh, "mkdir -p /state && echo 41 > /state/n").await;
    let out = run(&mut sh, "echo $(( $(cat /state/n) + 1 ))").await;
    assert_eq!(out.stdout, "42\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invariant_subshell_purity() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "( VAR=1 ); echo \"[$VAR]\"").await;
    assert_eq!(out.stdout, "[]\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invariant_pipestatus_tracks_stages() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "true | false | true; echo ${PIPESTATUS[@]}").await;
    assert_eq!(out.stdout, "0 1 0\n");
    let out = run(&mut sh, "true | false | true; echo ${#PIPESTATUS[@]}").await;
    assert_eq!(out.stdout, "3\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invariant_single_quotes_are_literal() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "echo '$HOME * `x` \"q\"'").await;
    assert_eq!(out.stdout, "$HOME * `x` \"q\"\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invariant_governor_call_depth() {
    let mut sh = Shell::new(ShellConfig {
        limits: Some(Limits {
            max_call_depth: 10,
            ..Default::default()
        }),
        ..Default::default()
    })
    .await;
    let out = run(&mut sh, "f(){ f; }; f").await;
    assert_eq!(out.exit_code, LIMIT_EXIT_CODE);
    assert!(out.stderr.contains("call depth"));
}

// ---------------------------------------------------------------------------
// Filesystem composition
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn overlay_whiteout_roundtrip() {
    let lower = Arc::new(MemFs::new());
    lower.write("/base/keep.txt", b"keep").await.unwrap();
    lower.write("/base/gone.txt", b"gone").await.unwrap();
    let overlay: Arc<dyn Vfs> = Arc::new(OverlayFs::new(lower.clone()));

    let mut sh = Shell::new(ShellConfig {
        fs: Some(overlay),
        cwd: Some("/base".to_string()),
        ..Default::default()
    })
    .await;

    let out = run(&mut sh, "rm gone.txt && ls").await;
    assert_eq!(out.stdout, "keep.txt\n");
    // Lower layer untouched; deletion was a whiteout.
    assert_eq!(lower.read_to_string("/base/gone.txt").await.unwrap(), "gone");

    let out = run(&mut sh, "echo fresh > gone.txt && cat gone.txt").await;
    assert_eq!(out.stdout, "fresh\n");
    assert_eq!(lower.read_to_string("/base/gone.txt").await.unwrap(), "gone");
}

#[tokio::test(flavor = "multi_thread")]
async fn mount_boundary_listing() {
    let base = Arc::new(MemFs::new());
    let data = Arc::new(MemFs::new());
    data.write("/report.csv", b"a,b\n").await.unwrap();
    let mounted = MountFs::new(base);
    mounted.mount("/srv/data", data).await;

    let mut sh = Shell::new(ShellConfig {
        fs: Some(Arc::new(mounted)),
        cwd: Some("/".to_string()),
        ..Default::default()
    })
    .await;

    let out = run(&mut sh, "ls /srv").await;
    assert_eq!(out.stdout, "data\n");
    let out = run(&mut sh, "cat /srv/data/report.csv").await;
    assert_eq!(out.stdout, "a,b\n");
    let out = run(&mut sh, "echo new > /srv/data/out.txt && cat /srv/data/out.txt").await;
    assert_eq!(out.stdout, "new\n");
}

// ---------------------------------------------------------------------------
// Dispatch precedence and user-land coverage
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_special_builtin_beats_function() {
    let mut sh = fresh().await;
    let out = run(
        &mut sh,
        "export(){ echo hijacked; }; export X=1; echo \"[$X]\"",
    )
    .await;
    assert_eq!(out.stdout, "[1]\n");
    assert_eq!(out.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_function_beats_ordinary_builtin() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "pwd(){ echo custom; }; pwd").await;
    assert_eq!(out.stdout, "custom\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_function_beats_plugin() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "cat(){ echo shadowed; }; echo x > f; cat f").await;
    assert_eq!(out.stdout, "shadowed\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_alias_expansion() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "alias ll='echo listing'; ll now").await;
    assert_eq!(out.stdout, "listing now\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_path_script_execution() {
    let mut sh = fresh().await;
    run(
        &mut sh,
        "printf '#!/bin/sh\\necho ran with $1\\n' > /usr/bin/myscript",
    )
    .await;
    let out = run(&mut sh, "myscript arg1").await;
    assert_eq!(out.stdout, "ran with arg1\n");
    assert_eq!(out.exit_code, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn userland_text_pipeline() {
    let mut sh = Shell::new(ShellConfig {
        files: [(
            "/data/words.txt".to_string(),
            "pear\napple\npear\nbanana\napple\npear\n".to_string(),
        )]
        .into(),
        ..Default::default()
    })
    .await;
    let out = run(&mut sh, "sort /data/words.txt | uniq -c | sort -rn | head -n 1").await;
    assert!(out.stdout.contains("3 pear"));
}

#[tokio::test(flavor = "multi_thread")]
async fn userland_find_xargs() {
    let mut sh = fresh().await;
    run(&mut sh, "mkdir -p /proj/src && touch /proj/src/a.rs /proj/src/b.rs /proj/readme.md").await;
    let out = run(&mut sh, "find /proj -name '*.rs' | xargs wc -l | tail -n 1").await;
    assert!(out.stdout.contains("total") || out.stdout.contains('0'));
}

#[tokio::test(flavor = "multi_thread")]
async fn heredoc_quoted_vs_unquoted() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "v=x\ncat <<EOF\ngot $v\nEOF\ncat <<'EOF'\nraw $v\nEOF").await;
    assert_eq!(out.stdout, "got x\nraw $v\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn redirection_matrix() {
    let mut sh = fresh().await;
    let out = run(
        &mut sh,
        "echo one > f && echo two >> f && cat f && cat < f | wc -l",
    )
    .await;
    assert!(out.stdout.starts_with("one\ntwo\n"));
    assert_eq!(out.stdout.lines().last().unwrap().trim(), "2");
}

#[tokio::test(flavor = "multi_thread")]
async fn stderr_redirect_and_merge() {
    let mut sh = fresh().await;
    let out = run(&mut sh, "grep x /nope 2>/dev/null; echo after").await;
    assert_eq!(out.stderr, "");
    assert_eq!(out.stdout, "after\n");

    let out = run(&mut sh, "grep x /nope 2>&1 | wc -l").await;
    assert_eq!(out.stdout.trim(), "1");
}

#[tokio::test(flavor = "multi_thread")]
async fn brace_and_glob_interplay() {
    let mut sh = fresh().await;
    run(&mut sh, "mkdir -p /w && touch /w/a1.log /w/a2.log /w/b1.log").await;
    let out = run(&mut sh, "echo /w/a{1,2}.log; echo /w/*.log").await;
    assert_eq!(
        out.stdout,
        "/w/a1.log /w/a2.log\n/w/a1.log /w/a2.log /w/b1.log\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn case_fallthrough_variants() {
    let mut sh = fresh().await;
    let out = run(
        &mut sh,
        "case ab in a*) echo first;;& *b) echo second;; *) echo never;; esac",
    )
    .await;
    assert_eq!(out.stdout, "first\nsecond\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn arithmetic_for_and_break() {
    let mut sh = fresh().await;
    let out = run(
        &mut sh,
        "for ((i=0; i<10; i++)); do if (( i == 3 )); then break; fi; echo $i; done",
    )
    .await;
    assert_eq!(out.stdout, "0\n1\n2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn source_positional_restore() {
    let mut sh = fresh().await;
    run(
        &mut sh,
        "printf 'echo inside:$1\\nreturn 5\\necho never\\n' > lib.sh",
    )
    .await;
    let out = run(&mut sh, "set -- outer; source ./lib.sh inner; echo $?:$1").await;
    assert_eq!(out.stdout, "inside:inner\n5:outer\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn command_count_limit_applies() {
    let mut sh = Shell::new(ShellConfig {
        limits: Some(Limits {
            max_command_count: 10,
            ..Default::default()
        }),
        ..Default::default()
    })
    .await;
    let out = run(&mut sh, "for i in 1 2 3 4 5 6 7 8 9 10 11 12; do echo $i; done").await;
    assert_eq!(out.exit_code, LIMIT_EXIT_CODE);
}

#[tokio::test(flavor = "multi_thread")]
async fn json_shaped_outcome_fields() {
    // The ExecOutcome carries the env snapshot for the facade contract.
    let mut sh = Shell::new(ShellConfig {
        env: HashMap::from([("SEED".to_string(), "1".to_string())]),
        ..Default::default()
    })
    .await;
    let out = run(&mut sh, "X=2; echo done").await;
    assert_eq!(out.stdout, "done\n");
    assert_eq!(out.env.get("SEED").map(String::as_str), Some("1"));
    assert_eq!(out.env.get("X").map(String::as_str), Some("2"));
}
