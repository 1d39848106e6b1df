//! Pipeline Plumbing
//!
//! No OS pipes: each stage runs to completion and its captured stdout
//! becomes the next stage's stdin (stderr folds in for `|&`). Stages run
//! against cloned environments, so assignments die with the stage; under
//! `lastpipe` the final stage runs in the parent environment instead.

use std::time::Instant;

use crate::engine::env::Env;
use crate::engine::flow::{Exec, Flow, FlowKind, Output};
use crate::engine::walker::Walker;
use crate::syntax::ast::Pipeline;

impl Walker {
    pub fn run_pipeline(&self, env: &mut Env, pipeline: &Pipeline, stdin: &str) -> Exec {
        let started = pipeline.timed.then(Instant::now);

        let mut result = if pipeline.elements.len() == 1 {
            let out = self.run_command(env, &pipeline.elements[0], stdin)?;
            set_pipe_status(env, &[out.status]);
            out
        } else {
            self.run_staged(env, pipeline, stdin)?
        };

        if pipeline.bang {
            result.status = if result.status == 0 { 1 } else { 0 };
        }
        if let Some(start) = started {
            let secs = start.elapsed().as_secs_f64();
            let minutes = (secs / 60.0).floor() as u64;
            result.stderr.push_str(&format!(
                "\nreal\t{}m{:.3}s\nuser\t0m0.000s\nsys\t0m0.000s\n",
                minutes,
                secs % 60.0
            ));
        }
        env.last_status = result.status;
        Ok(result)
    }

    fn run_staged(&self, env: &mut Env, pipeline: &Pipeline, stdin: &str) -> Exec {
        let count = pipeline.elements.len();
        let mut statuses = Vec::with_capacity(count);
        let mut carried = stdin.to_string();
        let mut stderr_acc = String::new();
        let mut final_stdout = String::new();

        for (i, cmd) in pipeline.elements.iter().enumerate() {
            let last = i + 1 == count;
            let stage = if last && env.shopts.lastpipe {
                let saved = env.group_stdin.replace(carried.clone());
                let out = self.run_stage(env, cmd, &carried);
                env.group_stdin = saved;
                out?
            } else {
                let mut child = env.clone();
                child.group_stdin = Some(carried.clone());
                self.run_stage(&mut child, cmd, &carried)?
            };
            statuses.push(stage.status);

            if last {
                final_stdout = stage.stdout;
                stderr_acc.push_str(&stage.stderr);
            } else if pipeline.stderr_pipes.get(i).copied().unwrap_or(false) {
                carried = format!("{}{}", stage.stderr, stage.stdout);
            } else {
                stderr_acc.push_str(&stage.stderr);
                carried = stage.stdout;
            }
        }

        let status = if env.flags.pipefail {
            statuses
                .iter()
                .rev()
                .find(|&&s| s != 0)
                .copied()
                .unwrap_or(0)
        } else {
            statuses.last().copied().unwrap_or(0)
        };
        set_pipe_status(env, &statuses);
        Ok(Output::new(final_stdout, stderr_acc, status))
    }

    /// Run one stage, absorbing process-boundary unwinds the way a real
    /// pipeline child would.
    fn run_stage(&self, env: &mut Env, cmd: &crate::syntax::ast::Cmd, stdin: &str) -> Exec {
        match self.run_command(env, cmd, stdin) {
            Ok(out) => Ok(out),
            Err(flow) => match flow.kind {
                FlowKind::Exit(_)
                | FlowKind::Errexit(_)
                | FlowKind::Unbound(_)
                | FlowKind::Return(_)
                | FlowKind::Break(_)
                | FlowKind::Continue(_) => Ok(flow.into_output()),
                _ => Err(flow),
            },
        }
    }
}

/// Record `$PIPESTATUS`, both as interpreter state and as the mirrored
/// scalar variables plugins can see.
pub fn set_pipe_status(env: &mut Env, statuses: &[i32]) {
    for name in env.names_with_prefix("PIPESTATUS_") {
        env.unset(&name);
    }
    env.pipe_status = statuses.to_vec();
    for (i, status) in statuses.iter().enumerate() {
        env.set_str(format!("PIPESTATUS_{}", i).as_str(), status.to_string());
    }
    env.set_str("PIPESTATUS__length", statuses.len().to_string());
}
