//! Interpreter Core
//!
//! The tree walk. A [`Walker`] is a bundle of shared services (governor,
//! filesystem bridge, plugin registry, hooks); all mutable shell state
//! lives in the [`Env`] threaded through every method. Results carry
//! captured stdout/stderr, and control transfers (`break`, `return`,
//! `exit`, errexit, limit breaches) unwind as [`Flow`] errors until the
//! frame that owns them.

use std::sync::Arc;

use crate::cmds::{RandomFn, Registry, SleepFn};
use crate::engine::env::Env;
use crate::engine::flow::{Exec, Flow, FlowKind, Output};
use crate::engine::fsbridge::SyncFs;
use crate::governor::Governor;
use crate::net::{FetchFn, NetPolicy};
use crate::syntax::ast::*;

#[derive(Clone)]
pub struct Walker {
    pub gov: Governor,
    pub fs: SyncFs,
    pub tools: Arc<Registry>,
    pub net: Arc<dyn NetPolicy>,
    pub fetch: Option<FetchFn>,
    pub sleep: Option<SleepFn>,
    pub random: Option<RandomFn>,
}

enum LoopSignal {
    Ran,
    Broke,
}

impl Walker {
    // -----------------------------------------------------------------
    // Script and list level
    // -----------------------------------------------------------------

    /// Top-level entry: `break`/`continue` that escape every loop are
    /// ignored, everything else propagates.
    pub fn run_script(&self, env: &mut Env, script: &Script, stdin: &str) -> Exec {
        let mut acc = Output::success();
        for item in &script.items {
            match self.run_list(env, item, stdin) {
                Ok(out) => acc.absorb(out),
                Err(flow) => match flow.kind {
                    FlowKind::Break(_) | FlowKind::Continue(_) => {
                        acc.stdout.push_str(&flow.stdout);
                        acc.stderr.push_str(&flow.stderr);
                    }
                    _ => return Err(flow.preface(&acc.stdout, &acc.stderr)),
                },
            }
        }
        Ok(acc)
    }

    /// A compound body: like a script, but loop control propagates.
    pub fn run_body(&self, env: &mut Env, items: &[AndOrList], stdin: &str) -> Exec {
        let mut acc = Output::success();
        for item in items {
            match self.run_list(env, item, stdin) {
                Ok(out) => acc.absorb(out),
                Err(flow) => return Err(flow.preface(&acc.stdout, &acc.stderr)),
            }
        }
        Ok(acc)
    }

    pub fn run_list(&self, env: &mut Env, list: &AndOrList, stdin: &str) -> Exec {
        if env.flags.noexec {
            return Ok(Output::success());
        }
        env.line = list.span.line;

        let mut acc = Output::success();
        let mut last_ran = 0usize;
        let mut last_bang = false;
        for (idx, pipeline) in list.pipelines.iter().enumerate() {
            if idx > 0 {
                match list.connectors[idx - 1] {
                    Connector::AndIf if acc.status != 0 => continue,
                    Connector::OrIf if acc.status == 0 => continue,
                    _ => {}
                }
            }
            match self.run_pipeline(env, pipeline, stdin) {
                Ok(out) => {
                    acc.absorb(out);
                    env.last_status = acc.status;
                    last_ran = idx;
                    last_bang = pipeline.bang;
                }
                Err(flow) => return Err(flow.preface(&acc.stdout, &acc.stderr)),
            }
        }

        // errexit fires only when the final pipeline of the chain really
        // ran, failed, and was not negated or part of a condition.
        if env.flags.errexit
            && acc.status != 0
            && !env.in_condition
            && !last_bang
            && last_ran + 1 == list.pipelines.len()
        {
            let mut flow = Flow::errexit(acc.status);
            flow.stdout = acc.stdout;
            flow.stderr = acc.stderr;
            return Err(flow);
        }
        Ok(acc)
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    pub fn run_command(&self, env: &mut Env, cmd: &Cmd, stdin: &str) -> Exec {
        self.gov.charge_command().map_err(Flow::limit)?;
        let result = match cmd {
            Cmd::Simple(node) => self.run_simple(env, node, stdin),
            Cmd::If(node) => self.run_if(env, node, stdin),
            Cmd::While(node) => self.run_while(env, node, stdin, false),
            Cmd::Until(node) => self.run_while(env, node, stdin, true),
            Cmd::For(node) => self.run_for(env, node, stdin),
            Cmd::ArithFor(node) => self.run_arith_for(env, node, stdin),
            Cmd::Select(node) => self.run_select(env, node, stdin),
            Cmd::Case(node) => self.run_case(env, node, stdin),
            Cmd::Group(node) => self.run_group(env, node, stdin),
            Cmd::Subshell(node) => self.run_subshell(env, node, stdin),
            Cmd::Cond(node) => self.run_cond_command(env, node),
            Cmd::Arith(node) => self.run_arith_command(env, node),
            Cmd::FuncDef(node) => {
                env.functions.insert(node.name.clone(), node.clone());
                Ok(Output::success())
            }
        };
        // Diagnostics emitted during this command's expansions surface
        // ahead of the command's own stderr.
        let pre_stderr = std::mem::take(&mut env.expansion_stderr);
        let result = match result {
            Ok(mut out) => {
                out.stderr = format!("{}{}", pre_stderr, out.stderr);
                Ok(out)
            }
            Err(mut flow) => {
                flow.stderr = format!("{}{}", pre_stderr, flow.stderr);
                Err(flow)
            }
        };
        // Expansion failures become an ordinary failed command here; the
        // rest of the unwinds pass through to their owners.
        match result {
            Err(flow) if matches!(flow.kind, FlowKind::Fail(_)) => Ok(flow.into_output()),
            other => other,
        }
    }

    /// Plan a compound's redirections up front (so `done < file` feeds
    /// the loop body), run it, then route the collected output.
    fn with_redirs(
        &self,
        env: &mut Env,
        redirs: &[Redirect],
        stdin: &str,
        body: impl FnOnce(&Self, &mut Env, &str) -> Exec,
    ) -> Exec {
        if redirs.is_empty() {
            return body(self, env, stdin);
        }
        let plan = self.plan_redirs(env, redirs, stdin)?;
        let inner_stdin = plan.stdin.clone().unwrap_or_else(|| stdin.to_string());
        let saved_group = env.group_stdin.take();
        if plan.stdin.is_some() {
            env.group_stdin = Some(inner_stdin.clone());
        } else {
            env.group_stdin = saved_group.clone();
        }
        let result = body(self, env, &inner_stdin);
        env.group_stdin = saved_group;
        match result {
            Ok(out) => Ok(self.route_output(plan, out)),
            Err(flow) => Err(flow),
        }
    }

    fn run_if(&self, env: &mut Env, node: &IfCmd, stdin: &str) -> Exec {
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut acc = Output::success();
            for (condition, body) in &node.arms {
                let test = match walker.run_condition(env, condition, stdin) {
                    Ok(out) => out,
                    Err(flow) => return Err(flow.preface(&acc.stdout, &acc.stderr)),
                };
                let ok = test.ok();
                acc.stdout.push_str(&test.stdout);
                acc.stderr.push_str(&test.stderr);
                if ok {
                    return match walker.run_body(env, body, stdin) {
                        Ok(out) => {
                            acc.absorb(out);
                            Ok(acc)
                        }
                        Err(flow) => Err(flow.preface(&acc.stdout, &acc.stderr)),
                    };
                }
            }
            if let Some(body) = &node.else_body {
                match walker.run_body(env, body, stdin) {
                    Ok(out) => acc.absorb(out),
                    Err(flow) => return Err(flow.preface(&acc.stdout, &acc.stderr)),
                }
            } else {
                acc.status = 0;
            }
            Ok(acc)
        })
    }

    /// Run a condition list with errexit suppressed.
    fn run_condition(&self, env: &mut Env, items: &[AndOrList], stdin: &str) -> Exec {
        let saved = env.in_condition;
        env.in_condition = true;
        let result = self.run_body(env, items, stdin);
        env.in_condition = saved;
        result
    }

    fn run_while(&self, env: &mut Env, node: &LoopCmd, stdin: &str, until: bool) -> Exec {
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut acc = Output::success();
            let mut status = 0;
            loop {
                if let Err(breach) = walker.gov.charge_loop() {
                    return Err(Flow::limit(breach).preface(&acc.stdout, &acc.stderr));
                }
                let test = match walker.run_condition(env, &node.condition, stdin) {
                    Ok(out) => out,
                    Err(flow) => return Err(flow.preface(&acc.stdout, &acc.stderr)),
                };
                let passed = if until { !test.ok() } else { test.ok() };
                acc.stdout.push_str(&test.stdout);
                acc.stderr.push_str(&test.stderr);
                if !passed {
                    break;
                }
                match walker.loop_body(env, &node.body, stdin, &mut acc, &mut status)? {
                    LoopSignal::Broke => break,
                    LoopSignal::Ran => {}
                }
            }
            acc.status = status;
            Ok(acc)
        })
    }

    fn run_for(&self, env: &mut Env, node: &ForCmd, stdin: &str) -> Exec {
        let values = match &node.list {
            Some(words) => self.expand_words(env, words)?,
            None => env.positionals.clone(),
        };
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut acc = Output::success();
            let mut status = 0;
            for value in values {
                if let Err(breach) = walker.gov.charge_loop() {
                    return Err(Flow::limit(breach).preface(&acc.stdout, &acc.stderr));
                }
                env.set_str(&node.var, value);
                match walker.loop_body(env, &node.body, stdin, &mut acc, &mut status)? {
                    LoopSignal::Broke => break,
                    LoopSignal::Ran => {}
                }
            }
            acc.status = status;
            Ok(acc)
        })
    }

    fn run_arith_for(&self, env: &mut Env, node: &ArithForCmd, stdin: &str) -> Exec {
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut acc = Output::success();
            let mut status = 0;
            if let Some(init) = &node.init {
                walker.eval_arith(env, init)?;
            }
            loop {
                if let Err(breach) = walker.gov.charge_loop() {
                    return Err(Flow::limit(breach).preface(&acc.stdout, &acc.stderr));
                }
                let go = match &node.cond {
                    Some(cond) => walker.eval_arith(env, cond)? != 0,
                    None => true,
                };
                if !go {
                    break;
                }
                match walker.loop_body(env, &node.body, stdin, &mut acc, &mut status)? {
                    LoopSignal::Broke => break,
                    LoopSignal::Ran => {}
                }
                if let Some(step) = &node.step {
                    walker.eval_arith(env, step)?;
                }
            }
            acc.status = status;
            Ok(acc)
        })
    }

    fn run_select(&self, env: &mut Env, node: &ForCmd, stdin: &str) -> Exec {
        let values = match &node.list {
            Some(words) => self.expand_words(env, words)?,
            None => env.positionals.clone(),
        };
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut acc = Output::success();
            let mut status = 0;
            let prompt = env.get_str("PS3").unwrap_or_else(|| "#? ".to_string());
            for (i, value) in values.iter().enumerate() {
                acc.stderr.push_str(&format!("{}) {}\n", i + 1, value));
            }
            for line in stdin.lines() {
                if let Err(breach) = walker.gov.charge_loop() {
                    return Err(Flow::limit(breach).preface(&acc.stdout, &acc.stderr));
                }
                acc.stderr.push_str(&prompt);
                env.set_str("REPLY", line);
                let choice = line
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| values.get(n.wrapping_sub(1)))
                    .cloned()
                    .unwrap_or_default();
                env.set_str(&node.var, choice);
                match walker.loop_body(env, &node.body, stdin, &mut acc, &mut status)? {
                    LoopSignal::Broke => break,
                    LoopSignal::Ran => {}
                }
            }
            acc.status = status;
            Ok(acc)
        })
    }

    /// One loop-body run: merges streams into `acc`, turns `break` and
    /// `continue` for this level into signals, re-raises deeper ones.
    fn loop_body(
        &self,
        env: &mut Env,
        body: &[AndOrList],
        stdin: &str,
        acc: &mut Output,
        status: &mut i32,
    ) -> Result<LoopSignal, Flow> {
        match self.run_body(env, body, stdin) {
            Ok(out) => {
                *status = out.status;
                acc.stdout.push_str(&out.stdout);
                acc.stderr.push_str(&out.stderr);
                Ok(LoopSignal::Ran)
            }
            Err(flow) => {
                acc.stdout.push_str(&flow.stdout);
                acc.stderr.push_str(&flow.stderr);
                match flow.kind {
                    FlowKind::Break(n) => {
                        if n > 1 {
                            let deeper = Flow::new(FlowKind::Break(n - 1))
                                .preface(&acc.stdout, &acc.stderr);
                            acc.stdout.clear();
                            acc.stderr.clear();
                            Err(deeper)
                        } else {
                            Ok(LoopSignal::Broke)
                        }
                    }
                    FlowKind::Continue(n) => {
                        if n > 1 {
                            let deeper = Flow::new(FlowKind::Continue(n - 1))
                                .preface(&acc.stdout, &acc.stderr);
                            acc.stdout.clear();
                            acc.stderr.clear();
                            Err(deeper)
                        } else {
                            Ok(LoopSignal::Ran)
                        }
                    }
                    kind => {
                        // `acc` already absorbed the unwind's streams.
                        let deeper = Flow::new(kind).preface(&acc.stdout, &acc.stderr);
                        acc.stdout.clear();
                        acc.stderr.clear();
                        Err(deeper)
                    }
                }
            }
        }
    }

    fn run_case(&self, env: &mut Env, node: &CaseCmd, stdin: &str) -> Exec {
        let subject = self.expand_word_str(env, &node.subject)?;
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut acc = Output::success();
            let mut fall_through = false;
            for arm in &node.arms {
                let mut hit = fall_through;
                if !hit {
                    for pattern in &arm.patterns {
                        let text = walker.expand_word_pattern(env, pattern)?;
                        let matcher = crate::expand::pattern::GlobPattern::compile(
                            &text,
                            true,
                            env.shopts.nocasematch,
                        );
                        if matcher.matches(&subject) {
                            hit = true;
                            break;
                        }
                    }
                }
                if !hit {
                    continue;
                }
                match walker.run_body(env, &arm.body, stdin) {
                    Ok(out) => acc.absorb(out),
                    Err(flow) => return Err(flow.preface(&acc.stdout, &acc.stderr)),
                }
                match arm.terminator {
                    CaseFall::Stop => return Ok(acc),
                    CaseFall::Through => fall_through = true,
                    CaseFall::Resume => fall_through = false,
                }
            }
            Ok(acc)
        })
    }

    fn run_group(&self, env: &mut Env, node: &BlockCmd, stdin: &str) -> Exec {
        self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            walker.run_body(env, &node.body, stdin)
        })
    }

    fn run_subshell(&self, env: &mut Env, node: &BlockCmd, stdin: &str) -> Exec {
        let result = self.with_redirs(env, &node.redirs, stdin, |walker, env, stdin| {
            let mut child = env.clone();
            let out = match walker.run_body(&mut child, &node.body, stdin) {
                Ok(out) => out,
                Err(flow) => match flow.kind {
                    // The subshell is a process boundary: exits, aborts,
                    // and stray loop controls stop here.
                    FlowKind::Exit(_)
                    | FlowKind::Errexit(_)
                    | FlowKind::Return(_)
                    | FlowKind::Unbound(_)
                    | FlowKind::Break(_)
                    | FlowKind::Continue(_) => flow.into_output(),
                    _ => return Err(flow),
                },
            };
            Ok(out)
        })?;
        env.last_status = result.status;
        Ok(result)
    }

    fn run_cond_command(&self, env: &mut Env, node: &CondCmd) -> Exec {
        match self.eval_cond(env, &node.expr) {
            Ok(true) => Ok(Output::success()),
            Ok(false) => Ok(Output::new("", "", 1)),
            Err(flow) => Err(flow),
        }
    }

    fn run_arith_command(&self, env: &mut Env, node: &ArithCmd) -> Exec {
        let value = self.eval_arith(env, &node.expr)?;
        Ok(Output::new("", "", if value != 0 { 0 } else { 1 }))
    }

    // -----------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------

    pub fn call_function(
        &self,
        env: &mut Env,
        def: &FuncDef,
        args: &[String],
        stdin: &str,
    ) -> Exec {
        let _guard = self.gov.enter_call().map_err(Flow::limit)?;
        let saved_positionals = std::mem::replace(&mut env.positionals, args.to_vec());
        env.push_scope();
        env.func_stack.push(def.name.clone());
        env.source_stack
            .push(def.source.clone().unwrap_or_else(|| env.script_name.clone()));

        let result = self.run_command(env, &def.body, stdin);

        env.source_stack.pop();
        env.func_stack.pop();
        env.pop_scope();
        env.positionals = saved_positionals;

        match result {
            Err(flow) if matches!(flow.kind, FlowKind::Return(_)) => Ok(flow.into_output()),
            other => other,
        }
    }
}
