//! Redirections
//!
//! Redirects are planned per command, in declaration order, after their
//! targets expand. The plan tracks where each of the two output streams
//! currently points, so `2>&1` copies whatever stdout resolves to at
//! that moment. After the command runs, its captured streams are routed:
//! into the surrounding streams, into VFS files, or dropped.

use crate::engine::env::Env;
use crate::engine::flow::{Flow, Output};
use crate::engine::walker::Walker;
use crate::syntax::ast::{Redirect, RedirOp, RedirTarget, Word};

#[derive(Debug, Clone, PartialEq)]
enum Chan {
    Stdout,
    Stderr,
    File { path: String, append: bool },
    Null,
}

#[derive(Debug, Clone)]
pub struct IoPlan {
    pub stdin: Option<String>,
    out: Chan,
    err: Chan,
}

impl Default for IoPlan {
    fn default() -> Self {
        Self {
            stdin: None,
            out: Chan::Stdout,
            err: Chan::Stderr,
        }
    }
}

impl Walker {
    /// Expand and order the redirect list into an I/O plan. A failed
    /// redirection aborts the command with status 1 before it runs.
    pub(crate) fn plan_redirs(
        &self,
        env: &mut Env,
        redirs: &[Redirect],
        _stdin: &str,
    ) -> Result<IoPlan, Flow> {
        let mut plan = IoPlan::default();
        for redir in redirs {
            match redir.op {
                RedirOp::In | RedirOp::InOut => {
                    let path = self.redir_path(env, &redir.target)?;
                    if path == "/dev/null" {
                        plan.stdin = Some(String::new());
                        continue;
                    }
                    match self.fs.read_to_string(&path) {
                        Ok(text) => plan.stdin = Some(text),
                        Err(_) => {
                            return Err(Flow::fail(
                                1,
                                format!("{}: No such file or directory", display_target(&redir.target)),
                            ));
                        }
                    }
                }
                RedirOp::HereDoc => {
                    if let RedirTarget::HereDoc(hd) = &redir.target {
                        plan.stdin = Some(self.expand_word_str(env, &hd.body)?);
                    }
                }
                RedirOp::HereString => {
                    let text = self.redir_word_text(env, &redir.target)?;
                    plan.stdin = Some(format!("{}\n", text));
                }
                RedirOp::Out | RedirOp::OutAppend | RedirOp::OutClobber => {
                    let path = self.redir_path(env, &redir.target)?;
                    if redir.op == RedirOp::Out && env.flags.noclobber && self.fs.is_file(&path) {
                        return Err(Flow::fail(
                            1,
                            format!("{}: cannot overwrite existing file", display_target(&redir.target)),
                        ));
                    }
                    let chan = file_chan(&path, redir.op == RedirOp::OutAppend);
                    match redir.fd.unwrap_or(1) {
                        1 => plan.out = chan,
                        2 => plan.err = chan,
                        _ => {}
                    }
                }
                RedirOp::OutErr | RedirOp::OutErrAppend => {
                    let path = self.redir_path(env, &redir.target)?;
                    let chan = file_chan(&path, redir.op == RedirOp::OutErrAppend);
                    plan.out = chan.clone();
                    plan.err = chan;
                }
                RedirOp::DupOut => {
                    let text = self.redir_word_text(env, &redir.target)?;
                    let source_fd = redir.fd.unwrap_or(1);
                    match text.trim() {
                        "1" => {
                            let target = plan.out.clone();
                            assign_fd(&mut plan, source_fd, target);
                        }
                        "2" => {
                            let target = plan.err.clone();
                            assign_fd(&mut plan, source_fd, target);
                        }
                        "-" => assign_fd(&mut plan, source_fd, Chan::Null),
                        other => {
                            // Legacy `>&file` sends both streams there.
                            let path = self.fs.resolve(&env.cwd, other);
                            if env.flags.noclobber && self.fs.is_file(&path) {
                                return Err(Flow::fail(
                                    1,
                                    format!("{}: cannot overwrite existing file", other),
                                ));
                            }
                            let chan = file_chan(&path, false);
                            plan.out = chan.clone();
                            plan.err = chan;
                        }
                    }
                }
                RedirOp::DupIn => {
                    let text = self.redir_word_text(env, &redir.target)?;
                    match text.trim() {
                        "-" => plan.stdin = Some(String::new()),
                        "0" => {}
                        other if other.chars().all(|c| c.is_ascii_digit()) => {}
                        other => {
                            let path = self.fs.resolve(&env.cwd, other);
                            match self.fs.read_to_string(&path) {
                                Ok(text) => plan.stdin = Some(text),
                                Err(_) => {
                                    return Err(Flow::fail(
                                        1,
                                        format!("{}: No such file or directory", other),
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Route a finished command's streams through the plan, performing
    /// the deferred file writes.
    pub(crate) fn route_output(&self, plan: IoPlan, result: Output) -> Output {
        let mut routed = Output {
            stdout: String::new(),
            stderr: String::new(),
            status: result.status,
        };
        let same_file = match (&plan.out, &plan.err) {
            (Chan::File { path: a, .. }, Chan::File { path: b, .. }) => a == b,
            _ => false,
        };

        self.route_stream(&plan.out, &result.stdout, &mut routed);
        if same_file {
            // Both streams share one file: stdout already set it up, so
            // stderr appends regardless of its own mode.
            if let Chan::File { path, .. } = &plan.err {
                if let Err(e) = self.fs.append(path, result.stderr.as_bytes()) {
                    routed.stderr.push_str(&format!("bash: {}\n", e));
                    routed.status = 1;
                }
            }
        } else {
            self.route_stream(&plan.err, &result.stderr, &mut routed);
        }
        routed
    }

    fn route_stream(&self, chan: &Chan, text: &str, routed: &mut Output) {
        match chan {
            Chan::Stdout => routed.stdout.push_str(text),
            Chan::Stderr => routed.stderr.push_str(text),
            Chan::Null => {}
            Chan::File { path, append } => {
                let write = if *append {
                    self.fs.append(path, text.as_bytes())
                } else {
                    self.fs.write(path, text.as_bytes())
                };
                if let Err(e) = write {
                    routed.stderr.push_str(&format!("bash: {}\n", e));
                    routed.status = 1;
                }
            }
        }
    }

    fn redir_word_text(&self, env: &mut Env, target: &RedirTarget) -> Result<String, Flow> {
        match target {
            RedirTarget::Word(word) => self.expand_word_str(env, word),
            RedirTarget::HereDoc(hd) => self.expand_word_str(env, &hd.body),
        }
    }

    fn redir_path(&self, env: &mut Env, target: &RedirTarget) -> Result<String, Flow> {
        let text = self.redir_word_text(env, target)?;
        Ok(self.fs.resolve(&env.cwd, &text))
    }
}

fn file_chan(path: &str, append: bool) -> Chan {
    match path {
        "/dev/null" => Chan::Null,
        "/dev/stdout" => Chan::Stdout,
        "/dev/stderr" => Chan::Stderr,
        _ => Chan::File {
            path: path.to_string(),
            append,
        },
    }
}

fn assign_fd(plan: &mut IoPlan, fd: u32, target: Chan) {
    match fd {
        1 => plan.out = target,
        2 => plan.err = target,
        _ => {}
    }
}

fn display_target(target: &RedirTarget) -> String {
    match target {
        RedirTarget::Word(Word { parts }) => parts
            .iter()
            .map(|p| match p {
                crate::syntax::ast::WordPart::Lit(s) => s.clone(),
                crate::syntax::ast::WordPart::SingleQuoted(s) => s.clone(),
                _ => String::new(),
            })
            .collect(),
        RedirTarget::HereDoc(hd) => hd.tag.clone(),
    }
}
