//! Command Dispatch
//!
//! Runs a simple command: alias substitution, assignment handling, word
//! expansion, redirection planning, and name resolution in the fixed
//! order special builtins → functions → remaining builtins → registered
//! plugins → `$PATH` scripts → command-not-found (127).

use crate::cmds::{ExecFn, Invocation, ToolOutput};
use crate::engine::builtins;
use crate::engine::env::{Env, Value, Var};
use crate::engine::flow::{Exec, Flow, FlowKind, Output};
use crate::engine::walker::Walker;
use crate::syntax::ast::{Assign, Cmd, Script, SimpleCmd, Word, WordPart};
use crate::syntax::{parse, Parser};

/// Alias substitution gives up after this many rewrites of one command.
const MAX_ALIAS_DEPTH: usize = 16;

impl Walker {
    pub(crate) fn run_simple(&self, env: &mut Env, cmd: &SimpleCmd, stdin: &str) -> Exec {
        env.line = cmd.span.line;
        env.last_sub_status = None;

        if env.shopts.expand_aliases {
            if let Some(rewritten) = self.alias_rewrite(env, cmd, 0)? {
                return self.run_simple_noalias(env, &rewritten, stdin);
            }
        }
        self.run_simple_noalias(env, cmd, stdin)
    }

    fn run_simple_noalias(&self, env: &mut Env, cmd: &SimpleCmd, stdin: &str) -> Exec {
        // Assignment-only line: mutate the current environment; `> f`
        // with no command still performs its redirections.
        let argv = self.expand_words(env, &cmd.words)?;
        if argv.is_empty() {
            let plan = self.plan_redirs(env, &cmd.redirs, stdin)?;
            for assign in &cmd.assigns {
                self.apply_assign(env, assign, false)?;
            }
            let status = env.last_sub_status.take().unwrap_or(0);
            return Ok(self.route_output(plan, Output::new("", "", status)));
        }

        let name = argv[0].clone();
        let args = argv[1..].to_vec();

        let mut trace = String::new();
        if env.flags.xtrace {
            let ps4 = env.get_str("PS4").unwrap_or_else(|| "+ ".to_string());
            trace = format!("{}{}\n", ps4, argv.join(" "));
        }

        let plan = self.plan_redirs(env, &cmd.redirs, stdin)?;
        let effective_stdin = plan.stdin.clone().unwrap_or_else(|| stdin.to_string());

        // Prefix assignments live only for this command.
        let saved: Vec<(String, Option<Var>)> = cmd
            .assigns
            .iter()
            .map(|a| (a.name.clone(), env.get(&a.name).cloned()))
            .collect();
        for assign in &cmd.assigns {
            self.apply_assign(env, assign, true)?;
        }

        // A stdin redirect on the command itself beats any surrounding
        // consumable buffer (`read x <<< y` inside a piped loop).
        let saved_group = if plan.stdin.is_some() {
            Some(env.group_stdin.take())
        } else {
            None
        };
        let result = self.dispatch(env, &name, &args, &effective_stdin);
        if let Some(saved) = saved_group {
            env.group_stdin = saved;
        }

        for (name, old) in saved {
            match old {
                Some(var) => env.put_var(&name, var),
                None => env.unset(&name),
            }
        }

        env.last_arg = argv.last().cloned().unwrap_or_default();

        let mut result = match result {
            Ok(out) => out,
            Err(flow) => return Err(flow.preface("", &trace)),
        };
        result.stderr = format!("{}{}", trace, result.stderr);

        self.drain_out_procs(env, &mut result);
        Ok(self.route_output(plan, result))
    }

    /// Resolve and run `name`: special builtin, function, builtin,
    /// plugin, `$PATH` entry.
    pub(crate) fn dispatch(
        &self,
        env: &mut Env,
        name: &str,
        args: &[String],
        stdin: &str,
    ) -> Exec {
        // Special builtins outrank functions: `export(){ …; }` never
        // captures the real export.
        if builtins::is_special_builtin(name) {
            if let Some(result) = builtins::run(self, env, name, args, stdin) {
                return result;
            }
        }
        if let Some(def) = env.functions.get(name).cloned() {
            return self.call_function(env, &def, args, stdin);
        }
        if let Some(result) = builtins::run(self, env, name, args, stdin) {
            return result;
        }
        if let Some(tool) = self.tools.get(name) {
            return Ok(self.run_tool(env, tool, name, args, stdin));
        }
        self.run_path_command(env, name, args, stdin)
    }

    /// `command`-builtin path: run a registered plugin directly.
    pub(crate) fn run_registered_tool(
        &self,
        env: &mut Env,
        tool: std::sync::Arc<dyn crate::cmds::Tool>,
        args: &[String],
        stdin: &str,
    ) -> Exec {
        Ok(self.run_tool(env, tool, "", args, stdin))
    }

    // -----------------------------------------------------------------
    // Aliases
    // -----------------------------------------------------------------

    /// Substitute a leading alias, merging its parsed form with the rest
    /// of the original command. Returns the rewritten command, or `None`
    /// when no alias applies.
    fn alias_rewrite(
        &self,
        env: &mut Env,
        cmd: &SimpleCmd,
        depth: usize,
    ) -> Result<Option<SimpleCmd>, Flow> {
        if depth >= MAX_ALIAS_DEPTH {
            return Ok(None);
        }
        let Some(first) = cmd.words.first().and_then(Word::as_lit) else {
            return Ok(None);
        };
        let Some(expansion) = env.aliases.get(first).cloned() else {
            return Ok(None);
        };

        let parsed = parse(&expansion)
            .map_err(|e| Flow::fail(2, format!("alias {}: {}", first, e.message)))?;
        // Only a single simple command can be merged in place; anything
        // fancier falls back to the alias text alone followed by the
        // arguments appended to its last command — which for the common
        // case is the same thing.
        let mut base = match single_simple(&parsed) {
            Some(simple) => simple,
            None => return Ok(None),
        };

        let chain = expansion.ends_with(' ');
        let alias_assigns = std::mem::take(&mut base.assigns);
        base.assigns = cmd.assigns.iter().cloned().chain(alias_assigns).collect();
        base.words.extend(cmd.words.iter().skip(1).cloned());
        base.redirs.extend(cmd.redirs.iter().cloned());
        base.span = cmd.span;

        // A trailing space re-checks the next word for aliases.
        if chain {
            if let Some(deeper) = self.alias_rewrite(env, &base, depth + 1)? {
                return Ok(Some(deeper));
            }
        }
        Ok(Some(base))
    }

    // -----------------------------------------------------------------
    // Assignments
    // -----------------------------------------------------------------

    pub(crate) fn apply_assign(
        &self,
        env: &mut Env,
        assign: &Assign,
        temp_export: bool,
    ) -> Result<(), Flow> {
        if env.is_readonly(&assign.name) {
            return Err(Flow::fail(
                1,
                format!("{}: readonly variable", assign.name),
            ));
        }

        if let Some(elements) = &assign.array {
            let value = self.build_array_value(env, &assign.name, elements, assign.append)?;
            env.set_var(&assign.name, value);
            return Ok(());
        }

        if let Some(index_word) = &assign.index {
            let rhs = match &assign.value {
                Some(word) => self.expand_word_str(env, word)?,
                None => String::new(),
            };
            let is_assoc = matches!(
                env.get(&assign.name),
                Some(Var {
                    value: Value::Assoc(_),
                    ..
                })
            );
            if is_assoc {
                let key = self.expand_word_str(env, index_word)?;
                let value = if assign.append {
                    let old = self
                        .array_element(env, &assign.name, index_word)?
                        .unwrap_or_default();
                    format!("{}{}", old, rhs)
                } else {
                    rhs
                };
                env.set_key(&assign.name, &key, value);
            } else {
                let text = self.expand_word_str(env, index_word)?;
                let index = self.eval_arith_text(env, &text)?;
                let value = if assign.append {
                    let old = self
                        .array_element(env, &assign.name, index_word)?
                        .unwrap_or_default();
                    format!("{}{}", old, rhs)
                } else {
                    rhs
                };
                env.set_index(&assign.name, index, value);
            }
            return Ok(());
        }

        let mut text = match &assign.value {
            Some(word) => self.expand_word_str(env, word)?,
            None => String::new(),
        };
        let integer = env.get(&assign.name).map(|v| v.attrs.integer).unwrap_or(false);
        if integer {
            text = self.eval_arith_text(env, &text)?.to_string();
        }
        if assign.append {
            match env.get(&assign.name).map(|v| v.value.clone()) {
                Some(Value::Indexed(map)) => {
                    let next = map.keys().max().map(|k| k + 1).unwrap_or(0);
                    env.set_index(&assign.name, next, text);
                }
                Some(existing) => {
                    if integer {
                        let sum = self
                            .eval_arith_text(env, &existing.as_scalar())?
                            .wrapping_add(text.parse::<i64>().unwrap_or(0));
                        env.set_str(&assign.name, sum.to_string());
                    } else {
                        env.set_str(&assign.name, format!("{}{}", existing.as_scalar(), text));
                    }
                }
                None => env.set_str(&assign.name, text),
            }
        } else {
            env.set_str(&assign.name, text);
        }
        if temp_export {
            env.set_attr(&assign.name, |a| a.exported = true);
        }
        Ok(())
    }

    /// `name=(a b [k]=v c)` — build the array value.
    fn build_array_value(
        &self,
        env: &mut Env,
        name: &str,
        elements: &[Word],
        append: bool,
    ) -> Result<Value, Flow> {
        let is_assoc = matches!(
            env.get(name),
            Some(Var {
                value: Value::Assoc(_),
                ..
            })
        );
        if is_assoc {
            let mut map = if append {
                match env.get(name).map(|v| v.value.clone()) {
                    Some(Value::Assoc(map)) => map,
                    _ => Default::default(),
                }
            } else {
                Default::default()
            };
            for element in elements {
                if let Some((key, value_word)) = split_subscript_element(element) {
                    let key = self.expand_word_str(env, &key)?;
                    let value = self.expand_word_str(env, &value_word)?;
                    map.insert(key, value);
                } else {
                    let value = self.expand_word_str(env, element)?;
                    map.insert(map.len().to_string(), value);
                }
            }
            return Ok(Value::Assoc(map));
        }

        let mut map = if append {
            match env.get(name).map(|v| v.value.clone()) {
                Some(Value::Indexed(map)) => map,
                Some(Value::Str(s)) => [(0i64, s)].into_iter().collect(),
                _ => Default::default(),
            }
        } else {
            Default::default()
        };
        let mut next = map.keys().max().map(|k| k + 1).unwrap_or(0);
        for element in elements {
            if let Some((key, value_word)) = split_subscript_element(element) {
                let text = self.expand_word_str(env, &key)?;
                let index = self.eval_arith_text(env, &text)?;
                let value = self.expand_word_str(env, &value_word)?;
                map.insert(index, value);
                next = index + 1;
                continue;
            }
            // Each element undergoes full expansion; `a=( *.txt $list )`
            // can contribute several values.
            for value in self.expand_word_fields(env, element)? {
                map.insert(next, value);
                next += 1;
            }
        }
        Ok(Value::Indexed(map))
    }

    // -----------------------------------------------------------------
    // Plugins
    // -----------------------------------------------------------------

    fn run_tool(
        &self,
        env: &mut Env,
        tool: std::sync::Arc<dyn crate::cmds::Tool>,
        name: &str,
        args: &[String],
        stdin: &str,
    ) -> Output {
        let inv = Invocation {
            args: args.to_vec(),
            stdin: stdin.to_string(),
            cwd: env.cwd.clone(),
            env: env.as_string_map(),
            fs: self.fs.shared(),
            governor: self.gov.clone(),
            net: self.net.clone(),
            fetch: self.fetch.clone(),
            sleep: self.sleep.clone(),
            random: self.random.clone(),
            exec: Some(self.exec_hook()),
        };
        let out = self.fs.block_on(tool.run(inv));
        let _ = name;
        Output::new(out.stdout, out.stderr, out.status)
    }

    /// Re-entry hook for `xargs`-style plugins: runs a command line in a
    /// fresh environment snapshot.
    fn exec_hook(&self) -> ExecFn {
        let walker = self.clone();
        std::sync::Arc::new(move |line, stdin, cwd, envmap| {
            let walker = walker.clone();
            Box::pin(async move {
                tokio::task::block_in_place(move || {
                    let mut env = Env::default();
                    env.cwd = cwd;
                    for (key, value) in envmap {
                        env.set_var(
                            &key,
                            Value::Str(value),
                        );
                        env.set_attr(&key, |a| a.exported = true);
                    }
                    let script = match parse(&line) {
                        Ok(script) => script,
                        Err(e) => {
                            return ToolOutput::failure(
                                format!("bash: syntax error: {}\n", e),
                                2,
                            )
                        }
                    };
                    match walker.run_script(&mut env, &script, &stdin) {
                        Ok(out) => ToolOutput::new(out.stdout, out.stderr, out.status),
                        Err(flow) => {
                            let out = flow.into_output();
                            ToolOutput::new(out.stdout, out.stderr, out.status)
                        }
                    }
                })
            })
        })
    }

    // -----------------------------------------------------------------
    // $PATH scripts
    // -----------------------------------------------------------------

    fn run_path_command(&self, env: &mut Env, name: &str, args: &[String], stdin: &str) -> Exec {
        let candidate = if name.contains('/') {
            let path = self.fs.resolve(&env.cwd, name);
            if !self.fs.exists(&path) {
                return Ok(Output::failure(
                    format!("bash: {}: No such file or directory\n", name),
                    127,
                ));
            }
            Some(path)
        } else {
            let path_var = env.get_str("PATH").unwrap_or_default();
            path_var
                .split(':')
                .filter(|d| !d.is_empty())
                .map(|d| format!("{}/{}", d, name))
                .find(|p| self.fs.is_file(p))
        };

        let Some(path) = candidate else {
            return Ok(Output::failure(
                format!("bash: {}: command not found\n", name),
                127,
            ));
        };
        if self.fs.is_dir(&path) {
            return Ok(Output::failure(
                format!("bash: {}: Is a directory\n", name),
                126,
            ));
        }
        let Ok(content) = self.fs.read_to_string(&path) else {
            return Ok(Output::failure(
                format!("bash: {}: cannot execute\n", name),
                126,
            ));
        };
        if content.starts_with("\u{7f}ELF") || content.contains('\u{0}') {
            return Ok(Output::failure(
                format!("bash: {}: cannot execute binary file\n", name),
                126,
            ));
        }
        if let Some(first) = content.lines().next() {
            if first.starts_with("#!") && !(first.contains("sh")) {
                return Ok(Output::failure(
                    format!("bash: {}: cannot execute: unsupported interpreter\n", name),
                    126,
                ));
            }
        }

        let script = Parser::with_source_label(&content, &path)
            .parse_script_to_end()
            .map_err(|e| Flow::fail(2, format!("{}: {}", path, e.message)))?;
        self.run_script_file(env, &script, &path, args, stdin)
    }

    /// Execute a parsed script file in a subshell frame with its own
    /// positional parameters.
    fn run_script_file(
        &self,
        env: &mut Env,
        script: &Script,
        path: &str,
        args: &[String],
        stdin: &str,
    ) -> Exec {
        let _guard = self.gov.enter_call().map_err(Flow::limit)?;
        let mut child = env.clone();
        child.script_name = path.to_string();
        child.positionals = args.to_vec();
        child.source_stack.push(path.to_string());
        match self.run_script(&mut child, script, stdin) {
            Ok(out) => Ok(out),
            Err(flow) => match flow.kind {
                FlowKind::Exit(_) | FlowKind::Return(_) | FlowKind::Errexit(_)
                | FlowKind::Unbound(_) => Ok(flow.into_output()),
                _ => Err(flow),
            },
        }
    }

    /// Run deferred `>(cmd)` bodies now that the producing command has
    /// written their temp files.
    pub(crate) fn drain_out_procs(&self, env: &mut Env, result: &mut Output) {
        let pending = std::mem::take(&mut env.pending_out_procs);
        for (path, script) in pending {
            let stdin = self.fs.read_to_string(&path).unwrap_or_default();
            let mut child = env.clone();
            match self.run_script(&mut child, &script, &stdin) {
                Ok(out) => {
                    result.stdout.push_str(&out.stdout);
                    result.stderr.push_str(&out.stderr);
                }
                Err(flow) => {
                    let out = flow.into_output();
                    result.stdout.push_str(&out.stdout);
                    result.stderr.push_str(&out.stderr);
                }
            }
            let _ = self.fs.remove(&path, crate::vfs::RemoveOpts::default());
        }
    }
}

/// A parsed alias body that is exactly one simple command.
fn single_simple(script: &Script) -> Option<SimpleCmd> {
    if script.items.len() != 1 {
        return None;
    }
    let list = &script.items[0];
    if list.pipelines.len() != 1 || list.pipelines[0].elements.len() != 1 {
        return None;
    }
    match &list.pipelines[0].elements[0] {
        Cmd::Simple(simple) => Some(simple.clone()),
        _ => None,
    }
}

/// `[k]=v` array elements: split the subscript prefix from the value.
fn split_subscript_element(word: &Word) -> Option<(Word, Word)> {
    let WordPart::Lit(first) = word.parts.first()? else {
        return None;
    };
    if !first.starts_with('[') {
        return None;
    }
    let close = first.find(']')?;
    let rest = &first[close + 1..];
    let value_text = rest.strip_prefix('=')?;
    let key = Word::lit(&first[1..close]);
    let mut value_parts = Vec::new();
    if !value_text.is_empty() {
        value_parts.push(WordPart::Lit(value_text.to_string()));
    }
    value_parts.extend(word.parts.iter().skip(1).cloned());
    Some((key, Word { parts: value_parts }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_subscript_element() {
        let word = Word::lit("[3]=hello");
        let (key, value) = split_subscript_element(&word).unwrap();
        assert_eq!(key.as_lit(), Some("3"));
        assert_eq!(value.as_lit(), Some("hello"));
    }

    #[test]
    fn test_split_subscript_element_plain_word() {
        assert!(split_subscript_element(&Word::lit("plain")).is_none());
    }
}
