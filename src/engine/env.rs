//! Shell Environment
//!
//! Variables, frames, aliases, functions, flags, and the shell-level
//! bookkeeping the walker threads through every call. The whole value is
//! `Clone`: subshells and command substitutions run against a deep copy
//! and their writes die with it.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::syntax::ast::FuncDef;

/// A shell value: scalar, indexed array, or associative array. Indexed
/// arrays are sparse and iterate in index order; associative arrays keep
/// insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Indexed(BTreeMap<i64, String>),
    Assoc(IndexMap<String, String>),
}

impl Value {
    pub fn indexed_from(items: Vec<String>) -> Self {
        Value::Indexed(items.into_iter().enumerate().map(|(i, v)| (i as i64, v)).collect())
    }

    /// The scalar rendering: arrays read as their first element.
    pub fn as_scalar(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Indexed(map) => map.values().next().cloned().unwrap_or_default(),
            Value::Assoc(map) => map.get("0").cloned().unwrap_or_default(),
        }
    }

    /// All elements in iteration order.
    pub fn elements(&self) -> Vec<String> {
        match self {
            Value::Str(s) => vec![s.clone()],
            Value::Indexed(map) => map.values().cloned().collect(),
            Value::Assoc(map) => map.values().cloned().collect(),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Str(_) => vec!["0".to_string()],
            Value::Indexed(map) => map.keys().map(|k| k.to_string()).collect(),
            Value::Assoc(map) => map.keys().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Str(_) => 1,
            Value::Indexed(map) => map.len(),
            Value::Assoc(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-variable attribute bits (`declare -x/-r/-i/-l/-u`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarAttrs {
    pub exported: bool,
    pub readonly: bool,
    pub integer: bool,
    pub lowercase: bool,
    pub uppercase: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub value: Value,
    pub attrs: VarAttrs,
}

impl Var {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            value: Value::Str(value.into()),
            attrs: VarAttrs::default(),
        }
    }

    pub fn exported(value: impl Into<String>) -> Self {
        Self {
            value: Value::Str(value.into()),
            attrs: VarAttrs {
                exported: true,
                ..Default::default()
            },
        }
    }
}

/// `set -…` flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub errexit: bool,
    pub nounset: bool,
    pub pipefail: bool,
    pub xtrace: bool,
    pub verbose: bool,
    pub noglob: bool,
    pub noclobber: bool,
    pub noexec: bool,
    pub allexport: bool,
}

impl Flags {
    /// The string `$-` expands to.
    pub fn short_string(&self) -> String {
        let mut out = String::new();
        if self.allexport {
            out.push('a');
        }
        if self.errexit {
            out.push('e');
        }
        if self.noglob {
            out.push('f');
        }
        if self.noclobber {
            out.push('C');
        }
        if self.noexec {
            out.push('n');
        }
        if self.nounset {
            out.push('u');
        }
        if self.verbose {
            out.push('v');
        }
        if self.xtrace {
            out.push('x');
        }
        out.push('h');
        out.push('B');
        out
    }
}

/// `shopt` options.
#[derive(Debug, Clone, Copy)]
pub struct Shopts {
    pub extglob: bool,
    pub dotglob: bool,
    pub nullglob: bool,
    pub failglob: bool,
    pub globstar: bool,
    pub nocaseglob: bool,
    pub nocasematch: bool,
    pub expand_aliases: bool,
    pub lastpipe: bool,
}

impl Default for Shopts {
    fn default() -> Self {
        Self {
            extglob: false,
            dotglob: false,
            nullglob: false,
            failglob: false,
            globstar: false,
            nocaseglob: false,
            nocasematch: false,
            // Scripts here are sandbox snippets, not login shells; alias
            // definitions are expected to take effect.
            expand_aliases: true,
            lastpipe: false,
        }
    }
}

/// One function-call scope holding `local` bindings. A binding of `None`
/// is a declared-but-unset local that still shadows outer values.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub vars: HashMap<String, Option<Var>>,
}

/// The complete mutable shell state for one execution.
#[derive(Debug, Clone)]
pub struct Env {
    globals: HashMap<String, Var>,
    scopes: Vec<Frame>,

    pub aliases: HashMap<String, String>,
    pub functions: HashMap<String, FuncDef>,
    pub flags: Flags,
    pub shopts: Shopts,

    pub cwd: String,
    pub prev_dir: String,
    pub dir_stack: Vec<String>,

    pub script_name: String,
    pub positionals: Vec<String>,
    pub last_status: i32,
    pub last_arg: String,
    pub pipe_status: Vec<i32>,
    pub rematch: Vec<String>,
    pub line: usize,

    pub func_stack: Vec<String>,
    pub source_stack: Vec<String>,
    pub source_depth: u32,

    pub traps: HashMap<String, String>,
    /// Deferred `>(cmd)` bodies: (temp path, script) pairs drained after
    /// the consuming command finishes.
    pub pending_out_procs: Vec<(String, crate::syntax::ast::Script)>,
    /// Monotonic counter for process-substitution temp files.
    pub psub_seq: u64,
    /// True while running an `if`/`while`/`until` condition (errexit is
    /// suppressed there).
    pub in_condition: bool,
    /// Diagnostics produced during expansion (command substitution
    /// stderr, arithmetic warnings); drained into the owning command's
    /// stderr.
    pub expansion_stderr: String,
    /// Exit status of the most recent command substitution within the
    /// command currently expanding; assignment-only commands adopt it.
    pub last_sub_status: Option<i32>,
    /// Consumable input buffer for `read` inside pipelines, groups, and
    /// redirected loops; `read` writes the unread remainder back.
    pub group_stdin: Option<String>,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            globals: HashMap::new(),
            scopes: Vec::new(),
            aliases: HashMap::new(),
            functions: HashMap::new(),
            flags: Flags::default(),
            shopts: Shopts::default(),
            cwd: "/".to_string(),
            prev_dir: "/".to_string(),
            dir_stack: Vec::new(),
            script_name: "bash".to_string(),
            positionals: Vec::new(),
            last_status: 0,
            last_arg: String::new(),
            pipe_status: Vec::new(),
            rematch: Vec::new(),
            line: 1,
            func_stack: Vec::new(),
            source_stack: Vec::new(),
            source_depth: 0,
            traps: HashMap::new(),
            pending_out_procs: Vec::new(),
            psub_seq: 0,
            in_condition: false,
            expansion_stderr: String::new(),
            last_sub_status: None,
            group_stdin: None,
        }
    }
}

impl Env {
    // -----------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------

    /// Find a variable, innermost scope first.
    pub fn get(&self, name: &str) -> Option<&Var> {
        for frame in self.scopes.iter().rev() {
            if let Some(slot) = frame.vars.get(name) {
                return slot.as_ref();
            }
        }
        self.globals.get(name)
    }

    /// Scalar rendering of a variable, with the dynamic specials
    /// resolved.
    pub fn get_str(&self, name: &str) -> Option<String> {
        match name {
            "?" => return Some(self.last_status.to_string()),
            "#" => return Some(self.positionals.len().to_string()),
            "$" => return Some("1000".to_string()),
            "!" => return Some("0".to_string()),
            "-" => return Some(self.flags.short_string()),
            "_" => return Some(self.last_arg.clone()),
            "0" => return Some(self.script_name.clone()),
            "LINENO" => return Some(self.line.to_string()),
            "PWD" => return Some(self.cwd.clone()),
            "OLDPWD" => return Some(self.prev_dir.clone()),
            "FUNCNAME" => return self.func_stack.last().cloned(),
            _ => {}
        }
        if let Ok(n) = name.parse::<usize>() {
            return self.positionals.get(n - 1).cloned();
        }
        self.get(name).map(|v| v.value.as_scalar())
    }

    pub fn is_set(&self, name: &str) -> bool {
        match name {
            "?" | "#" | "$" | "!" | "-" | "_" | "0" | "@" | "*" => true,
            _ => {
                if let Ok(n) = name.parse::<usize>() {
                    return n >= 1 && n <= self.positionals.len();
                }
                self.get(name).is_some()
            }
        }
    }

    /// Names visible in this environment with the given prefix, sorted.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .globals
            .keys()
            .chain(self.scopes.iter().flat_map(|f| f.vars.keys()))
            .filter(|n| n.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    // -----------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------

    /// Whether assignment to `name` must be rejected.
    pub fn is_readonly(&self, name: &str) -> bool {
        self.get(name).map(|v| v.attrs.readonly).unwrap_or(false)
    }

    /// Assign a variable, honouring scope shadowing and attributes.
    pub fn set_var(&mut self, name: &str, value: Value) {
        for frame in self.scopes.iter_mut().rev() {
            if let Some(slot) = frame.vars.get_mut(name) {
                let attrs = slot.as_ref().map(|v| v.attrs).unwrap_or_default();
                *slot = Some(Var {
                    value: apply_case_attrs(value, attrs),
                    attrs,
                });
                return;
            }
        }
        let attrs = self
            .globals
            .get(name)
            .map(|v| v.attrs)
            .unwrap_or(VarAttrs {
                exported: self.flags.allexport,
                ..Default::default()
            });
        self.globals.insert(
            name.to_string(),
            Var {
                value: apply_case_attrs(value, attrs),
                attrs,
            },
        );
    }

    pub fn set_str(&mut self, name: &str, value: impl Into<String>) {
        self.set_var(name, Value::Str(value.into()));
    }

    /// Assign one element of an indexed array, promoting a scalar to an
    /// array when needed.
    pub fn set_index(&mut self, name: &str, index: i64, value: String) {
        let mut map = match self.get(name).map(|v| v.value.clone()) {
            Some(Value::Indexed(map)) => map,
            Some(Value::Assoc(map)) => {
                let mut assoc = map;
                assoc.insert(index.to_string(), value);
                self.set_var(name, Value::Assoc(assoc));
                return;
            }
            Some(Value::Str(s)) => {
                let mut map = BTreeMap::new();
                if !s.is_empty() {
                    map.insert(0, s);
                }
                map
            }
            None => BTreeMap::new(),
        };
        map.insert(index, value);
        self.set_var(name, Value::Indexed(map));
    }

    /// Assign one key of an associative array.
    pub fn set_key(&mut self, name: &str, key: &str, value: String) {
        let mut map = match self.get(name).map(|v| v.value.clone()) {
            Some(Value::Assoc(map)) => map,
            Some(Value::Indexed(map)) => map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            Some(Value::Str(s)) => {
                let mut map = IndexMap::new();
                if !s.is_empty() {
                    map.insert("0".to_string(), s);
                }
                map
            }
            None => IndexMap::new(),
        };
        map.insert(key.to_string(), value);
        self.set_var(name, Value::Assoc(map));
    }

    /// Write a variable back exactly as captured (value and attributes),
    /// through the same scope routing as a plain assignment.
    pub fn put_var(&mut self, name: &str, var: Var) {
        for frame in self.scopes.iter_mut().rev() {
            if let Some(slot) = frame.vars.get_mut(name) {
                *slot = Some(var);
                return;
            }
        }
        self.globals.insert(name.to_string(), var);
    }

    /// Declare a local binding in the current (innermost) scope.
    pub fn declare_local(&mut self, name: &str, value: Option<Var>) -> bool {
        match self.scopes.last_mut() {
            Some(frame) => {
                frame.vars.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn in_function(&self) -> bool {
        !self.scopes.is_empty()
    }

    pub fn unset(&mut self, name: &str) {
        for frame in self.scopes.iter_mut().rev() {
            if let Some(slot) = frame.vars.get_mut(name) {
                *slot = None;
                return;
            }
        }
        self.globals.remove(name);
    }

    pub fn set_attr(&mut self, name: &str, f: impl FnOnce(&mut VarAttrs)) {
        for frame in self.scopes.iter_mut().rev() {
            if let Some(Some(var)) = frame.vars.get_mut(name) {
                f(&mut var.attrs);
                return;
            }
        }
        let var = self
            .globals
            .entry(name.to_string())
            .or_insert_with(|| Var::scalar(""));
        f(&mut var.attrs);
    }

    // -----------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------

    pub fn push_scope(&mut self) {
        self.scopes.push(Frame::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// Flat name→scalar map handed to command plugins.
    pub fn as_string_map(&self) -> HashMap<String, String> {
        let mut out: HashMap<String, String> = self
            .globals
            .iter()
            .map(|(k, v)| (k.clone(), v.value.as_scalar()))
            .collect();
        for frame in &self.scopes {
            for (name, slot) in &frame.vars {
                match slot {
                    Some(var) => {
                        out.insert(name.clone(), var.value.as_scalar());
                    }
                    None => {
                        out.remove(name);
                    }
                }
            }
        }
        out.insert("PWD".to_string(), self.cwd.clone());
        out.insert("OLDPWD".to_string(), self.prev_dir.clone());
        out
    }

    /// Only the exported portion, for `env`-style listings.
    pub fn exported_map(&self) -> HashMap<String, String> {
        self.globals
            .iter()
            .filter(|(_, v)| v.attrs.exported)
            .map(|(k, v)| (k.clone(), v.value.as_scalar()))
            .collect()
    }

    /// Iterate global variables (for `declare -p` and `export` listings).
    pub fn globals_iter(&self) -> impl Iterator<Item = (&String, &Var)> {
        self.globals.iter()
    }
}

/// Apply `declare -l`/`-u` transforms on assignment.
fn apply_case_attrs(value: Value, attrs: VarAttrs) -> Value {
    if !attrs.lowercase && !attrs.uppercase {
        return value;
    }
    let fix = |s: String| {
        if attrs.lowercase {
            s.to_lowercase()
        } else {
            s.to_uppercase()
        }
    };
    match value {
        Value::Str(s) => Value::Str(fix(s)),
        Value::Indexed(map) => Value::Indexed(map.into_iter().map(|(k, v)| (k, fix(v))).collect()),
        Value::Assoc(map) => Value::Assoc(map.into_iter().map(|(k, v)| (k, fix(v))).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_set_get() {
        let mut env = Env::default();
        env.set_str("GREETING", "hello");
        assert_eq!(env.get_str("GREETING"), Some("hello".to_string()));
        assert_eq!(env.get_str("MISSING"), None);
    }

    #[test]
    fn test_local_shadows_global() {
        let mut env = Env::default();
        env.set_str("x", "outer");
        env.push_scope();
        env.declare_local("x", Some(Var::scalar("inner")));
        assert_eq!(env.get_str("x"), Some("inner".to_string()));
        env.set_str("x", "inner2");
        assert_eq!(env.get_str("x"), Some("inner2".to_string()));
        env.pop_scope();
        assert_eq!(env.get_str("x"), Some("outer".to_string()));
    }

    #[test]
    fn test_plain_assignment_in_function_without_local_hits_global() {
        let mut env = Env::default();
        env.set_str("x", "outer");
        env.push_scope();
        env.set_str("x", "changed");
        env.pop_scope();
        assert_eq!(env.get_str("x"), Some("changed".to_string()));
    }

    #[test]
    fn test_declared_unset_local_shadows() {
        let mut env = Env::default();
        env.set_str("x", "outer");
        env.push_scope();
        env.declare_local("x", None);
        assert_eq!(env.get_str("x"), None);
        assert!(!env.is_set("x"));
        env.pop_scope();
        assert!(env.is_set("x"));
    }

    #[test]
    fn test_positionals_and_specials() {
        let mut env = Env::default();
        env.positionals = vec!["a".to_string(), "b".to_string()];
        env.last_status = 3;
        assert_eq!(env.get_str("1"), Some("a".to_string()));
        assert_eq!(env.get_str("2"), Some("b".to_string()));
        assert_eq!(env.get_str("3"), None);
        assert_eq!(env.get_str("#"), Some("2".to_string()));
        assert_eq!(env.get_str("?"), Some("3".to_string()));
    }

    #[test]
    fn test_indexed_array_order() {
        let mut env = Env::default();
        let mut map = BTreeMap::new();
        map.insert(5, "five".to_string());
        map.insert(1, "one".to_string());
        env.set_var("a", Value::Indexed(map));
        let var = env.get("a").unwrap();
        assert_eq!(var.value.elements(), vec!["one", "five"]);
        assert_eq!(var.value.keys(), vec!["1", "5"]);
        assert_eq!(var.value.as_scalar(), "one");
    }

    #[test]
    fn test_assoc_insertion_order() {
        let mut env = Env::default();
        let mut map = IndexMap::new();
        map.insert("zeta".to_string(), "1".to_string());
        map.insert("alpha".to_string(), "2".to_string());
        env.set_var("m", Value::Assoc(map));
        assert_eq!(env.get("m").unwrap().value.keys(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_case_attrs_apply_on_assignment() {
        let mut env = Env::default();
        env.set_attr("shout", |a| a.uppercase = true);
        env.set_str("shout", "quiet");
        assert_eq!(env.get_str("shout"), Some("QUIET".to_string()));
    }

    #[test]
    fn test_names_with_prefix_sorted() {
        let mut env = Env::default();
        env.set_str("VAR_B", "1");
        env.set_str("VAR_A", "2");
        env.set_str("OTHER", "3");
        assert_eq!(env.names_with_prefix("VAR_"), vec!["VAR_A", "VAR_B"]);
    }

    #[test]
    fn test_clone_isolation() {
        let mut env = Env::default();
        env.set_str("x", "base");
        let mut copy = env.clone();
        copy.set_str("x", "copy");
        copy.cwd = "/elsewhere".to_string();
        assert_eq!(env.get_str("x"), Some("base".to_string()));
        assert_eq!(env.cwd, "/");
    }
}
