//! Interpreter Engine
//!
//! Everything between a parsed [`crate::syntax::ast::Script`] and its
//! final `{stdout, stderr, status}`: the tree walker, the environment,
//! pipelines, redirections, dispatch, `[[ ]]` evaluation, and the
//! builtin suite. Word expansion lives in [`crate::expand`] as `impl`
//! blocks on the same walker.

pub mod builtins;
mod condexpr;
mod dispatch;
pub mod env;
pub mod flow;
pub mod fsbridge;
mod pipeline;
mod redirect;
pub mod walker;

pub use env::Env;
pub use flow::{Exec, Flow, FlowKind, Output};
pub use fsbridge::SyncFs;
pub use walker::Walker;
