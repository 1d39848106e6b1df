//! shellbox — an embeddable, sandboxed bash-style shell.
//!
//! Scripts parse to an AST, a tree-walking interpreter executes them
//! against a virtual filesystem, and a governor caps every command,
//! loop, and call so untrusted input cannot run away. No host processes
//! are ever spawned; network access exists only through an explicit
//! allow-list evaluator plus an embedder-supplied transport.

pub mod cmds;
pub mod engine;
pub mod expand;
pub mod governor;
pub mod net;
pub mod shell;
pub mod syntax;
pub mod vfs;

pub use cmds::{Invocation, Registry, Tool, ToolOutput};
pub use governor::{Governor, LimitBreach, Limits, LIMIT_EXIT_CODE};
pub use net::{DenyAll, FetchFn, FetchResponse, NetPolicy, UrlAllowList};
pub use shell::{ExecOutcome, ExecOverrides, Shell, ShellConfig};
pub use syntax::{parse, ParseError};
pub use vfs::{HostFs, MemFs, MountFs, OverlayFs, Vfs, VfsError};
