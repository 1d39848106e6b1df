//! Execution Governor
//!
//! Every command dispatch, loop iteration, and plugin inner loop is
//! charged against a bounded counter here. Saturating any counter makes
//! the next charge fail with a [`LimitBreach`], which the interpreter
//! converts into the engine-reserved exit code. The governor is the
//! engine's single cancellation signal: there is no external token, and
//! a breach unwinds every interpreter frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Reserved exit code for scripts terminated by a limit breach.
pub const LIMIT_EXIT_CODE: i32 = 125;

/// Which budget a plugin draws from when it charges per-record work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginBudget {
    Awk,
    Sed,
    Jq,
}

/// Configured ceilings for one shell instance.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_call_depth: u64,
    pub max_command_count: u64,
    pub max_loop_iterations: u64,
    pub max_awk_iterations: u64,
    pub max_sed_iterations: u64,
    pub max_jq_iterations: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_command_count: 100_000,
            max_loop_iterations: 1_000_000,
            max_awk_iterations: 1_000_000,
            max_sed_iterations: 1_000_000,
            max_jq_iterations: 100_000,
        }
    }
}

/// A saturated counter: names the limit that was hit and its ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitBreach {
    pub limit: &'static str,
    pub max: u64,
}

impl LimitBreach {
    pub fn message(&self) -> String {
        format!(
            "maximum {} ({}) exceeded (possible runaway script)",
            self.limit, self.max
        )
    }
}

/// Shared mutable counters. Cloneable handle; all clones charge the same
/// budgets.
#[derive(Clone)]
pub struct Governor {
    inner: Arc<Counters>,
}

struct Counters {
    limits: Limits,
    commands: AtomicU64,
    loop_iterations: AtomicU64,
    call_depth: AtomicU64,
    awk_iterations: AtomicU64,
    sed_iterations: AtomicU64,
    jq_iterations: AtomicU64,
}

impl Governor {
    pub fn new(limits: Limits) -> Self {
        Self {
            inner: Arc::new(Counters {
                limits,
                commands: AtomicU64::new(0),
                loop_iterations: AtomicU64::new(0),
                call_depth: AtomicU64::new(0),
                awk_iterations: AtomicU64::new(0),
                sed_iterations: AtomicU64::new(0),
                jq_iterations: AtomicU64::new(0),
            }),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.inner.limits
    }

    /// Zero every counter. Called at the top of each `exec`.
    pub fn reset(&self) {
        self.inner.commands.store(0, Ordering::Relaxed);
        self.inner.loop_iterations.store(0, Ordering::Relaxed);
        self.inner.call_depth.store(0, Ordering::Relaxed);
        self.inner.awk_iterations.store(0, Ordering::Relaxed);
        self.inner.sed_iterations.store(0, Ordering::Relaxed);
        self.inner.jq_iterations.store(0, Ordering::Relaxed);
    }

    fn charge(counter: &AtomicU64, max: u64, limit: &'static str) -> Result<(), LimitBreach> {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if n > max {
            Err(LimitBreach { limit, max })
        } else {
            Ok(())
        }
    }

    /// Admit one command dispatch.
    pub fn charge_command(&self) -> Result<(), LimitBreach> {
        Self::charge(
            &self.inner.commands,
            self.inner.limits.max_command_count,
            "command count",
        )
    }

    /// Admit one loop iteration (while/until/for, shell level).
    pub fn charge_loop(&self) -> Result<(), LimitBreach> {
        Self::charge(
            &self.inner.loop_iterations,
            self.inner.limits.max_loop_iterations,
            "loop iterations",
        )
    }

    /// Admit one plugin-internal iteration against the named budget.
    pub fn charge_plugin(&self, budget: PluginBudget) -> Result<(), LimitBreach> {
        match budget {
            PluginBudget::Awk => Self::charge(
                &self.inner.awk_iterations,
                self.inner.limits.max_awk_iterations,
                "awk iterations",
            ),
            PluginBudget::Sed => Self::charge(
                &self.inner.sed_iterations,
                self.inner.limits.max_sed_iterations,
                "sed iterations",
            ),
            PluginBudget::Jq => Self::charge(
                &self.inner.jq_iterations,
                self.inner.limits.max_jq_iterations,
                "jq iterations",
            ),
        }
    }

    /// Enter a function call or sourced script; the returned guard pops
    /// the depth on drop, so early unwinds cannot leak depth.
    pub fn enter_call(&self) -> Result<CallGuard, LimitBreach> {
        let depth = self.inner.call_depth.fetch_add(1, Ordering::Relaxed) + 1;
        if depth > self.inner.limits.max_call_depth {
            self.inner.call_depth.fetch_sub(1, Ordering::Relaxed);
            return Err(LimitBreach {
                limit: "call depth",
                max: self.inner.limits.max_call_depth,
            });
        }
        Ok(CallGuard {
            governor: self.clone(),
        })
    }

    pub fn call_depth(&self) -> u64 {
        self.inner.call_depth.load(Ordering::Relaxed)
    }
}

/// Scope guard from [`Governor::enter_call`].
pub struct CallGuard {
    governor: Governor,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.governor.inner.call_depth.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(max: u64) -> Governor {
        Governor::new(Limits {
            max_call_depth: max,
            max_command_count: max,
            max_loop_iterations: max,
            max_awk_iterations: max,
            max_sed_iterations: max,
            max_jq_iterations: max,
        })
    }

    #[test]
    fn test_command_budget_exhausts() {
        let gov = tiny(3);
        assert!(gov.charge_command().is_ok());
        assert!(gov.charge_command().is_ok());
        assert!(gov.charge_command().is_ok());
        let err = gov.charge_command().unwrap_err();
        assert_eq!(err.limit, "command count");
        assert_eq!(err.max, 3);
    }

    #[test]
    fn test_loop_budget_separate_from_commands() {
        let gov = tiny(2);
        assert!(gov.charge_command().is_ok());
        assert!(gov.charge_loop().is_ok());
        assert!(gov.charge_loop().is_ok());
        assert!(gov.charge_loop().is_err());
        // Command budget still has room.
        assert!(gov.charge_command().is_ok());
    }

    #[test]
    fn test_call_guard_restores_depth() {
        let gov = tiny(2);
        {
            let _a = gov.enter_call().unwrap();
            let _b = gov.enter_call().unwrap();
            assert!(gov.enter_call().is_err());
            assert_eq!(gov.call_depth(), 2);
        }
        assert_eq!(gov.call_depth(), 0);
        assert!(gov.enter_call().is_ok());
    }

    #[test]
    fn test_reset_clears_counters() {
        let gov = tiny(1);
        let _ = gov.charge_command();
        assert!(gov.charge_command().is_err());
        gov.reset();
        assert!(gov.charge_command().is_ok());
    }

    #[test]
    fn test_plugin_budgets_named() {
        let gov = tiny(1);
        assert!(gov.charge_plugin(PluginBudget::Sed).is_ok());
        let err = gov.charge_plugin(PluginBudget::Sed).unwrap_err();
        assert_eq!(err.limit, "sed iterations");
        assert!(gov.charge_plugin(PluginBudget::Jq).is_ok());
    }

    #[test]
    fn test_breach_message_names_limit() {
        let gov = tiny(0);
        let err = gov.charge_command().unwrap_err();
        assert!(err.message().contains("command count"));
        assert!(err.message().contains("(0)"));
    }
}
