//! Run lifecycle state machine.

use tracing::trace;

/// Lifecycle state of a single supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RunState {
    /// Streams wired, process not yet started.
    #[default]
    Created,
    /// Process started and being drained.
    Running,
    /// Process exited before any deadline.
    Completed,
    /// Deadline passed first; the process has been killed.
    TimedOut,
    /// Outcome turned into the caller's result.
    Reduced,
}

impl RunState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Created -> Running
    /// - Running -> Completed
    /// - Running -> TimedOut
    /// - Completed -> Reduced
    /// - TimedOut -> Reduced
    pub(crate) fn can_transition_to(&self, target: RunState) -> bool {
        use RunState::*;
        matches!(
            (*self, target),
            (Created, Running)
                | (Running, Completed)
                | (Running, TimedOut)
                | (Completed, Reduced)
                | (TimedOut, Reduced)
        )
    }

    /// Move to `target`. The supervisor only drives valid transitions.
    pub(crate) fn transition_to(&mut self, target: RunState) {
        debug_assert!(
            self.can_transition_to(target),
            "invalid run state transition {:?} -> {:?}",
            self,
            target
        );
        trace!(from = ?self, to = ?target, "run state");
        *self = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_path() {
        let mut state = RunState::Created;
        state.transition_to(RunState::Running);
        state.transition_to(RunState::Completed);
        state.transition_to(RunState::Reduced);
        assert_eq!(state, RunState::Reduced);
    }

    #[test]
    fn test_timed_out_path() {
        let mut state = RunState::default();
        state.transition_to(RunState::Running);
        state.transition_to(RunState::TimedOut);
        assert!(!state.can_transition_to(RunState::Completed));
        state.transition_to(RunState::Reduced);
        assert_eq!(state, RunState::Reduced);
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!RunState::Created.can_transition_to(RunState::Completed));
        assert!(!RunState::Running.can_transition_to(RunState::Reduced));
        assert!(!RunState::Completed.can_transition_to(RunState::TimedOut));
        assert!(!RunState::TimedOut.can_transition_to(RunState::Completed));
        assert!(!RunState::Reduced.can_transition_to(RunState::Running));
    }

    #[test]
    fn test_default() {
        assert_eq!(RunState::default(), RunState::Created);
    }
}
