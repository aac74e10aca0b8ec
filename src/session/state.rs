//! Session state machine.

/// Represents the membership/liveness state of a shell session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Session participates in broadcasts.
    #[default]
    Active,
    /// Session is registered but excluded from broadcasts.
    Disabled,
    /// Session's connection is gone; excluded until reconnected or purged.
    Dead,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Active -> Disabled (`:disable`)
    /// - Disabled -> Active (`:enable`)
    /// - Active -> Dead, Disabled -> Dead (connection failure)
    /// - Dead -> Active (`:reconnect`)
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Active, Disabled)
                | (Disabled, Active)
                | (Active, Dead)
                | (Disabled, Dead)
                | (Dead, Active)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Invalid transitions leave the state unchanged and return `false`.
    /// Liveness changes are tolerant by design: enabling an already
    /// active session is a no-op, not an error.
    pub fn transition_to(&mut self, target: SessionState) -> bool {
        if self.can_transition_to(target) {
            *self = target;
            true
        } else {
            false
        }
    }

    /// Check if the session is eligible for broadcast dispatch.
    pub fn is_broadcast_eligible(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    /// Check if the session's connection is gone.
    pub fn is_dead(&self) -> bool {
        matches!(self, SessionState::Dead)
    }
}
