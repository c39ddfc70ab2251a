//! Core types for Kino Kernel

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a kernel instance, attached to its log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelId(pub Uuid);

impl KernelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KernelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KernelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kernel lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelState {
    /// Engine created, surface attached, error relay bound
    Active,
    /// Engine torn down; no further operations are accepted
    Destroyed,
}

impl KernelState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: KernelState) -> bool {
        matches!((self, target), (KernelState::Active, KernelState::Destroyed))
    }
}

impl std::fmt::Display for KernelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelState::Active => write!(f, "active"),
            KernelState::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert!(KernelState::Active.can_transition_to(KernelState::Destroyed));
        assert!(!KernelState::Destroyed.can_transition_to(KernelState::Active));
        assert!(!KernelState::Destroyed.can_transition_to(KernelState::Destroyed));
    }

    #[test]
    fn test_kernel_ids_are_unique() {
        assert_ne!(KernelId::new(), KernelId::new());
    }
}
