use serde::{Deserialize, Serialize};

/// Lifecycle of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceState {
    Unconfigured,
    Configured,
    Initialized,
    Started,
    Stopped,
    Destroyed,
}

impl SourceState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &SourceState) -> bool {
        use SourceState::*;

        matches!(
            (self, target),
            // Configuration may be replaced until the transport is opened
            (Unconfigured, Configured) |
            (Configured, Configured) |

            (Configured, Initialized) |

            (Initialized, Started) |
            (Started, Stopped) |
            (Stopped, Started) |

            // A stopped source may be reconfigured and reopened
            (Stopped, Configured) |

            (Unconfigured, Destroyed) |
            (Configured, Destroyed) |
            (Initialized, Destroyed) |
            (Started, Destroyed) |
            (Stopped, Destroyed)
        )
    }

    /// Acquisition may be switched on from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Initialized | Self::Stopped)
    }

    /// Get human-readable state name
    pub fn name(&self) -> &str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::Configured => "Configured",
            Self::Initialized => "Initialized",
            Self::Started => "Started",
            Self::Stopped => "Stopped",
            Self::Destroyed => "Destroyed",
        }
    }
}

impl Default for SourceState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_before_initialize() {
        assert!(!SourceState::Unconfigured.can_transition_to(&SourceState::Initialized));
        assert!(SourceState::Unconfigured.can_transition_to(&SourceState::Configured));
        assert!(SourceState::Configured.can_transition_to(&SourceState::Initialized));
    }

    #[test]
    fn test_start_stop_alternate() {
        assert!(SourceState::Initialized.can_transition_to(&SourceState::Started));
        assert!(SourceState::Started.can_transition_to(&SourceState::Stopped));
        assert!(SourceState::Stopped.can_transition_to(&SourceState::Started));
        assert!(!SourceState::Configured.can_transition_to(&SourceState::Started));
    }

    #[test]
    fn test_destroyed_is_terminal() {
        for target in [
            SourceState::Configured,
            SourceState::Initialized,
            SourceState::Started,
            SourceState::Stopped,
        ] {
            assert!(!SourceState::Destroyed.can_transition_to(&target));
        }
        assert!(SourceState::Started.can_transition_to(&SourceState::Destroyed));
    }
}
