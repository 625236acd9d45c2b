/// Write health as seen by the event pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthState {
    #[default]
    Unknown,
    Healthy,
    Failing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Tracks write failures and surfaces one warning per failure episode.
///
/// A failure stays pending until the next checkpoint takes it, even if a
/// later write succeeds.
#[derive(Debug, Clone, Default)]
pub struct WriteHealth {
    state: HealthState,
    pending: bool,
}

impl WriteHealth {
    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn record_success(&mut self) {
        self.state = HealthState::Healthy;
    }

    pub fn record_failure(&mut self) {
        self.state = HealthState::Failing;
        self.pending = true;
    }

    /// Returns the warning once per unreported failure, then re-arms.
    pub fn take_notification(&mut self) -> Option<Notification> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        if self.state == HealthState::Failing {
            self.state = HealthState::Unknown;
        }
        Some(Notification {
            title: "TTrack: usage store unreachable".to_string(),
            message: "Token tracking is paused. Check the ttrack server and its store configuration."
                .to_string(),
        })
    }
}
