//! Trust score adjustments tied to status transitions.
//!
//! Only staff-driven transitions move the owner's score: entering Resolved
//! rewards the reporter, entering Defected penalizes them. Every other edge,
//! including leaving those statuses again, is unscored. The score is a single
//! unbounded scalar on the user record with no history of deltas.

use crate::config::CampusConfig;
use crate::domain::{Role, Status, User};

#[derive(Debug, Clone, Copy)]
pub struct TrustScoreLedger {
    resolved_reward: f64,
    defected_penalty: f64,
}

impl TrustScoreLedger {
    pub fn new(resolved_reward: f64, defected_penalty: f64) -> Self {
        Self {
            resolved_reward,
            defected_penalty,
        }
    }

    pub fn from_config(config: &CampusConfig) -> Self {
        Self::new(config.resolved_reward(), config.defected_penalty())
    }

    /// Score change for a transition, if any.
    pub fn delta(&self, from: Status, to: Status, actor: Role) -> Option<f64> {
        if from == to || !actor.is_staff() {
            return None;
        }
        match to {
            Status::Resolved => Some(self.resolved_reward),
            Status::Defected => Some(-self.defected_penalty),
            _ => None,
        }
    }

    /// Apply a delta to the owner. No clamping.
    pub fn apply(&self, owner: &mut User, delta: f64) {
        owner.trust_score += delta;
    }
}

impl Default for TrustScoreLedger {
    fn default() -> Self {
        Self::from_config(&CampusConfig::default())
    }
}
