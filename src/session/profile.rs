//! Learner profile cache

use crate::api::{LearnerProfile, TutorApi};
use serde::{Deserialize, Serialize};

/// Holds the latest known learner profile.
///
/// Every fetch replaces the cached value wholesale. Fetch failures never
/// reach the caller: profile display is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileCache {
    profile: Option<LearnerProfile>,
}

impl ProfileCache {
    pub fn current(&self) -> Option<&LearnerProfile> {
        self.profile.as_ref()
    }

    /// Fetch and replace the cached profile. Returns whether it was updated.
    pub async fn refresh<A: TutorApi + ?Sized>(&mut self, api: &A, user_id: &str) -> bool {
        match api.profile(user_id).await {
            Ok(profile) => {
                tracing::debug!(
                    %user_id,
                    knowledge_level = %profile.knowledge_level,
                    known_concepts = profile.known_concepts.len(),
                    weak_areas = profile.weak_areas.len(),
                    "Learner profile refreshed"
                );
                self.profile = Some(profile);
                true
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to fetch profile");
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.profile = None;
    }
}
