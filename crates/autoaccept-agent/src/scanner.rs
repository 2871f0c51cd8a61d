//! Element discovery helpers built on [`PageInspector`].

use std::collections::HashSet;

use tracing::debug;

use crate::error::InspectError;
use crate::inspector::{ElementHandle, PageInspector};
use crate::profile::IdeProfile;

/// Candidates for all selectors, deduplicated by handle, first occurrence
/// order kept.
pub async fn collect_candidates(
    inspector: &dyn PageInspector,
    selectors: &[String],
) -> Result<Vec<ElementHandle>, InspectError> {
    let found = inspector.find_candidates(selectors).await?;
    let mut seen = HashSet::with_capacity(found.len());
    Ok(found.into_iter().filter(|h| seen.insert(*h)).collect())
}

/// Try each selector group in order and return the first non-empty result.
///
/// A group that fails to evaluate counts as empty.
pub async fn first_matching_set(
    inspector: &dyn PageInspector,
    groups: &[String],
) -> Vec<ElementHandle> {
    for group in groups {
        match collect_candidates(inspector, std::slice::from_ref(group)).await {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => {}
            Err(e) => debug!("Selector group {} failed: {}", group, e),
        }
    }
    Vec::new()
}

/// Whether a feedback badge ("Good"/"Bad") is visible, meaning the focused
/// conversation has concluded.
pub async fn has_feedback_badge(
    inspector: &dyn PageInspector,
    profile: &IdeProfile,
) -> Result<bool, InspectError> {
    let badges = inspector
        .query(std::slice::from_ref(&profile.badge_selector))
        .await?;
    Ok(badges
        .iter()
        .any(|b| profile.badge_texts.iter().any(|t| t == b.text.trim())))
}

/// Whether the editor shows compile errors: a problem counter with a
/// positive count, or error squiggles.
pub async fn has_compilation_errors(
    inspector: &dyn PageInspector,
    profile: &IdeProfile,
) -> Result<bool, InspectError> {
    let counters = inspector
        .query(std::slice::from_ref(&profile.error_badges))
        .await?;
    if counters.iter().any(|c| leading_count(&c.text) > 0) {
        return Ok(true);
    }
    let squiggles = inspector
        .find_candidates(std::slice::from_ref(&profile.error_squiggles))
        .await?;
    Ok(!squiggles.is_empty())
}

/// Integer prefix of a counter label; 0 when there is none.
fn leading_count(text: &str) -> u64 {
    let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
