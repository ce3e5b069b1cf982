//! Workflow transition resolution by display name.

use crate::jira::TransitionCandidate;

/// Finds the id of the transition called `desired` among `available`.
///
/// Names compare case-insensitively; the first match in service order wins.
/// Candidates without a name are skipped. A missing or blank `desired`
/// resolves to `None` without looking at the candidates.
pub fn resolve_transition(available: &[TransitionCandidate], desired: Option<&str>) -> Option<u64> {
    let desired = desired.filter(|name| !name.trim().is_empty())?;

    available
        .iter()
        .find(|candidate| {
            candidate
                .name
                .as_deref()
                .is_some_and(|name| eq_ignore_case(name, desired))
        })
        .map(|candidate| candidate.id)
}

// Unicode-aware; "ÉTAT" matches "état".
fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
