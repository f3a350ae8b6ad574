//! Volunteer scanner: decides which rows still need a match.

use crate::store::VolunteerRow;

/// Why a volunteer row is or is not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    /// No status yet: ask the oracle.
    Pending,
    /// Name or email blank: never touched.
    Incomplete,
    /// Status already set by an earlier run.
    AlreadyProcessed,
}

pub fn classify(volunteer: &VolunteerRow) -> ScanVerdict {
    if volunteer.name.trim().is_empty() || volunteer.email.trim().is_empty() {
        ScanVerdict::Incomplete
    } else if !volunteer.status.trim().is_empty() {
        ScanVerdict::AlreadyProcessed
    } else {
        ScanVerdict::Pending
    }
}

/// Profile line handed to the oracle.
pub fn build_profile(volunteer: &VolunteerRow) -> String {
    format!(
        "Name: {}, Skills: {}, Exp: {}, Avail: {}",
        volunteer.name, volunteer.skills, volunteer.experience, volunteer.availability
    )
}
