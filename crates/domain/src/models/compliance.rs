//! Closed compliance-flag enumeration emitted by the EVV verification engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceFlag {
    Compliant,
    GeofenceViolation,
    TimeGap,
    LocationSuspicious,
    ManualOverride,
    MissingSignature,
    LateSubmission,
    Amended,
}

impl ComplianceFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceFlag::Compliant => "COMPLIANT",
            ComplianceFlag::GeofenceViolation => "GEOFENCE_VIOLATION",
            ComplianceFlag::TimeGap => "TIME_GAP",
            ComplianceFlag::LocationSuspicious => "LOCATION_SUSPICIOUS",
            ComplianceFlag::ManualOverride => "MANUAL_OVERRIDE",
            ComplianceFlag::MissingSignature => "MISSING_SIGNATURE",
            ComplianceFlag::LateSubmission => "LATE_SUBMISSION",
            ComplianceFlag::Amended => "AMENDED",
        }
    }
}

/// Severity drives the verification-level derivation in §4.4: no issues →
/// FULL; at least one HIGH → PARTIAL; at least one CRITICAL → EXCEPTION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    Low,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationIssue {
    pub flag: ComplianceFlag,
    pub severity: IssueSeverity,
    pub message: String,
    #[serde(default)]
    pub requires_supervisor_review: bool,
}

/// Declaration order doubles as severity order: FULL < PARTIAL < EXCEPTION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationLevel {
    Full,
    Partial,
    Exception,
}

impl VerificationLevel {
    pub fn derive(issues: &[VerificationIssue]) -> Self {
        if issues.iter().any(|i| i.severity == IssueSeverity::Critical) {
            VerificationLevel::Exception
        } else if issues.iter().any(|i| i.severity == IssueSeverity::High) {
            VerificationLevel::Partial
        } else {
            VerificationLevel::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationLevel::Full => "FULL",
            VerificationLevel::Partial => "PARTIAL",
            VerificationLevel::Exception => "EXCEPTION",
        }
    }
}

pub fn requires_supervisor_review(issues: &[VerificationIssue]) -> bool {
    issues.iter().any(|i| i.requires_supervisor_review)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: IssueSeverity) -> VerificationIssue {
        VerificationIssue {
            flag: ComplianceFlag::GeofenceViolation,
            severity,
            message: "test".into(),
            requires_supervisor_review: false,
        }
    }

    #[test]
    fn no_issues_is_full() {
        assert_eq!(VerificationLevel::derive(&[]), VerificationLevel::Full);
    }

    #[test]
    fn high_issue_is_partial() {
        let issues = [issue(IssueSeverity::High)];
        assert_eq!(VerificationLevel::derive(&issues), VerificationLevel::Partial);
    }

    #[test]
    fn critical_issue_is_exception_even_with_high_present() {
        let issues = [issue(IssueSeverity::High), issue(IssueSeverity::Critical)];
        assert_eq!(
            VerificationLevel::derive(&issues),
            VerificationLevel::Exception
        );
    }

    #[test]
    fn supervisor_review_flag_propagates() {
        let mut flagged = issue(IssueSeverity::High);
        flagged.requires_supervisor_review = true;
        assert!(requires_supervisor_review(&[flagged]));
        assert!(!requires_supervisor_review(&[issue(IssueSeverity::Low)]));
    }
}
