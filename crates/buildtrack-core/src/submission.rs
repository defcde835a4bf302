//! # Final Submission
//!
//! Assembles the copyable submission text once every stage is complete.
//!
//! `WorkflowSnapshot::all_completed` is the only admission check; the links
//! are validated for shape but never fetched.

use crate::aggregate::WorkflowSnapshot;
use crate::TrackError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Links the user provides on the proof view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofLinks {
    pub lovable_project: String,
    pub github_repository: String,
    pub deployment_url: String,
}

impl ProofLinks {
    /// Check every link is an absolute http(s) URL with a host.
    pub fn validate(&self) -> Result<(), TrackError> {
        for (label, raw) in self.labelled() {
            validate_link(label, raw)?;
        }
        Ok(())
    }

    fn labelled(&self) -> [(&'static str, &str); 3] {
        [
            ("Lovable Project", self.lovable_project.as_str()),
            ("GitHub Repository", self.github_repository.as_str()),
            ("Deployment URL", self.deployment_url.as_str()),
        ]
    }
}

fn validate_link(label: &str, raw: &str) -> Result<(), TrackError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TrackError::InvalidLink(format!("{} is required", label)));
    }
    let parsed = Url::parse(raw)
        .map_err(|e| TrackError::InvalidLink(format!("{} '{}': {}", label, raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(TrackError::InvalidLink(format!(
            "{} '{}' must be an http(s) URL",
            label, raw
        )));
    }
    Ok(())
}

/// Submission text builder.
pub struct Submission;

impl Submission {
    /// Compose the submission, or fail with `SubmissionLocked` while any
    /// stage lacks an artifact.
    pub fn compose(snapshot: &WorkflowSnapshot, links: &ProofLinks) -> Result<String, TrackError> {
        if !snapshot.submission_enabled() {
            return Err(TrackError::SubmissionLocked {
                pending: snapshot.pending_ids(),
            });
        }
        links.validate()?;

        let mut out = String::new();
        out.push_str("Build Track Final Submission\n");
        out.push_str("============================\n");
        for (label, raw) in links.labelled() {
            out.push_str(&format!("{}: {}\n", label, raw.trim()));
        }
        out.push('\n');
        out.push_str("Steps:\n");
        for entry in &snapshot.entries {
            out.push_str(&format!(
                "  [x] {} {} ({})\n",
                entry.stage.id, entry.stage.title, entry.state.status
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{ProgressionEngine, StageStatus, WorkflowConfig};

    fn links() -> ProofLinks {
        ProofLinks {
            lovable_project: "https://lovable.dev/projects/abc".to_string(),
            github_repository: "https://github.com/jdoe/resumebuilder".to_string(),
            deployment_url: "https://resume.example.com".to_string(),
        }
    }

    fn engine(completed: usize) -> ProgressionEngine<MemoryStore> {
        let registry = WorkflowConfig::default().into_registry().unwrap();
        let mut engine = ProgressionEngine::new(registry, MemoryStore::new());
        for i in 0..completed {
            engine.record_artifact(i, "a").unwrap();
        }
        engine
    }

    #[test]
    fn locked_until_all_complete() {
        let snapshot = engine(7).snapshot().unwrap();
        match Submission::compose(&snapshot, &links()) {
            Err(TrackError::SubmissionLocked { pending }) => assert_eq!(pending, vec!["08"]),
            other => panic!("expected SubmissionLocked, got {:?}", other),
        }
    }

    #[test]
    fn composes_when_complete() {
        let mut engine = engine(8);
        engine.set_status(6, StageStatus::Error).unwrap();
        let text = Submission::compose(&engine.snapshot().unwrap(), &links()).unwrap();
        assert!(text.contains("GitHub Repository: https://github.com/jdoe/resumebuilder"));
        assert!(text.contains("[x] 01 Problem Discovery (success)"));
        assert!(text.contains("[x] 07 Test & Validate (error)"));
    }

    #[test]
    fn rejects_bad_links() {
        let snapshot = engine(8).snapshot().unwrap();

        let mut missing = links();
        missing.deployment_url = "  ".to_string();
        assert!(matches!(
            Submission::compose(&snapshot, &missing),
            Err(TrackError::InvalidLink(_))
        ));

        let mut relative = links();
        relative.github_repository = "github.com/jdoe".to_string();
        assert!(matches!(
            Submission::compose(&snapshot, &relative),
            Err(TrackError::InvalidLink(_))
        ));

        let mut ftp = links();
        ftp.lovable_project = "ftp://lovable.dev/x".to_string();
        assert!(matches!(
            Submission::compose(&snapshot, &ftp),
            Err(TrackError::InvalidLink(_))
        ));
    }
}
