use crate::models::job::Job;
use crate::models::parsed_resume::AcademicSnapshot;

/// Academic attributes a job's constraints are checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcademicProfile<'a> {
    pub gpa: Option<f64>,
    pub batch: Option<&'a str>,
    pub branch: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobConstraints<'a> {
    pub min_gpa: Option<f64>,
    pub allowed_batches: &'a [String],
    pub allowed_branches: &'a [String],
}

impl<'a> From<&'a AcademicSnapshot> for AcademicProfile<'a> {
    fn from(snapshot: &'a AcademicSnapshot) -> Self {
        Self {
            gpa: snapshot.gpa,
            batch: snapshot.batch.as_deref(),
            branch: snapshot.branch.as_deref(),
        }
    }
}

impl<'a> From<&'a Job> for JobConstraints<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            min_gpa: job.min_gpa,
            allowed_batches: &job.allowed_batches,
            allowed_branches: &job.allowed_branches,
        }
    }
}

fn same(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// An empty allow-list admits everyone, a missing value never matches a non-empty one.
fn admitted(value: Option<&str>, allowed: &[String]) -> bool {
    let allowed: Vec<&str> = allowed
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if allowed.is_empty() {
        return true;
    }
    match value {
        Some(value) => allowed.iter().any(|a| same(a, value)),
        None => false,
    }
}

/// Missing or non-finite GPA counts as 0.
pub fn is_eligible(profile: &AcademicProfile<'_>, job: &JobConstraints<'_>) -> bool {
    if let Some(min_gpa) = job.min_gpa {
        let gpa = profile.gpa.filter(|g| g.is_finite()).unwrap_or(0.0);
        if gpa < min_gpa {
            return false;
        }
    }
    admitted(profile.batch, job.allowed_batches) && admitted(profile.branch, job.allowed_branches)
}
