use std::sync::Arc;

use uuid::Uuid;

use crate::database::{Stores, StudentStore};
use crate::error::{Error, Result};
use crate::models::student::{NewStudent, Role, Student};

#[derive(Debug, Clone, Default)]
pub struct StudentProfile {
    pub name: Option<String>,
    pub email: String,
    pub branch: Option<String>,
    pub gpa: Option<f64>,
    pub batch: Option<String>,
}

#[derive(Clone)]
pub struct StudentService {
    students: Arc<dyn StudentStore>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StudentService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            students: stores.students.clone(),
        }
    }

    /// Creates the student or refreshes the profile of the one with this email.
    /// Fields left out keep their stored value; the role is never changed here.
    pub async fn upsert_profile(&self, profile: StudentProfile) -> Result<Student> {
        let email = profile.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::BadRequest("a valid email is required".to_string()));
        }
        if let Some(gpa) = profile.gpa {
            if !(0.0..=10.0).contains(&gpa) {
                return Err(Error::BadRequest("gpa must be between 0 and 10".to_string()));
            }
        }

        let student = self
            .students
            .upsert(NewStudent {
                name: clean(profile.name),
                email,
                role: Role::Student,
                branch: clean(profile.branch),
                gpa: profile.gpa,
                batch: clean(profile.batch),
            })
            .await?;
        tracing::info!(student_id = %student.id, "student profile saved");
        Ok(student)
    }

    pub async fn get(&self, id: Uuid) -> Result<Student> {
        self.students
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))
    }
}
