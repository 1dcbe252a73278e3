//! Authentication provider boundary.
//!
//! The client treats the student id as an opaque string supplied by an
//! external auth provider. Submission requires one; there is no silent
//! fallback.

/// Supplies the currently signed-in student's id, if any.
pub trait StudentAuth: Send + Sync {
    fn current_student_id(&self) -> Option<String>;
}

/// Fixed auth source for the binary and tests.
pub struct FixedAuth {
    student_id: Option<String>,
}

impl FixedAuth {
    pub fn signed_in(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { student_id: None }
    }
}

impl StudentAuth for FixedAuth {
    fn current_student_id(&self) -> Option<String> {
        self.student_id.clone()
    }
}
