//! Courses, enrollments, assignments and feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub syllabus: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    pub faculty: Option<i64>,
    pub faculty_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Course {
    /// "CS101 - Intro to Programming"
    pub fn title(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }

    pub fn faculty_display(&self) -> &str {
        self.faculty_name.as_deref().unwrap_or("Unassigned")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student: i64,
    pub course: i64,
    pub course_detail: Option<Course>,
    pub enrollment_num: String,
    pub enrolled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub course: i64,
    pub course_name: Option<String>,
    pub faculty: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn due_display(&self) -> String {
        match self.due_date {
            Some(due) => due.format("%b %d, %Y %H:%M").to_string(),
            None => "No due date".to_string(),
        }
    }
}

/// Body for creating an assignment.
#[derive(Debug, Clone, Serialize)]
pub struct NewAssignment {
    pub course: i64,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyllabusUpdate {
    pub course_id: i64,
    pub syllabus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub user: Option<i64>,
    pub comment: String,
    pub rating: u8,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFeedback {
    pub comment: String,
    pub rating: u8,
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) => items,
            Listing::Page { results } => results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enrollment_with_course_detail() {
        let json = r#"{
            "id": 3, "student": 7, "course": 1, "enrollment_num": "ENR-2024-001",
            "enrolled_at": "2024-07-01T09:30:00.123456Z",
            "course_detail": {
                "id": 1, "name": "Data Structures", "code": "CS201", "syllabus": "",
                "description": "Trees and graphs", "department": "CSE", "faculty": 2,
                "faculty_name": "Dr. Mehta", "created_at": "2024-06-01T00:00:00Z",
                "updated_at": "2024-06-02T00:00:00+05:30"
            }
        }"#;
        let enrollment: Enrollment = serde_json::from_str(json).unwrap();
        let course = enrollment.course_detail.unwrap();
        assert_eq!(course.title(), "CS201 - Data Structures");
        assert_eq!(course.faculty_display(), "Dr. Mehta");
        assert_eq!(
            course.updated_at.unwrap().to_rfc3339(),
            "2024-06-01T18:30:00+00:00"
        );
    }

    #[test]
    fn test_assignment_due_display() {
        let json = r#"{"id": 1, "course": 1, "course_name": "DS", "faculty": 2, "title": "HW1", "content": "Read ch. 1", "due_date": "2024-09-15T17:00:00Z", "created_at": null, "updated_at": null}"#;
        let assignment: Assignment = serde_json::from_str(json).unwrap();
        assert_eq!(assignment.due_display(), "Sep 15, 2024 17:00");

        let undated = Assignment {
            due_date: None,
            ..assignment
        };
        assert_eq!(undated.due_display(), "No due date");
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<i64> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);

        let page: Listing<i64> =
            serde_json::from_str(r#"{"count": 2, "next": null, "results": [3, 4]}"#).unwrap();
        assert_eq!(page.into_vec(), vec![3, 4]);
    }

    #[test]
    fn test_new_assignment_skips_missing_due_date() {
        let body = serde_json::to_value(NewAssignment {
            course: 1,
            title: "HW2".into(),
            content: "Exercises".into(),
            due_date: None,
        })
        .unwrap();
        assert!(body.get("due_date").is_none());
    }
}
