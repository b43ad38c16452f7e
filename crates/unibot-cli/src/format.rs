//! Plain-text rendering of API data for the terminal.

use unibot_core::models::{Assignment, ChatHistoryItem, Course, Enrollment, Feedback, User};

/// Width of the name column in course tables
const NAME_WIDTH: usize = 32;

/// Width of chat previews in history listings
const PREVIEW_WIDTH: usize = 60;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// The last `n` items, oldest first.
pub fn recent<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items[items.len().saturating_sub(n)..].to_vec()
}

pub fn user_summary(user: &User) -> String {
    let mut summary = format!("{} ({}, {})", user.display_name(), user.username, user.role);
    if let Some(ref department) = user.department {
        if !department.is_empty() {
            summary.push_str(&format!(" - {}", department));
        }
    }
    summary
}

pub fn course_table(courses: &[Course]) -> String {
    if courses.is_empty() {
        return "  (no courses)".to_string();
    }
    courses
        .iter()
        .map(|c| {
            format!(
                "  {:>4}  {:<10} {:<width$} {}",
                c.id,
                c.code,
                truncate_string(&c.name, NAME_WIDTH),
                c.faculty_display(),
                width = NAME_WIDTH
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn course_detail(course: &Course) -> String {
    let mut lines = vec![
        course.title(),
        format!("Faculty:    {}", course.faculty_display()),
    ];
    if !course.department.is_empty() {
        lines.push(format!("Department: {}", course.department));
    }
    if !course.description.is_empty() {
        lines.push(String::new());
        lines.push(course.description.clone());
    }
    lines.push(String::new());
    lines.push("Syllabus".to_string());
    if course.syllabus.is_empty() {
        lines.push("  (not published yet)".to_string());
    } else {
        lines.extend(course.syllabus.lines().map(|l| format!("  {}", l)));
    }
    lines.join("\n")
}

pub fn enrollment_table(enrollments: &[Enrollment]) -> String {
    if enrollments.is_empty() {
        return "  (no enrollments)".to_string();
    }
    enrollments
        .iter()
        .map(|e| {
            let course = e
                .course_detail
                .as_ref()
                .map(|c| c.title())
                .unwrap_or_else(|| format!("Course #{}", e.course));
            format!("  {:<16} {}", e.enrollment_num, course)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn assignment_table(assignments: &[Assignment]) -> String {
    if assignments.is_empty() {
        return "  (no assignments)".to_string();
    }
    assignments
        .iter()
        .map(|a| {
            format!(
                "  {:>4}  {:<24} {:<20} {}",
                a.id,
                truncate_string(&a.title, 24),
                truncate_string(a.course_name.as_deref().unwrap_or("-"), 20),
                a.due_display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn chat_history(items: &[ChatHistoryItem]) -> String {
    if items.is_empty() {
        return "  (no questions yet)".to_string();
    }
    items
        .iter()
        .map(|item| {
            let answer = item.answer().unwrap_or("(no answer)");
            format!(
                "  Q: {}\n  A: {}",
                truncate_string(&item.content, PREVIEW_WIDTH),
                truncate_string(answer, PREVIEW_WIDTH)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn feedback_list(feedback: &[Feedback]) -> String {
    if feedback.is_empty() {
        return "  (no feedback)".to_string();
    }
    feedback
        .iter()
        .map(|f| {
            let stars = "*".repeat(f.rating.min(5) as usize);
            format!("  {:<5} {}", stars, truncate_string(&f.comment, PREVIEW_WIDTH))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// DRF validation errors are `{"field": ["message", ...]}`; anything else is
/// shown as JSON.
pub fn validation_detail(detail: &serde_json::Value) -> String {
    match detail {
        serde_json::Value::Object(fields) => fields
            .iter()
            .map(|(field, messages)| {
                let text = match messages {
                    serde_json::Value::Array(items) => items
                        .iter()
                        .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                        .collect::<Vec<_>>()
                        .join(" "),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("  {}: {}", field, text)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::String(s) => format!("  {}", s),
        other => format!("  {}", other),
    }
}
