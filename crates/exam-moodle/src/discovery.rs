//! Identity, course, and assignment enumeration calls.
//!
//! These three calls are the raw material of dynamic subject discovery: who
//! is the caller, which courses can they see, and what assignments do those
//! courses contain. Matching logic lives in the resolution engine — this
//! module only speaks the wire format.

use exam_core::MoodleToken;
use serde::Deserialize;

use crate::MoodleClient;
use crate::error::MoodleError;

/// Caller identity from `core_webservice_get_site_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    /// Moodle user id of the token's owner.
    pub userid: i64,
    /// Display name.
    #[serde(default)]
    pub fullname: String,
}

/// One enrolled course from `core_enrol_get_users_courses`.
#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(default)]
    pub shortname: String,
    /// External/institutional id — often carries the subject code.
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub fullname: String,
}

/// One assignment from `mod_assign_get_assignments`.
#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A course with its assignments, from `mod_assign_get_assignments`.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseAssignments {
    pub id: i64,
    #[serde(default)]
    pub shortname: String,
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Deserialize)]
struct AssignmentsResponse {
    #[serde(default)]
    courses: Vec<CourseAssignments>,
}

impl MoodleClient {
    /// Resolve the token to its owning user.
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError::Api`] for an invalid token,
    /// [`MoodleError::Http`] for transport failures.
    pub async fn get_site_info(&self, token: &MoodleToken) -> Result<SiteInfo, MoodleError> {
        let payload = self
            .ws_call(token, "core_webservice_get_site_info", &[])
            .await?;
        serde_json::from_value(payload).map_err(|e| MoodleError::Parse(e.to_string()))
    }

    /// Enumerate the courses a user is enrolled in.
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError`] if the call fails or the response cannot be
    /// parsed.
    pub async fn get_user_courses(
        &self,
        user_id: i64,
        token: &MoodleToken,
    ) -> Result<Vec<Course>, MoodleError> {
        let params = [("userid".to_string(), user_id.to_string())];
        let payload = self
            .ws_call(token, "core_enrol_get_users_courses", &params)
            .await?;
        serde_json::from_value(payload).map_err(|e| MoodleError::Parse(e.to_string()))
    }

    /// Fetch assignments for a set of courses, preserving Moodle's ordering.
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError`] if the call fails or the response cannot be
    /// parsed.
    pub async fn get_assignments(
        &self,
        course_ids: &[i64],
        token: &MoodleToken,
    ) -> Result<Vec<CourseAssignments>, MoodleError> {
        let params: Vec<(String, String)> = course_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (format!("courseids[{i}]"), id.to_string()))
            .collect();
        let payload = self
            .ws_call(token, "mod_assign_get_assignments", &params)
            .await?;
        let response: AssignmentsResponse =
            serde_json::from_value(payload).map_err(|e| MoodleError::Parse(e.to_string()))?;
        Ok(response.courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SITE_INFO_FIXTURE: &str = r#"{
        "sitename": "Example LMS",
        "username": "student",
        "fullname": "Test Student",
        "userid": 100,
        "siteurl": "https://lms.example.edu"
    }"#;

    const COURSES_FIXTURE: &str = r#"[
        {
            "id": 3,
            "shortname": "19AI405-AI",
            "idnumber": "19AI405",
            "fullname": "Fundamentals of Artificial Intelligence"
        },
        {
            "id": 4,
            "shortname": "ML-LAB",
            "idnumber": "",
            "fullname": "Machine Learning Laboratory"
        }
    ]"#;

    const ASSIGNMENTS_FIXTURE: &str = r#"{
        "courses": [
            {
                "id": 3,
                "shortname": "19AI405-AI",
                "idnumber": "19AI405",
                "assignments": [
                    {"id": 42, "name": "PART B and C ANSWER SCRIPT", "duedate": 0},
                    {"id": 43, "name": "Quiz Upload", "duedate": 0}
                ]
            },
            {
                "id": 4,
                "shortname": "ML-LAB",
                "idnumber": "",
                "assignments": []
            }
        ],
        "warnings": []
    }"#;

    #[test]
    fn parse_site_info() {
        let info: SiteInfo = serde_json::from_str(SITE_INFO_FIXTURE).unwrap();
        assert_eq!(info.userid, 100);
        assert_eq!(info.fullname, "Test Student");
    }

    #[test]
    fn parse_courses_tolerates_empty_idnumber() {
        let courses: Vec<Course> = serde_json::from_str(COURSES_FIXTURE).unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].idnumber, "19AI405");
        assert_eq!(courses[1].idnumber, "");
    }

    #[test]
    fn parse_assignments_preserves_order() {
        let response: AssignmentsResponse = serde_json::from_str(ASSIGNMENTS_FIXTURE).unwrap();
        assert_eq!(response.courses.len(), 2);

        let first = &response.courses[0];
        assert_eq!(first.id, 3);
        assert_eq!(first.assignments.len(), 2);
        assert_eq!(first.assignments[0].id, 42);
        assert_eq!(first.assignments[0].name, "PART B and C ANSWER SCRIPT");
        assert!(response.courses[1].assignments.is_empty());
    }
}
