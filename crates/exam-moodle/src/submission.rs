//! File upload and assignment submission calls.
//!
//! The submission pipeline is three Moodle calls in sequence: push the file
//! into the user's draft area, attach the draft to the assignment, then
//! submit for grading. The draft item id is the thread connecting them.

use exam_core::MoodleToken;
use serde_json::Value;

use crate::MoodleClient;
use crate::error::MoodleError;

impl MoodleClient {
    /// Upload file bytes into the caller's draft file area.
    ///
    /// Returns the draft `itemid` to pass to [`MoodleClient::save_submission`].
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError`] if the upload fails or the response carries no
    /// item id.
    pub async fn upload_draft_file(
        &self,
        token: &MoodleToken,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<i64, MoodleError> {
        let url = format!(
            "{}/webservice/upload.php?token={}",
            self.base_url(),
            urlencoding::encode(token.as_str())
        );

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| MoodleError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("filearea", "draft")
            .text("itemid", "0")
            .part("file_1", part);

        let resp = self.http.post(&url).multipart(form).send().await?;
        let payload = crate::http::read_payload(resp).await?;

        // Success shape: [{"itemid": 123, "filename": ..., ...}, ...]
        payload
            .as_array()
            .and_then(|files| files.first())
            .and_then(|file| file.get("itemid"))
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                MoodleError::Parse(format!("upload response carries no itemid: {payload}"))
            })
    }

    /// Attach a draft file area to an assignment submission.
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError`] if Moodle rejects the submission.
    pub async fn save_submission(
        &self,
        token: &MoodleToken,
        assignment_id: i64,
        draft_itemid: i64,
    ) -> Result<(), MoodleError> {
        let params = [
            ("assignmentid".to_string(), assignment_id.to_string()),
            (
                "plugindata[files_filemanager]".to_string(),
                draft_itemid.to_string(),
            ),
        ];
        let payload = self
            .ws_call(token, "mod_assign_save_submission", &params)
            .await?;
        check_warnings(&payload)
    }

    /// Finalize the submission for grading.
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError`] if Moodle rejects the call.
    pub async fn submit_for_grading(
        &self,
        token: &MoodleToken,
        assignment_id: i64,
    ) -> Result<(), MoodleError> {
        let params = [
            ("assignmentid".to_string(), assignment_id.to_string()),
            ("acceptsubmissionstatement".to_string(), "1".to_string()),
        ];
        let payload = self
            .ws_call(token, "mod_assign_submit_for_grading", &params)
            .await?;
        check_warnings(&payload)
    }
}

/// `mod_assign` write functions return `null` or a warnings array.
///
/// A non-empty warnings array is a rejection (e.g., submission statement not
/// accepted) dressed as a 200.
fn check_warnings(payload: &Value) -> Result<(), MoodleError> {
    let warnings = match payload {
        Value::Array(warnings) => warnings.as_slice(),
        _ => return Ok(()),
    };
    match warnings.first() {
        None => Ok(()),
        Some(warning) => Err(MoodleError::Api {
            code: warning
                .get("warningcode")
                .and_then(Value::as_str)
                .unwrap_or("warning")
                .to_string(),
            message: warning
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Moodle returned a warning")
                .to_string(),
        }),
    }
}
