//! Response envelope decoding.
//!
//! Every endpoint answers `{code, msg, data}`; HTTP 200 is common even for
//! application errors, so callers branch on `code` only after this module
//! has turned the envelope into a `Result`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::{ClientError, TaskStatus};

#[derive(Debug, Deserialize)]
pub(crate) struct RawEnvelope {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Value,
}

impl RawEnvelope {
    /// Decode `data` into `T`, or surface the rejection verbatim.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        if self.code != 0 {
            return Err(ClientError::rejected(self.code, self.msg));
        }
        if self.data.is_null() {
            return Err(ClientError::Decode("success response without data".into()));
        }
        serde_json::from_value(self.data).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Like `into_data`, but a null `data` is `None`.
    pub fn into_optional_data<T: DeserializeOwned>(self) -> Result<Option<T>, ClientError> {
        if self.code == 0 && self.data.is_null() {
            return Ok(None);
        }
        self.into_data().map(Some)
    }

    /// Check the code and ignore `data`.
    pub fn into_unit(self) -> Result<(), ClientError> {
        if self.code != 0 {
            return Err(ClientError::rejected(self.code, self.msg));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTaskData {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
    #[serde(default = "queued")]
    pub task_status: TaskStatus,
}

fn queued() -> TaskStatus {
    TaskStatus::Queued
}

/// Status `data` is either the bare status string or an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusData {
    Plain(TaskStatus),
    #[serde(rename_all = "camelCase")]
    Object { task_status: TaskStatus },
}

impl StatusData {
    pub fn into_status(self) -> TaskStatus {
        match self {
            StatusData::Plain(status) | StatusData::Object { task_status: status } => status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadData {
    pub file_name: String,
}

/// Task ids are long numeric strings; some responses send them as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
