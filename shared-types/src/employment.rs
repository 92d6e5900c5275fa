use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Lifecycle of an employment record.
///
/// `Purged` is terminal and never observed on a stored record; it is the
/// state a record reaches once it is no longer addressable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Active,
    SoftDeleted,
    Purged,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "ACTIVE",
            LifecycleState::SoftDeleted => "SOFT_DELETED",
            LifecycleState::Purged => "PURGED",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle state: {0}")]
pub struct LifecycleParseError(pub String);

impl FromStr for LifecycleState {
    type Err = LifecycleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(LifecycleState::Active),
            "SOFT_DELETED" => Ok(LifecycleState::SoftDeleted),
            "PURGED" => Ok(LifecycleState::Purged),
            other => Err(LifecycleParseError(other.to_string())),
        }
    }
}

/// One job history entry for one alumnus
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct EmploymentRecord {
    pub id: String,
    pub alumni_id: String,
    pub company_name: String,
    pub job_title: String,
    pub industry: String,
    pub work_location: String,
    pub salary_range: String,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    pub employment_status: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub lifecycle_state: LifecycleState,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateEmploymentRequest {
    pub alumni_id: String,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub work_location: String,
    #[serde(default)]
    pub salary_range: String,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    pub employment_status: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateEmploymentRequest {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub work_location: Option<String>,
    pub salary_range: Option<String>,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    pub employment_status: Option<String>,
    pub description: Option<String>,
}

impl UpdateEmploymentRequest {
    pub fn apply_to(&self, record: &mut EmploymentRecord) {
        if let Some(v) = &self.company_name {
            record.company_name = v.clone();
        }
        if let Some(v) = &self.job_title {
            record.job_title = v.clone();
        }
        if let Some(v) = &self.industry {
            record.industry = v.clone();
        }
        if let Some(v) = &self.work_location {
            record.work_location = v.clone();
        }
        if let Some(v) = &self.salary_range {
            record.salary_range = v.clone();
        }
        if let Some(v) = self.start_date {
            record.start_date = v;
        }
        if let Some(v) = self.end_date {
            record.end_date = Some(v);
        }
        if let Some(v) = &self.employment_status {
            record.employment_status = v.clone();
        }
        if let Some(v) = &self.description {
            record.description = v.clone();
        }
    }
}
