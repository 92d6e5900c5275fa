use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One graduate
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct AlumniRecord {
    pub id: String,
    pub user_id: String,
    pub student_number: String,
    pub name: String,
    pub department: String,
    pub cohort_year: i32,
    pub graduation_year: i32,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateAlumniRequest {
    pub user_id: String,
    pub student_number: String,
    pub name: String,
    pub department: String,
    pub cohort_year: i32,
    pub graduation_year: i32,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateAlumniRequest {
    pub name: Option<String>,
    pub department: Option<String>,
    pub cohort_year: Option<i32>,
    pub graduation_year: Option<i32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl UpdateAlumniRequest {
    pub fn apply_to(&self, record: &mut AlumniRecord) {
        if let Some(v) = &self.name {
            record.name = v.clone();
        }
        if let Some(v) = &self.department {
            record.department = v.clone();
        }
        if let Some(v) = self.cohort_year {
            record.cohort_year = v;
        }
        if let Some(v) = self.graduation_year {
            record.graduation_year = v;
        }
        if let Some(v) = &self.email {
            record.email = v.clone();
        }
        if let Some(v) = &self.phone {
            record.phone = Some(v.clone());
        }
        if let Some(v) = &self.address {
            record.address = Some(v.clone());
        }
    }
}

/// One row of the graduation-year report: an alumnus joined with one job
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct AlumniEmploymentSummary {
    pub alumni_id: String,
    pub department: String,
    pub graduation_year: i32,
    pub industry: String,
    pub company_name: String,
    pub job_title: String,
    pub salary_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GraduationYearReport {
    pub graduation_year: i32,
    pub salary_threshold: i64,
    /// Entries whose minimum salary parses and meets the threshold
    pub above_threshold: usize,
    pub entries: Vec<AlumniEmploymentSummary>,
}
