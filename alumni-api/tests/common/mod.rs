#![allow(dead_code)]

use alumni_api::auth::Identity;
use alumni_api::config::{ApiConfig, AuthConfig, StorageConfig};
use alumni_api::services::{Backend, Backends};
use alumni_api::store::BackendKind;
use chrono::NaiveDate;
use shared_types::{AlumniRecord, CreateAlumniRequest, CreateEmploymentRequest, Role};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery";

/// Both backends on throwaway storage. Keep the `TempDir` alive for the test.
pub struct TestApp {
    pub dir: TempDir,
    pub backends: Backends,
}

pub fn test_config(dir: &TempDir) -> ApiConfig {
    ApiConfig {
        cors: None,
        server: None,
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            token_expiry_hours: 1,
            bcrypt_cost: 4,
        },
        storage: StorageConfig {
            database_path: Some(dir.path().join("alumni.sqlite3")),
            document_path: Some(dir.path().join("alumni-documents.json")),
            upload_dir: Some(dir.path().join("uploads")),
            query_timeout_secs: 10,
            max_upload_bytes: 2 * 1024 * 1024,
        },
    }
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let (backends, _documents) = alumni_api::open_backends(&config).unwrap();
    TestApp { dir, backends }
}

/// Accounts and one alumni record owned by `owner`
pub struct Fixture {
    pub admin: Identity,
    pub owner: Identity,
    pub other: Identity,
    pub alumni: AlumniRecord,
}

pub async fn register(backend: &Backend, username: &str, role: Role) -> Identity {
    let user = backend
        .users
        .register(username, &format!("{}@example.com", username), PASSWORD, role)
        .await
        .unwrap();
    Identity {
        user_id: user.id,
        username: user.username,
        role: user.role,
    }
}

pub async fn seed(backend: &Backend) -> Fixture {
    let admin = register(backend, "admin", Role::Admin).await;
    let owner = register(backend, "budi", Role::User).await;
    let other = register(backend, "sari", Role::User).await;

    let alumni = backend
        .alumni
        .create(&admin, &alumni_request(&owner.user_id, "2018001"))
        .await
        .unwrap();

    Fixture {
        admin,
        owner,
        other,
        alumni,
    }
}

pub fn alumni_request(user_id: &str, student_number: &str) -> CreateAlumniRequest {
    CreateAlumniRequest {
        user_id: user_id.to_string(),
        student_number: student_number.to_string(),
        name: "Budi Santoso".to_string(),
        department: "Informatics".to_string(),
        cohort_year: 2018,
        graduation_year: 2022,
        email: format!("{}@alumni.example.com", student_number),
        phone: None,
        address: None,
    }
}

pub fn employment_request(alumni_id: &str, company: &str) -> CreateEmploymentRequest {
    CreateEmploymentRequest {
        alumni_id: alumni_id.to_string(),
        company_name: company.to_string(),
        job_title: "Backend Engineer".to_string(),
        industry: "Technology".to_string(),
        work_location: "Jakarta".to_string(),
        salary_range: "5000000-7000000".to_string(),
        start_date: NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
        end_date: None,
        employment_status: "Full-time".to_string(),
        description: String::new(),
    }
}

pub const BACKENDS: [BackendKind; 2] = [BackendKind::Relational, BackendKind::Document];
