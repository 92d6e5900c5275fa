pub mod alumni;
pub mod employment;
pub mod file;
pub mod response;
pub mod user;

pub use alumni::{
    AlumniEmploymentSummary, AlumniRecord, CreateAlumniRequest, GraduationYearReport,
    UpdateAlumniRequest,
};
pub use employment::{
    CreateEmploymentRequest, EmploymentRecord, LifecycleParseError, LifecycleState,
    UpdateEmploymentRequest,
};
pub use file::{UploadFileParams, UploadedFile};
pub use response::{ApiResponse, ErrorResponse, ListMeta};
pub use user::{LoginRequest, LoginResponse, Role, RoleParseError, UserAccount};
