use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for API types
    let mut types = Vec::new();

    // User types
    types.push(clean_type(Role::export_to_string()?));
    types.push(clean_type(UserAccount::export_to_string()?));
    types.push(clean_type(LoginRequest::export_to_string()?));
    types.push(clean_type(LoginResponse::export_to_string()?));

    // Alumni types
    types.push(clean_type(AlumniRecord::export_to_string()?));
    types.push(clean_type(CreateAlumniRequest::export_to_string()?));
    types.push(clean_type(UpdateAlumniRequest::export_to_string()?));
    types.push(clean_type(AlumniEmploymentSummary::export_to_string()?));
    types.push(clean_type(GraduationYearReport::export_to_string()?));

    // Employment types
    types.push(clean_type(LifecycleState::export_to_string()?));
    types.push(clean_type(EmploymentRecord::export_to_string()?));
    types.push(clean_type(CreateEmploymentRequest::export_to_string()?));
    types.push(clean_type(UpdateEmploymentRequest::export_to_string()?));

    // File types
    types.push(clean_type(UploadedFile::export_to_string()?));
    types.push(clean_type(UploadFileParams::export_to_string()?));

    // Envelope types
    types.push(clean_type(ListMeta::export_to_string()?));
    types.push(clean_type(ApiResponse::<()>::export_to_string()?));
    types.push(clean_type(ErrorResponse::export_to_string()?));

    let output_dir = Path::new("../web/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Check if the type definition includes imports (like LoginResponse which imports UserAccount)
    let lines: Vec<&str> = type_def.lines().collect();
    let has_import = lines
        .iter()
        .any(|line| line.trim().starts_with("import type"));

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            // Keep import lines if they're part of a type definition
            if trimmed.starts_with("import type") {
                return has_import;
            }
            // Filter out the generated comment line
            !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .cloned()
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
