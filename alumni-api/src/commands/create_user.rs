//! `create-user` command
//!
//! Seeds an account into one backend. There is no public registration
//! endpoint, so this is how the first admin gets in.

use anyhow::{bail, Context, Result};
use shared_types::{Role, UserAccount};
use std::io::BufRead;

use crate::services::Backend;

/// Environment variable checked for the new account's password
pub const PASSWORD_ENV: &str = "ALUMNI_USER_PASSWORD";

/// Pick the password from the environment value if set, else one line of
/// `input`. Keeps the password out of the process arguments.
pub fn resolve_password(env_value: Option<String>, mut input: impl BufRead) -> Result<String> {
    if let Some(password) = env_value.filter(|v| !v.is_empty()) {
        return Ok(password);
    }

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("No password given: set {} or pipe it on stdin", PASSWORD_ENV);
    }
    Ok(password.to_string())
}

/// Create an account with a bcrypt-hashed password
///
/// # Arguments
/// * `backend` - Backend the account is written to
/// * `username` - Login name, unique within the backend
/// * `email` - Email address, unique within the backend
/// * `password` - Plain password, hashed before it is stored
/// * `role` - `admin` or `user`
pub async fn create_user(
    backend: &Backend,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<UserAccount> {
    let user = backend
        .users
        .register(username, email, password, role)
        .await
        .with_context(|| format!("Failed to create user '{}' in {} backend", username, backend.kind))?;

    tracing::info!(
        "Created user '{}' with role '{}' in {} backend (id {})",
        user.username,
        user.role,
        backend.kind,
        user.id
    );

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_password_from_env_wins() {
        let password =
            resolve_password(Some("from-env".to_string()), Cursor::new("from-stdin\n")).unwrap();
        assert_eq!(password, "from-env");
    }

    #[test]
    fn test_password_from_stdin() {
        let password = resolve_password(None, Cursor::new("s3cret pass\r\nignored\n")).unwrap();
        assert_eq!(password, "s3cret pass");

        let password = resolve_password(Some(String::new()), Cursor::new("fallback")).unwrap();
        assert_eq!(password, "fallback");
    }

    #[test]
    fn test_missing_password_is_rejected() {
        assert!(resolve_password(None, Cursor::new("")).is_err());
        assert!(resolve_password(None, Cursor::new("\n")).is_err());
    }
}
