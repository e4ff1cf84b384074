/// Authentication and authorization
///
/// - `password`: Argon2id password hashing and verification
/// - `jwt`: JWT access/refresh token creation and validation
/// - `policy`: Pure permission checks for team, project, and task operations

pub mod jwt;
pub mod password;
pub mod policy;
