/// API route handlers
///
/// - `health`: Health check
/// - `auth`: Registration, login, token refresh
/// - `users`: User listing for roster assembly
/// - `teams`: Teams and membership
/// - `projects`: Projects within a team
/// - `tasks`: Task graph operations

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod teams;
pub mod users;
