/// Database models
///
/// Each model owns its table's queries:
///
/// - `user`: User accounts and global roles
/// - `team`: Teams, rosters, and membership
/// - `project`: Projects scoped to a team
/// - `task`: Tasks and their relation tables

pub mod project;
pub mod task;
pub mod team;
pub mod user;
