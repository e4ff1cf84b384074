/// Database layer
///
/// - `pool`: PostgreSQL connection pool management
/// - `migrations`: Migration runner

pub mod migrations;
pub mod pool;
