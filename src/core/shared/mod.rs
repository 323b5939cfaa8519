pub mod enums;
pub mod error;
pub mod jsonb;
pub mod money;
pub mod schema;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod utils;

pub use error::ApiError;
pub use utils::{create_pool, run_migrations, with_conn, DbConn, DbPool};
