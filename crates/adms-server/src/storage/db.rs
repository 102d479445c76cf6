//! Database handle for the ADMS server.

pub use adms_core::db::DatabaseError;

adms_core::define_database!(AdmsDatabase, "ADMS database migrations complete");
