pub mod local_storage;
pub mod mysql;
