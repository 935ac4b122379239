pub mod database;
pub mod remote;
pub mod settings;
pub mod sources;
