mod queries;
pub mod sqlite_mirror_store;

pub use sqlite_mirror_store::SqliteMirrorStore;
