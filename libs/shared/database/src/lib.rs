pub mod postgrest;

pub use postgrest::DatastoreClient;
