//! External collaborators: metadata store (Mongo) and object store (MinIO/S3)

pub mod mongo;
pub mod object;
pub mod uri;

pub use mongo::{MongoRunTracker, RunHandle, RunTracker};
pub use object::{ObjectStore, ObjectStoreSpec, S3ObjectStore};
pub use uri::{build_mongo_url, mask_uri, MongoSpec};
