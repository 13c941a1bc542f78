pub mod db;
pub mod photos;

pub use db::DbAdapter;
pub use photos::LocalPhotoStorage;
