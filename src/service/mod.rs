pub mod cache;
pub mod google;
pub mod opd;
pub mod permissions;
pub mod records;
pub mod resources;
pub mod upload;
