pub mod compare;
pub mod job;
pub mod video;
