pub mod deploy;
pub mod deployments;
pub mod jobs;
