pub mod auth;
pub mod auto_apply;
pub mod client;
pub mod greenhouse;
pub mod jobs;
pub mod profile;
