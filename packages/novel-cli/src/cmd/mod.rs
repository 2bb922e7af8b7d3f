pub mod files;
pub mod search;
pub mod sources;
pub mod tasks;
