pub mod config;
pub mod diff;
pub mod history;
pub mod hook;
pub mod new;
pub mod prompt;
pub mod pull;
pub mod push;
pub mod scripts;
pub mod show;
pub mod status;
