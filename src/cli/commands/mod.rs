pub mod add;
pub mod completions;
pub mod del;
pub mod generate;
pub mod get;
pub mod init;
pub mod list;
