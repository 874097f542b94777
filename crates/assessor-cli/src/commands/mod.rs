pub mod grade;
pub mod history;
pub mod init;
pub mod validate;
