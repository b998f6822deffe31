pub mod analyze;
pub mod compare;
pub mod generate;
pub mod init;
pub mod integrity;
pub mod rank;
pub mod score;
pub mod validate;
