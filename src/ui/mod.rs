pub mod commands;
pub mod dashboard;
pub mod notice;
pub mod table;
