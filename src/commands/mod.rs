pub mod catalog;
pub mod validate;
pub mod verify;
