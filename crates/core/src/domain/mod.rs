pub mod cart;
pub mod catalog;
pub mod conversation;
pub mod purchase;
pub mod tool;
