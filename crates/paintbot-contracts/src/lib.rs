pub mod catalog;
pub mod chat;
pub mod events;
pub mod menus;
pub mod runs;
