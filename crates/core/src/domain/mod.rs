pub mod command;
pub mod membership;
pub mod selection;
