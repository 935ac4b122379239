#[cfg(feature = "desktop")]
pub mod commands;
pub mod dto;
#[cfg(feature = "desktop")]
pub mod events;
pub mod handlers;
