pub mod sync_commands;
