pub mod player_registry;

pub use player_registry::MasterRegistry;
