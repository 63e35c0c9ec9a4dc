//! Record stores and JSON output

pub mod output;
pub mod seed;
pub mod store;

// Re-export commonly used types
pub use output::{save_players_by_gender, write_json, OutputLayout};
pub use seed::load_seed_ids;
pub use store::PlayerStore;
