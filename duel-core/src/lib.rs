pub mod cleanup;
pub mod room_state;
pub mod scoring;
pub mod stats;
pub mod turn_clock;

// Re-export main components
pub use cleanup::*;
pub use room_state::*;
pub use scoring::*;
pub use stats::*;
pub use turn_clock::*;
