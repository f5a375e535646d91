pub mod history_repository;
pub mod profile_repository;
pub mod room_repository;

pub use history_repository::HistoryRepository;
pub use profile_repository::ProfileRepository;
pub use room_repository::RoomRepository;
