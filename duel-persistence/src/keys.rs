use duel_types::UserId;

/// Ordered list of joinable public room summaries.
pub const PUBLIC_ROOMS_KEY: &str = "public_rooms";
/// Every room id ever created and not yet swept.
pub const ROOM_INDEX_KEY: &str = "room_index";

pub fn user_key(user_id: &UserId) -> String {
    format!("user:{user_id}")
}

pub fn room_key(room_id: &str) -> String {
    format!("room:{room_id}")
}

pub fn history_key(user_id: &UserId) -> String {
    format!("history:{user_id}")
}
