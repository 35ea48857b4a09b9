pub mod card;
pub mod draft_state;
