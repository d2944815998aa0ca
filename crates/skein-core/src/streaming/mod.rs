pub mod events;
pub mod fanin;

pub use events::{ConversationUpdateKind, UnifiedChatEvent};
pub use fanin::{Delivery, EventFanIn};
