/// Event contracts between the chat child views and their coordinator.
pub mod events;
pub mod message_input;
/// Transcript rendering: greeting, bubbles, formatted answers and the thinking row.
pub mod message_list;
pub mod scroll_manager;
pub mod sidebar;
pub mod view;

pub use events::Submit;
pub use message_input::MessageInput;
pub use message_list::{MessageList, MessageRow, RowContent};
pub use scroll_manager::ScrollManager;
pub use sidebar::{ChatSidebar, SidebarNewChatClicked, SidebarToggleClicked};
pub use view::ChatView;
