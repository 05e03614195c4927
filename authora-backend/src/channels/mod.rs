pub mod dispatcher;
pub mod messages;
pub mod session;
pub mod telegram;
pub mod types;


pub use dispatcher::MessageDispatcher;
pub use telegram::start_telegram_listener;
