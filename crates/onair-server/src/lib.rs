pub mod chat;
pub mod http;
pub mod logging;
pub mod proxy;
