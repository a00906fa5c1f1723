pub mod call_log;
pub mod labour;
pub mod message;
pub mod post;
