//! Cross-messenger transport abstraction (port + wire types).

pub mod port;
pub mod types;
