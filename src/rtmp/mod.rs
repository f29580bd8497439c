// RTMP protocol utilities

mod command;
mod constants;
mod handshake;
mod messages;
mod packet;

pub use command::*;
pub use constants::*;
pub use handshake::*;
pub use messages::*;
pub use packet::*;
