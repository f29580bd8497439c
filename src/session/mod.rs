// Per-connection RTMP session: state machine, command handling, media relay

mod capabilities;
mod commands;
mod connect;
mod control;
mod driver;
mod invoke;
mod media;
mod publish;
mod runtime;
mod status;
mod write;

pub use capabilities::*;
pub use commands::*;
pub use connect::*;
pub use control::*;
pub use driver::*;
pub use invoke::*;
pub use media::*;
pub use publish::*;
pub use runtime::*;
pub use status::*;
pub use write::*;
