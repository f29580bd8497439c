// FLV tag queue and egress byte-stream framing

mod egress;
mod queue;
mod tag;
mod writer;

pub use egress::*;
pub use queue::*;
pub use tag::*;
pub use writer::*;
