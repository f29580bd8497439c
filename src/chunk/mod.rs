// Chunk stream layer: transport buffering and message reassembly

mod byte_reader;
mod demux;

pub use byte_reader::*;
pub use demux::*;
