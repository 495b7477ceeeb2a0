//! Wire protocol spoken with the board.
//!
//! Every frame is one JSON object on one line:
//!
//! ```text
//! host -> device: {"msg_type":1,"led":true,"fan":false}
//! device -> host: {"msg_type":0,"led":true,"fan":false,"temp":23.5,"hum":41.0}
//! ```
//!
//! [`LineCodec`] splits the byte stream into lines and [`Frame`] turns a line
//! into a typed message. Decoding is split in two so that a malformed frame
//! costs one line and never the stream.

pub mod codec;
pub mod frame;

pub use codec::LineCodec;
pub use frame::{Frame, FrameError, MessageType};
