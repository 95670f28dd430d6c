//! Framing layer for the ELGAS2 gateway
//!
//! This crate turns raw wire bytes into envelopes and back:
//!
//! - `escape`: byte escaping of frame bodies
//! - `frame`: envelope layout with LRC / checksum / DRC trailer
//! - `codec`: the [`FrameCodec`] capability combining both
//! - `reader`: incremental frame reader over a transport
//! - `call`: the call to dispatching payload
//!
//! # TODO
//!
//! ## 帧层
//! - [x] 转义/反转义
//! - [x] 帧编码/解码（LRC、校验和、DRC）
//! - [x] CALL 负载解码（结构版本 2）
//! - [ ] CALL 结构版本 1（无序列号）

pub mod call;
pub mod codec;
pub mod escape;
pub mod frame;
pub mod reader;

pub use call::CallRequest;
pub use codec::{ElgasFrameCodec, FrameCodec};
pub use escape::{escape_characters, return_characters, ESCAPE};
pub use frame::{Addressing, DEFAULT_GROUP, Envelope, ETX, FRAME_ID, STX};
pub use reader::FrameReader;
