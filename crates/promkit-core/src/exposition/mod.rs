//! Text exposition format (the pull collector's wire contract).
//!
//! ```text
//! # HELP <name> <help>
//! # TYPE <name> <counter|gauge|histogram|summary>
//! <name> <value>
//! <name>_bucket{le="<bound>"} <cumulative count>
//! <name>{quantile="<φ>"} <value>
//! <name>_sum <value>
//! <name>_count <value>
//! ```
//!
//! Encoding is a pure function of the snapshot slice: the same input always
//! yields byte-identical output.

mod text;

pub use text::{encode, encode_bytes, encode_to, format_float, TEXT_CONTENT_TYPE};
