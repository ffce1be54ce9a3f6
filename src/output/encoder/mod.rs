mod encoder;
mod human;
mod json;

pub use encoder::{Encodable, Encoder};
pub use human::HumanReadableEncoder;
pub use json::JsonEncoder;
