// Persistence and transport codecs for the message model.
pub mod fixture;
pub mod text_file;
pub mod wire;

// Re-export commonly used items
pub use fixture::{DEFAULT_RHO, DEFAULT_WEALTH, example_input, example_problem};
pub use text_file::{ParseError, WriteError};
pub use wire::{DecodeError, WireDecode, WireEncode, decode_from_slice, encode_to_vec};
