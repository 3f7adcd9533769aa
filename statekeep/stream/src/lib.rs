//! Typed sequential byte streams used for savestates and input movies.
//!
//! A [`Serializer`] writes primitives one after another; a [`Deserializer`]
//! reads them back in the same order. There is no framing beyond the
//! per-field length prefixes, so readers must know the layout they expect.

pub mod de;
pub mod error;
pub mod ser;

pub use de::Deserializer;
pub use error::StreamError;
pub use ser::Serializer;

/// Largest string or blob accepted by either side of a stream.
pub const MAX_FIELD_LEN: usize = 16 * (1 << 20);

/// Something that can write its full state into a stream and restore it later.
pub trait Serializable {
    /// Writes the current state into `out`.
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError>;
    /// Replaces the current state with one read from `input`.
    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError>;
}
