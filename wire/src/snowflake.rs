use std::fmt;

use uuid::Uuid;

/// Length of a snowflake in bytes.
pub const SNOWFLAKE_SIZE: usize = 16;

/// A 16-byte fragment identifier assigned to each packet and shared by all
/// of its chunks. Freshly generated snowflakes come from a cryptographically
/// seeded UUID source.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Snowflake([u8; SNOWFLAKE_SIZE]);

impl Snowflake {
    pub fn new() -> Self {
        Snowflake(Uuid::new_v4().into_bytes())
    }

    pub fn from_bytes(bytes: [u8; SNOWFLAKE_SIZE]) -> Self {
        Snowflake(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SNOWFLAKE_SIZE] {
        &self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snowflake({self})")
    }
}
