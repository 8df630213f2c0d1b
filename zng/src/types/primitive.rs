//! The fixed primitive table.
//!
//! Primitive IDs are part of the wire contract and never change.
use strum::{EnumIter, IntoEnumIterator};

/// Primitive type kinds, discriminant equal to the wire ID.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum Primitive {
    Bool = 0,
    Int8 = 1,
    Uint8 = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Int64 = 7,
    Uint64 = 8,
    Float64 = 9,
    Bytes = 10,
    String = 11,
    Bstring = 12,
    /// A bare enum index, encoded as an unsigned integer.
    Enum = 13,
    Ip = 14,
    /// A transport port, encoded as an unsigned integer.
    Port = 15,
    Net = 16,
    /// Nanoseconds since the Unix epoch.
    Time = 17,
    /// Signed nanoseconds.
    Duration = 18,
    Null = 19,
    /// A type value.
    Type = 20,
    Error = 21,
}

impl Primitive {
    /// Wire ID of this primitive.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Primitive::iter().find(|p| p.id() == id)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Primitive::iter().find(|p| p.to_str() == s)
    }

    pub fn to_str(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int8 => "int8",
            Primitive::Uint8 => "uint8",
            Primitive::Int16 => "int16",
            Primitive::Uint16 => "uint16",
            Primitive::Int32 => "int32",
            Primitive::Uint32 => "uint32",
            Primitive::Int64 => "int64",
            Primitive::Uint64 => "uint64",
            Primitive::Float64 => "float64",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
            Primitive::Bstring => "bstring",
            Primitive::Enum => "enum",
            Primitive::Ip => "ip",
            Primitive::Port => "port",
            Primitive::Net => "net",
            Primitive::Time => "time",
            Primitive::Duration => "duration",
            Primitive::Null => "null",
            Primitive::Type => "type",
            Primitive::Error => "error",
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::Int8 | Primitive::Int16 | Primitive::Int32 | Primitive::Int64
        )
    }

    /// Unsigned integers, including ports and bare enum indices.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::Uint8
                | Primitive::Uint16
                | Primitive::Uint32
                | Primitive::Uint64
                | Primitive::Port
                | Primitive::Enum
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        self == Primitive::Float64
    }

    pub fn is_number(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// `string` and `bstring`.
    pub fn is_stringy(self) -> bool {
        matches!(self, Primitive::String | Primitive::Bstring)
    }

    /// Bit width of integer kinds.
    pub fn int_width(self) -> Option<u32> {
        match self {
            Primitive::Int8 | Primitive::Uint8 => Some(8),
            Primitive::Int16 | Primitive::Uint16 | Primitive::Port => Some(16),
            Primitive::Int32 | Primitive::Uint32 => Some(32),
            Primitive::Int64 | Primitive::Uint64 | Primitive::Enum => Some(64),
            _ => None,
        }
    }

    /// The plain signed integer kind of the given width.
    pub fn signed_of_width(bits: u32) -> Self {
        match bits {
            0..=8 => Primitive::Int8,
            9..=16 => Primitive::Int16,
            17..=32 => Primitive::Int32,
            _ => Primitive::Int64,
        }
    }

    /// The plain unsigned integer kind of the given width.
    pub fn unsigned_of_width(bits: u32) -> Self {
        match bits {
            0..=8 => Primitive::Uint8,
            9..=16 => Primitive::Uint16,
            17..=32 => Primitive::Uint32,
            _ => Primitive::Uint64,
        }
    }

    /// Values of these kinds print without a `(type)` decorator.
    pub fn is_implied(self) -> bool {
        matches!(
            self,
            Primitive::Int64
                | Primitive::Float64
                | Primitive::Bool
                | Primitive::Bytes
                | Primitive::String
                | Primitive::Ip
                | Primitive::Net
                | Primitive::Time
                | Primitive::Duration
                | Primitive::Null
                | Primitive::Type
                | Primitive::Error
        )
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
