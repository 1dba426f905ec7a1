use std::io::Read;

use super::PlyError;

/// Encoding of the PLY body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyFormat {
    /// Whitespace separated text, one element per line.
    Ascii,
    /// Packed little endian values.
    BinaryLittleEndian,
}

/// Scalar types allowed in a PLY property.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyDataType {
    /// `float` / `float32`
    Float32,
    /// `double` / `float64`
    Float64,
    /// `char` / `int8`
    Int8,
    /// `uchar` / `uint8`
    UInt8,
    /// `short` / `int16`
    Int16,
    /// `ushort` / `uint16`
    UInt16,
    /// `int` / `int32`
    Int32,
    /// `uint` / `uint32`
    UInt32,
}

impl PlyDataType {
    /// Parse a type name of the header.
    pub fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnsupportedProperty(type_str.to_string())),
        }
    }

    /// Size in bytes of one binary value.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// Read one little endian value, widened to `f64`.
    pub fn read_le<R: Read>(&self, reader: &mut R) -> Result<f64, PlyError> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf[..self.size()])?;
        let bytes = &buf;

        let value = match self {
            PlyDataType::Float32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            PlyDataType::Float64 => f64::from_le_bytes(buf),
            PlyDataType::Int8 => bytes[0] as i8 as f64,
            PlyDataType::UInt8 => bytes[0] as f64,
            PlyDataType::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            PlyDataType::UInt16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            PlyDataType::Int32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            PlyDataType::UInt32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        };
        Ok(value)
    }

    /// Parse one ASCII token, widened to `f64`.
    pub fn parse_ascii(&self, token: &str) -> Result<f64, PlyError> {
        let parsed = match self {
            PlyDataType::Float32 | PlyDataType::Float64 => token.parse::<f64>().ok(),
            _ => token.parse::<i64>().ok().map(|v| v as f64),
        };
        parsed.ok_or_else(|| PlyError::Parse(format!("invalid {self:?} value: {token}")))
    }
}

/// Shape of a property.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyPropertyKind {
    /// A single value.
    Scalar(PlyDataType),
    /// A length-prefixed list of values.
    List {
        /// Type of the length prefix.
        count: PlyDataType,
        /// Type of the list items.
        item: PlyDataType,
    },
}

/// A named property of an element.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PlyPropertyDefinition {
    /// The property name.
    pub name: String,
    /// The property shape.
    pub kind: PlyPropertyKind,
}

/// An element declaration, e.g. `element vertex 8`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PlyElement {
    /// The element name.
    pub name: String,
    /// Number of rows in the body.
    pub count: usize,
    /// The properties of each row, in file order.
    pub properties: Vec<PlyPropertyDefinition>,
}

impl PlyElement {
    /// Index of the property called `name`.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parsing() {
        assert_eq!(PlyDataType::parse("float").unwrap(), PlyDataType::Float32);
        assert_eq!(PlyDataType::parse("uchar").unwrap(), PlyDataType::UInt8);
        assert_eq!(PlyDataType::parse("double").unwrap(), PlyDataType::Float64);
        assert!(PlyDataType::parse("invalid").is_err());
    }

    #[test]
    fn test_read_le() {
        let mut data: &[u8] = &[0xff, 0xfe, 0xff];
        assert_eq!(PlyDataType::Int8.read_le(&mut data).unwrap(), -1.0);
        assert_eq!(PlyDataType::Int16.read_le(&mut data).unwrap(), -2.0);

        let bytes = 2.5f64.to_le_bytes();
        let mut data: &[u8] = &bytes;
        assert_eq!(PlyDataType::Float64.read_le(&mut data).unwrap(), 2.5);

        let mut short: &[u8] = &[1, 2];
        assert!(PlyDataType::UInt32.read_le(&mut short).is_err());
    }

    #[test]
    fn test_parse_ascii() {
        assert_eq!(PlyDataType::Float32.parse_ascii("-0.5").unwrap(), -0.5);
        assert_eq!(PlyDataType::Int32.parse_ascii("7").unwrap(), 7.0);
        assert!(PlyDataType::Int32.parse_ascii("7.5").is_err());
    }
}
