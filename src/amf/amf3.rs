// AMF3 value

use byteorder::{BigEndian, ByteOrder};

use super::AMFDecodingCursor;

const AMF3_TYPE_UNDEFINED: u8 = 0x00;
const AMF3_TYPE_NULL: u8 = 0x01;
const AMF3_TYPE_FALSE: u8 = 0x02;
const AMF3_TYPE_TRUE: u8 = 0x03;
const AMF3_TYPE_INTEGER: u8 = 0x04;
const AMF3_TYPE_DOUBLE: u8 = 0x05;
const AMF3_TYPE_STRING: u8 = 0x06;
const AMF3_TYPE_XML_DOC: u8 = 0x07;
const AMF3_TYPE_DATE: u8 = 0x08;
const AMF3_TYPE_ARRAY: u8 = 0x09;
const AMF3_TYPE_OBJECT: u8 = 0x0A;
const AMF3_TYPE_XML: u8 = 0x0B;
const AMF3_TYPE_BYTE_ARRAY: u8 = 0x0C;

/// AMF3 compatible value
pub enum AMF3Value {
    Undefined,
    Null,
    False,
    True,
    Integer { value: i32 },
    Double { value: f64 },
    String { value: String },
    XmlDocument { content: String },
    Date { timestamp: f64 },
    Array,
    Object,
    Xml { value: String },
    ByteArray { value: Vec<u8> },
}

impl AMF3Value {
    /// Obtains a string representation of the value
    /// Used for debug logging purposes
    pub fn to_debug_string(&self, tabs: &str) -> String {
        match self {
            AMF3Value::Undefined => "Undefined".to_string(),
            AMF3Value::Null => "Null".to_string(),
            AMF3Value::False => "False".to_string(),
            AMF3Value::True => "True".to_string(),
            AMF3Value::Integer { value } => format!("Integer({})", value),
            AMF3Value::Double { value } => format!("Double({})", value),
            AMF3Value::String { value } => format!("'{}'", value),
            AMF3Value::XmlDocument { content } => format!("XML_DOC'{}'", content),
            AMF3Value::Date { timestamp } => format!("DATE({})", timestamp),
            AMF3Value::Array => "Array(Unsupported)".to_string(),
            AMF3Value::Object => "Object(Unsupported)".to_string(),
            AMF3Value::Xml { value } => format!("XML'{}'", value),
            AMF3Value::ByteArray { value } => format!("Bytes({})", hex::encode(value)),
        }
    }

    /// Turns the ANF3 value into a boolean
    pub fn get_bool(&self) -> bool {
        match self {
            AMF3Value::True => true,
            _ => false,
        }
    }

    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        match self {
            AMF3Value::Undefined => true,
            _ => false,
        }
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        match self {
            AMF3Value::Null => true,
            _ => false,
        }
    }

    /// Returns the value as integer
    pub fn get_integer(&self) -> i64 {
        match self {
            AMF3Value::Integer { value } => *value as i64,
            AMF3Value::Double { value } => *value as i64,
            _ => 0,
        }
    }

    /// Returns the value as float
    pub fn get_float(&self) -> f64 {
        match self {
            AMF3Value::Integer { value } => *value as f64,
            AMF3Value::Double { value } => *value,
            _ => 0.0,
        }
    }

    /// Returns the value as string
    pub fn get_string(&self) -> &str {
        match self {
            AMF3Value::String { value } => value.as_str(),
            AMF3Value::XmlDocument { content } => content.as_str(),
            AMF3Value::Xml { value } => value.as_str(),
            _ => "",
        }
    }

    /// Returns the value as string
    pub fn get_byte_array(&self) -> Option<&Vec<u8>> {
        match self {
            AMF3Value::ByteArray { value } => Some(&value),
            _ => None,
        }
    }

    // Decoding functions:

    /// Reads an AMF3 value from the buffer, starting at the cursor's position
    /// Only the subset documented as supported is accepted: null, false, true,
    /// integer (U29), double, and inline (non-reference) string. Reference-table
    /// entries and the remaining AMF3 types are rejected as unsupported.
    pub fn read(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<AMF3Value, ()> {
        let marker = cursor.read(buffer, 1)?[0];

        match marker {
            AMF3_TYPE_UNDEFINED => Ok(AMF3Value::Undefined),
            AMF3_TYPE_NULL => Ok(AMF3Value::Null),
            AMF3_TYPE_FALSE => Ok(AMF3Value::False),
            AMF3_TYPE_TRUE => Ok(AMF3Value::True),
            AMF3_TYPE_INTEGER => {
                let u29 = Self::read_u29(cursor, buffer)?;
                Ok(AMF3Value::Integer {
                    value: Self::u29_to_signed(u29),
                })
            }
            AMF3_TYPE_DOUBLE => {
                let b = cursor.read(buffer, 8)?;
                Ok(AMF3Value::Double {
                    value: BigEndian::read_f64(b),
                })
            }
            AMF3_TYPE_STRING => {
                let u29 = Self::read_u29(cursor, buffer)?;

                if u29 & 1 == 0 {
                    return Err(()); // Unsupported: string table reference
                }

                let len = (u29 >> 1) as usize;
                let str_bytes = cursor.read(buffer, len)?;

                Ok(AMF3Value::String {
                    value: String::from_utf8_lossy(str_bytes).to_string(),
                })
            }
            _ => Err(()), // BadType / Unsupported (XML, Date, Array, Object, ByteArray references)
        }
    }

    /// Reads a variable-length U29 integer (1 to 4 bytes)
    fn read_u29(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<u32, ()> {
        let mut result: u32 = 0;

        for i in 0..4 {
            let byte = cursor.read(buffer, 1)?[0];

            if i == 3 {
                result = (result << 8) | (byte as u32);
                break;
            }

            result = (result << 7) | ((byte & 0x7f) as u32);

            if byte & 0x80 == 0 {
                break;
            }
        }

        Ok(result)
    }

    /// Interprets a raw 29-bit field as a signed integer (two's complement)
    fn u29_to_signed(u29: u32) -> i32 {
        if u29 >= 0x10000000 {
            (u29 as i32) - 0x20000000
        } else {
            u29 as i32
        }
    }

    /// Encodes a U29 value (low 29 bits of `value` are used)
    fn encode_u29(value: u32) -> Vec<u8> {
        let v = value & 0x1FFFFFFF;

        if v < 0x80 {
            vec![v as u8]
        } else if v < 0x4000 {
            vec![(((v >> 7) & 0x7f) | 0x80) as u8, (v & 0x7f) as u8]
        } else if v < 0x200000 {
            vec![
                (((v >> 14) & 0x7f) | 0x80) as u8,
                (((v >> 7) & 0x7f) | 0x80) as u8,
                (v & 0x7f) as u8,
            ]
        } else {
            vec![
                (((v >> 22) & 0x7f) | 0x80) as u8,
                (((v >> 15) & 0x7f) | 0x80) as u8,
                (((v >> 8) & 0x7f) | 0x80) as u8,
                (v & 0xff) as u8,
            ]
        }
    }

    /// Encodes the value into bytes
    /// Variants outside the documented supported subset (XML, Date, Array,
    /// Object, ByteArray) have no normative wire form here and encode as Undefined
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AMF3Value::Undefined => vec![AMF3_TYPE_UNDEFINED],
            AMF3Value::Null => vec![AMF3_TYPE_NULL],
            AMF3Value::False => vec![AMF3_TYPE_FALSE],
            AMF3Value::True => vec![AMF3_TYPE_TRUE],
            AMF3Value::Integer { value } => {
                let mut buf = vec![AMF3_TYPE_INTEGER];
                buf.extend(Self::encode_u29(*value as u32));
                buf
            }
            AMF3Value::Double { value } => {
                let mut buf = vec![AMF3_TYPE_DOUBLE];
                let mut b = vec![0; 8];
                BigEndian::write_f64(&mut b, *value);
                buf.extend(b);
                buf
            }
            AMF3Value::String { value } => {
                let mut buf = vec![AMF3_TYPE_STRING];
                let len = value.len() as u32;
                buf.extend(Self::encode_u29((len << 1) | 1));
                buf.extend(value.bytes());
                buf
            }
            _ => vec![AMF3_TYPE_UNDEFINED],
        }
    }
}

// Tests
