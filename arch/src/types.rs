use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// UVM data type codes. The byte values are fixed by the VM; the assembler
/// only compares them and passes them through to the generator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UvmType {
    I8 = 0x01,
    I16 = 0x02,
    I32 = 0x03,
    I64 = 0x04,
    F32 = 0xF0,
    F64 = 0xF1,
}

impl UvmType {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<Self>().ok()
    }

    pub fn is_int(self) -> bool {
        matches!(self, UvmType::I8 | UvmType::I16 | UvmType::I32 | UvmType::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, UvmType::F32 | UvmType::F64)
    }

    /// Checks that an integer literal's magnitude fits into this type.
    /// The bound is on the magnitude, not the two's-complement range.
    pub fn int_fits(self, magnitude: u64) -> bool {
        match self {
            UvmType::I8 => magnitude <= 0xFF,
            UvmType::I16 => magnitude <= 0xFFFF,
            UvmType::I32 => magnitude <= 0xFFFF_FFFF,
            UvmType::I64 => true,
            UvmType::F32 | UvmType::F64 => false,
        }
    }

    /// Checks that a float fits into this type.
    pub fn float_fits(self, value: f64) -> bool {
        match self {
            UvmType::F32 => value.abs() <= f32::MAX as f64,
            UvmType::F64 => value.abs() <= f64::MAX,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_keywords() {
        assert_eq!(UvmType::parse("i8"), Some(UvmType::I8));
        assert_eq!(UvmType::parse("f64"), Some(UvmType::F64));
        assert_eq!(UvmType::parse("u32"), None);
        assert_eq!(u8::from(UvmType::I32), 0x03);
    }

    #[test]
    fn int_width_is_a_magnitude_bound() {
        assert!(UvmType::I8.int_fits(255));
        assert!(!UvmType::I8.int_fits(256));
        assert!(!UvmType::I16.int_fits(70000));
        assert!(UvmType::I32.int_fits(0xFFFF_FFFF));
        assert!(!UvmType::I32.int_fits(0x1_0000_0000));
        assert!(UvmType::I64.int_fits(u64::MAX));

        // A literal written `-200` carries magnitude 200, so it passes
        // an i8 check even though it is below i8::MIN.
        assert!(UvmType::I8.int_fits(200));
    }

    #[test]
    fn float_width() {
        assert!(UvmType::F32.float_fits(3.14));
        assert!(UvmType::F32.float_fits(-3.14));
        assert!(!UvmType::F32.float_fits(f64::MAX));
        assert!(UvmType::F64.float_fits(f64::MAX));
        assert!(!UvmType::I32.float_fits(1.0));
    }
}
