use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Id of the VM flags register. It has no assembly name and is skipped in
/// the id map below.
pub const REG_FLAGS_ID: u8 = 0x04;

/// Named registers and their id bytes.
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
#[strum(serialize_all = "lowercase")]
pub enum Reg {
    Ip = 0x01,
    Sp = 0x02,
    Bp = 0x03,
    R0 = 0x05,
    R1 = 0x06,
    R2 = 0x07,
    R3 = 0x08,
    R4 = 0x09,
    R5 = 0x0A,
    R6 = 0x0B,
    R7 = 0x0C,
    R8 = 0x0D,
    R9 = 0x0E,
    R10 = 0x0F,
    R11 = 0x10,
    R12 = 0x11,
    R13 = 0x12,
    R14 = 0x13,
    R15 = 0x14,
    F0 = 0x16,
    F1 = 0x17,
    F2 = 0x18,
    F3 = 0x19,
    F4 = 0x1A,
    F5 = 0x1B,
    F6 = 0x1C,
    F7 = 0x1D,
    F8 = 0x1E,
    F9 = 0x1F,
    F10 = 0x20,
    F11 = 0x21,
    F12 = 0x22,
    F13 = 0x23,
    F14 = 0x24,
    F15 = 0x25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegKind {
    Integer,
    Float,
}

/// Classifies a raw register id. Integer registers are `0x01..=0x14` minus
/// the reserved flags id; everything above is a float register.
pub fn reg_kind(id: u8) -> RegKind {
    if id <= 0x14 && id != REG_FLAGS_ID {
        RegKind::Integer
    } else {
        RegKind::Float
    }
}

impl Reg {
    /// Resolves a register name to its id byte.
    pub fn parse(s: &str) -> Option<u8> {
        s.parse::<Self>().ok().map(u8::from)
    }

    pub fn kind(self) -> RegKind {
        reg_kind(self.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_map() {
        assert_eq!(Reg::parse("ip"), Some(0x01));
        assert_eq!(Reg::parse("bp"), Some(0x03));
        assert_eq!(Reg::parse("r0"), Some(0x05));
        assert_eq!(Reg::parse("r15"), Some(0x14));
        assert_eq!(Reg::parse("f0"), Some(0x16));
        assert_eq!(Reg::parse("f15"), Some(0x25));
        // The flags register is unreachable through syntax.
        assert_eq!(Reg::parse("flags"), None);
        assert!(Reg::try_from(REG_FLAGS_ID).is_err());
    }

    #[test]
    fn register_classes() {
        assert_eq!(reg_kind(0x01), RegKind::Integer);
        assert_eq!(reg_kind(0x14), RegKind::Integer);
        assert_eq!(reg_kind(0x16), RegKind::Float);
        assert_eq!(reg_kind(0x25), RegKind::Float);
        assert_eq!(Reg::R7.kind(), RegKind::Integer);
        assert_eq!(Reg::F7.kind(), RegKind::Float);
    }
}
