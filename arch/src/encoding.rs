use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer};

use crate::types::UvmType;

// ----------------------------------------------------------------------------
// Register offset layouts

// These values define the layout of a register offset operand. All base
// layouts leave the top bit clear so the negative variant is formed by
// ORing in the sign mask:
//
// RO_LAYOUT_IR_IR_INT -> 0001 1111 = <iR> + <iR> * <i16>
// NEGATIVE MASK       -> 1000 0000
// ============ OR ================
//                     -> 1001 1111 = <iR> - <iR> * <i16>
pub const RO_LAYOUT_NEGATIVE: u8 = 0b1000_0000;
pub const RO_LAYOUT_IR: u8 = 0x4F; // <iR>
pub const RO_LAYOUT_IR_INT: u8 = 0x2F; // <iR> +/- <i32>
pub const RO_LAYOUT_IR_IR_INT: u8 = 0x1F; // <iR> +/- <iR> * <i16>

// ----------------------------------------------------------------------------
// Encoding flags

/// The generator must append the operand type byte to the instruction.
pub const INSTR_FLAG_ENCODE_TYPE: u8 = 0x1;
/// The opcode is chosen per operand type from the signature's variant table.
pub const INSTR_FLAG_TYPE_VARIANTS: u8 = 0x2;

// ----------------------------------------------------------------------------
// Instruction definition table

/// Operand categories an instruction signature can require. Signatures of
/// one mnemonic are constructed so that at every operand position the
/// possible categories are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    IntType,
    FloatType,
    IntReg,
    FloatReg,
    RegOffset,
    IntNum,
    FloatNum,
    LabelId,
    SysInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigFlag {
    EncodeType,
    TypeVariants,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeVariant {
    #[serde(rename = "type")]
    pub ty: UvmType,
    #[serde(deserialize_with = "hex_byte")]
    pub opcode: u8,
}

/// One legal operand list of a mnemonic, with its base opcode and encoding
/// flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstrSignature {
    #[serde(deserialize_with = "hex_byte")]
    pub opcode: u8,
    #[serde(default)]
    pub flags: Option<SigFlag>,
    #[serde(default)]
    pub params: Vec<ParamKind>,
    #[serde(default)]
    pub variants: Vec<TypeVariant>,
}

impl InstrSignature {
    pub fn flags_byte(&self) -> u8 {
        match self.flags {
            None => 0,
            Some(SigFlag::EncodeType) => INSTR_FLAG_ENCODE_TYPE,
            Some(SigFlag::TypeVariants) => INSTR_FLAG_TYPE_VARIANTS,
        }
    }

    pub fn has_type_variants(&self) -> bool {
        matches!(self.flags, Some(SigFlag::TypeVariants))
    }

    pub fn variant_opcode(&self, ty: UvmType) -> Option<u8> {
        self.variants.iter().find(|v| v.ty == ty).map(|v| v.opcode)
    }
}

fn hex_byte<'de, D: Deserializer<'de>>(de: D) -> Result<u8, D::Error> {
    let text = String::deserialize(de)?;
    let digits = text.strip_prefix("0x").unwrap_or(&text);
    u8::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
struct RawDef {
    name: String,
    signatures: Vec<InstrSignature>,
}

// ----------------------------------------------------------------------------
// Signature trie

/// One node of a mnemonic's signature trie. Children branch on the operand
/// category at the node's depth; a node holding `sig` terminates a
/// signature. A zero-operand instruction is a childless root holding its
/// signature directly.
#[derive(Debug, Default)]
pub struct SigNode {
    pub children: Vec<SigEdge>,
    pub sig: Option<InstrSignature>,
}

#[derive(Debug)]
pub struct SigEdge {
    pub kind: ParamKind,
    pub node: SigNode,
}

#[derive(Debug)]
pub struct InstrDef {
    pub name: String,
    pub root: SigNode,
}

pub struct Encoding {
    defs: Vec<InstrDef>,
    index: IndexMap<String, u32>,
}

impl Encoding {
    fn from_json(json: &str) -> Self {
        let raw: Vec<RawDef> =
            serde_json::from_str(json).expect("embedded encoding table is valid JSON");
        let mut defs = Vec::with_capacity(raw.len());
        let mut index = IndexMap::with_capacity(raw.len());
        for def in raw {
            let mut root = SigNode::default();
            for sig in def.signatures {
                insert_signature(&mut root, sig);
            }
            index.insert(def.name.clone(), defs.len() as u32);
            defs.push(InstrDef { name: def.name, root });
        }
        Encoding { defs, index }
    }

    /// Resolves a mnemonic to its definition index, as baked into
    /// `Instruction` tokens by the scanner.
    pub fn mnemonic_index(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    pub fn def(&self, index: u32) -> &InstrDef {
        &self.defs[index as usize]
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn insert_signature(root: &mut SigNode, sig: InstrSignature) {
    let mut node = root;
    for kind in sig.params.iter().copied() {
        let pos = match node.children.iter().position(|e| e.kind == kind) {
            Some(pos) => pos,
            None => {
                node.children.push(SigEdge {
                    kind,
                    node: SigNode::default(),
                });
                node.children.len() - 1
            }
        };
        node = &mut node.children[pos].node;
    }
    node.sig = Some(sig);
}

static ENCODING: Lazy<Encoding> =
    Lazy::new(|| Encoding::from_json(include_str!("../encoding.json")));

/// The instruction definition table, compiled into per-mnemonic signature
/// tries on first use.
pub fn encoding() -> &'static Encoding {
    &ENCODING
}
