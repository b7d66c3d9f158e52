use arch::encoding::InstrSignature;
use arch::types::UvmType;

use super::token::Span;

/// Root of a parsed file: the three optional sections. Section uniqueness
/// is enforced by construction.
#[derive(Debug, Default)]
pub struct FileAst {
    pub statics: Option<VarSection>,
    pub globals: Option<VarSection>,
    pub code: Option<CodeSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Static,
    Global,
    Code,
}

/// A `static` or `global` section: an ordered list of variable
/// declarations.
#[derive(Debug)]
pub struct VarSection {
    pub span: Span,
    pub kind: SectionKind,
    pub name: String,
    pub vars: Vec<VarDecl>,
}

/// The `code` section body, in source order.
#[derive(Debug)]
pub struct CodeSection {
    pub span: Span,
    pub name: String,
    pub items: Vec<CodeItem>,
}

#[derive(Debug)]
pub enum CodeItem {
    Label(LabelDef),
    Instr(Instruction),
}

#[derive(Debug)]
pub struct VarDecl {
    pub span: Span,
    pub id: Ident,
    pub ty: TypeInfo,
    pub value: VarValue,
    /// Filled by the type checker: index into the variable table.
    pub decl_index: u32,
}

#[derive(Debug)]
pub enum VarValue {
    Int(IntLit),
    Float(FloatLit),
    Str(StrLit),
}

impl VarValue {
    pub fn span(&self) -> Span {
        match self {
            VarValue::Int(lit) => lit.span,
            VarValue::Float(lit) => lit.span,
            VarValue::Str(lit) => lit.span,
        }
    }
}

/// A label definition, stored without the leading `@`.
#[derive(Debug, Clone)]
pub struct LabelDef {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub span: Span,
    pub name: String,
}

#[derive(Debug)]
pub struct Instruction {
    pub span: Span,
    pub name: String,
    /// Index into the instruction definition table, resolved by the
    /// scanner.
    pub def_index: u32,
    pub operands: Vec<Operand>,
    /// Filled by the type checker once a signature matches.
    pub encoding: Option<Encoded>,
}

/// Encoding decision attached to an instruction by the type checker.
#[derive(Debug, Clone, Copy)]
pub struct Encoded {
    pub opcode: u8,
    pub flags: u8,
    pub sig: &'static InstrSignature,
}

#[derive(Debug)]
pub enum Operand {
    Type(TypeInfo),
    Reg(RegisterId),
    Offset(RegOffset),
    Id(Ident),
    Int(IntLit),
    Float(FloatLit),
}

#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub span: Span,
    pub ty: UvmType,
}

#[derive(Debug, Clone, Copy)]
pub struct RegisterId {
    pub span: Span,
    pub id: u8,
}

/// A bracketed memory operand. The layout byte tells the generator which
/// form was written; the variable-addressed form leaves it zero and sets
/// `var` instead.
#[derive(Debug)]
pub struct RegOffset {
    pub span: Span,
    pub layout: u8,
    pub base: Option<RegisterId>,
    pub offset: Option<RegisterId>,
    pub imm: RoImm,
    pub var: Option<Ident>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoImm {
    None,
    U16(u16),
    U32(u32),
}

#[derive(Debug)]
pub struct IntLit {
    pub span: Span,
    /// Unsigned magnitude of the literal; the sign lives in `signed`.
    pub value: u64,
    /// Set when the literal was written with a minus sign.
    pub signed: bool,
    /// Filled by the type checker from the accompanying type info.
    pub ty: Option<UvmType>,
}

#[derive(Debug)]
pub struct FloatLit {
    pub span: Span,
    pub value: f64,
    pub ty: Option<UvmType>,
}

/// A string literal, escape-expanded and with the quotes stripped.
#[derive(Debug)]
pub struct StrLit {
    pub span: Span,
    pub bytes: Vec<u8>,
}
