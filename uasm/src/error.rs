use thiserror::Error;

/// Every diagnostic the front end can produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsmError {
    // Scanner
    #[error("Unknown character `{0}`")]
    UnknownChar(char),

    #[error("Unterminated string")]
    UnterminatedString,

    // Grammar
    #[error("Expected section identifier in global scope")]
    ExpectedSection,

    #[error("Expected {{ after section identifier")]
    ExpectedSectionBrace,

    #[error("Section `{0}` is already defined")]
    RedefinedSection(String),

    #[error("Unknown section type `{0}`")]
    UnknownSection(String),

    #[error("Could not find code section")]
    MissingCodeSection,

    #[error("Expected variable identifier")]
    ExpectedVarIdent,

    #[error("Expected colon after variable identifier")]
    ExpectedVarColon,

    #[error("Expected type info in variable declaration")]
    ExpectedVarType,

    #[error("Expected equals sign after type info in variable declaration")]
    ExpectedVarEquals,

    #[error("Expected string, float or integer as variable value")]
    ExpectedVarValue,

    #[error("Expected new line after variable declaration")]
    ExpectedVarNewline,

    #[error("Unexpected token in code section")]
    UnexpectedCodeToken,

    #[error("Unexpected end of file after instruction")]
    EndAfterInstruction,

    #[error("Expected new line after label definition")]
    ExpectedLabelNewline,

    #[error("Expected parameter")]
    ExpectedParameter,

    // Register offsets
    #[error("Expected register in register offset")]
    ExpectedOffsetBase,

    #[error("Expected integer register as base")]
    ExpectedIntBase,

    #[error("Expected integer register as offset")]
    ExpectedIntOffset,

    #[error("Unexpected token in register offset")]
    UnexpectedOffsetToken,

    #[error("Expected register or integer number as offset")]
    ExpectedOffsetOperand,

    #[error("Expected * after offset register")]
    ExpectedScaleOperator,

    #[error("Expected closing bracket ] after variable reference")]
    ExpectedBracketAfterVar,

    #[error("Expected closing bracket ] after immediate offset")]
    ExpectedBracketAfterImm,

    #[error("Expected closing bracket ] after scale factor")]
    ExpectedBracketAfterScale,

    #[error("Register offset immediate does not fit into 32-bit value")]
    OffsetImm32,

    #[error("Register offset immediate does not fit into 16-bit value")]
    OffsetImm16,

    // Numbers
    #[error("Unexpected operator")]
    UnexpectedOperator,

    #[error("Integer does not fit into 64-bit value")]
    IntOverflow,

    #[error("Integer does not fit into given type")]
    IntWidth,

    #[error("Float does not fit into 64-bit value")]
    FloatOverflow,

    #[error("Float does not fit into given type")]
    FloatWidth,

    // Signatures
    #[error("Expected parameters found none")]
    ExpectedParameters,

    #[error("No matching parameter list found for instruction `{0}`")]
    NoMatchingSignature(String),

    #[error("Expected int type found float type")]
    ExpectedIntType,

    #[error("Expected float type found int type")]
    ExpectedFloatType,

    #[error("Expected integer register")]
    ExpectedIntReg,

    #[error("Expected float register")]
    ExpectedFloatReg,

    // Symbols and structure
    #[error("Variable `{0}` is already defined")]
    RedefinedVariable(String),

    #[error("Label `{0}` is already defined")]
    RedefinedLabel(String),

    #[error("Unresolved label `{0}`")]
    UnresolvedLabel(String),

    #[error("Variable reference `{0}` does not exist")]
    UnresolvedVariable(String),

    #[error("Missing main label")]
    MissingMainLabel,

    #[error("Missing main entry")]
    MissingMainEntry,

    #[error("Empty code section")]
    EmptyCode,
}
