use arch::encoding::{RO_LAYOUT_IR, RO_LAYOUT_IR_INT, RO_LAYOUT_IR_IR_INT, RO_LAYOUT_NEGATIVE};
use arch::reg::{reg_kind, RegKind};

use crate::error::AsmError;
use crate::msg::{Msg, Stage};
use crate::source::SourceFile;

use super::ast::{
    CodeItem, CodeSection, FileAst, FloatLit, Ident, Instruction, IntLit, LabelDef, Operand,
    RegOffset, RegisterId, RoImm, SectionKind, StrLit, TypeInfo, VarDecl, VarSection, VarValue,
};
use super::cursor::TokenCursor;
use super::token::{Span, Token, TokenKind};

/// Parser state while walking a code section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    GlobalScope,
    InstrBody,
    End,
}

/// Builds the AST for a whole file. Stops at the first error and returns
/// its diagnostic; nothing of the partial parse is surfaced.
pub fn parse(src: &SourceFile, tokens: &[Token]) -> Result<FileAst, Msg> {
    Parser {
        src,
        cur: TokenCursor::new(tokens),
    }
    .build_ast()
}

struct Parser<'a> {
    src: &'a SourceFile,
    cur: TokenCursor<'a>,
}

impl<'a> Parser<'a> {
    fn err(&self, err: AsmError, span: Span) -> Msg {
        Msg::error(Stage::Parser, err, span)
    }

    fn text(&self, span: Span) -> &'a str {
        self.src.substring(span.index, span.size)
    }

    // ------------------------------------------------------------------
    // file := { NL } { section { NL } } EOF

    fn build_ast(mut self) -> Result<FileAst, Msg> {
        let mut file = FileAst::default();
        let mut tok = self.cur.eat();
        while tok.kind != TokenKind::EndOfFile {
            if tok.kind == TokenKind::Eol {
                tok = self.cur.eat();
                continue;
            }

            if tok.kind != TokenKind::Identifier {
                return Err(self.err(AsmError::ExpectedSection, tok.span));
            }
            let sec_tok = tok;

            tok = self.cur.eat();
            if tok.kind != TokenKind::LeftCurly {
                return Err(self.err(AsmError::ExpectedSectionBrace, tok.span));
            }

            match self.text(sec_tok.span) {
                "static" => {
                    if file.statics.is_some() {
                        return Err(
                            self.err(AsmError::RedefinedSection("static".into()), sec_tok.span)
                        );
                    }
                    file.statics = Some(self.parse_var_section(sec_tok, SectionKind::Static)?);
                }
                "global" => {
                    if file.globals.is_some() {
                        return Err(
                            self.err(AsmError::RedefinedSection("global".into()), sec_tok.span)
                        );
                    }
                    file.globals = Some(self.parse_var_section(sec_tok, SectionKind::Global)?);
                }
                "code" => {
                    if file.code.is_some() {
                        return Err(
                            self.err(AsmError::RedefinedSection("code".into()), sec_tok.span)
                        );
                    }
                    file.code = Some(self.parse_code_section(sec_tok)?);
                }
                other => {
                    return Err(self.err(AsmError::UnknownSection(other.into()), sec_tok.span));
                }
            }

            tok = self.cur.eat();
        }

        if file.code.is_none() {
            return Err(self.err(AsmError::MissingCodeSection, tok.span));
        }
        Ok(file)
    }

    // ------------------------------------------------------------------
    // static_body / global_body := { var_decl }

    fn parse_var_section(
        &mut self,
        sec_tok: &Token,
        kind: SectionKind,
    ) -> Result<VarSection, Msg> {
        let mut sec = VarSection {
            span: sec_tok.span,
            kind,
            name: self.text(sec_tok.span).to_string(),
            vars: Vec::new(),
        };

        let mut tok = self.cur.eat();
        if tok.kind == TokenKind::Eol {
            tok = self.cur.eat();
        }
        while tok.kind != TokenKind::RightCurly {
            sec.vars.push(self.parse_var_decl(tok)?);
            tok = self.cur.eat();
        }
        Ok(sec)
    }

    // var_decl := IDENT ':' TYPE '=' [sign] literal NL
    fn parse_var_decl(&mut self, first: &Token) -> Result<VarDecl, Msg> {
        if first.kind != TokenKind::Identifier {
            return Err(self.err(AsmError::ExpectedVarIdent, first.span));
        }
        let id = Ident {
            span: first.span,
            name: self.text(first.span).to_string(),
        };

        let tok = self.cur.eat();
        if tok.kind != TokenKind::Colon {
            return Err(self.err(AsmError::ExpectedVarColon, tok.span));
        }

        let tok = self.cur.eat();
        if tok.kind != TokenKind::TypeInfo {
            return Err(self.err(AsmError::ExpectedVarType, tok.span));
        }
        let ty = TypeInfo {
            span: tok.span,
            ty: tok.type_tag(),
        };

        let tok = self.cur.eat();
        if tok.kind != TokenKind::Equals {
            return Err(self.err(AsmError::ExpectedVarEquals, tok.span));
        }

        let mut tok = self.cur.eat();
        let mut sign: Option<&Token> = None;
        if matches!(tok.kind, TokenKind::Plus | TokenKind::Minus) {
            sign = Some(tok);
            tok = self.cur.eat();
        }

        let value = match tok.kind {
            TokenKind::String => VarValue::Str(self.parse_string_lit(tok)),
            TokenKind::IntegerNumber => {
                let lit = self.parse_int_lit(tok, sign)?;
                if !ty.ty.int_fits(lit.value) {
                    return Err(self.err(AsmError::IntWidth, tok.span));
                }
                VarValue::Int(lit)
            }
            TokenKind::FloatNumber => {
                let lit = self.parse_float_lit(tok, sign)?;
                if !ty.ty.float_fits(lit.value) {
                    return Err(self.err(AsmError::FloatWidth, tok.span));
                }
                VarValue::Float(lit)
            }
            _ => return Err(self.err(AsmError::ExpectedVarValue, tok.span)),
        };

        let end = self.cur.eat();
        if end.kind != TokenKind::Eol {
            return Err(self.err(AsmError::ExpectedVarNewline, end.span));
        }

        let value_span = value.span();
        let span = Span {
            index: id.span.index,
            size: (value_span.index + value_span.size) - id.span.index,
            line_row: id.span.line_row,
            line_col: id.span.line_col,
        };
        Ok(VarDecl {
            span,
            id,
            ty,
            value,
            decl_index: 0,
        })
    }

    // ------------------------------------------------------------------
    // code_body := { NL | label_def NL | instr NL }

    fn parse_code_section(&mut self, sec_tok: &Token) -> Result<CodeSection, Msg> {
        let mut sec = CodeSection {
            span: sec_tok.span,
            name: self.text(sec_tok.span).to_string(),
            items: Vec::new(),
        };

        let mut state = ParseState::GlobalScope;
        while state != ParseState::End {
            let mut tok = self.cur.eat();
            match state {
                ParseState::GlobalScope => {
                    if tok.kind == TokenKind::Eol {
                        tok = self.cur.eat();
                    }
                    if matches!(tok.kind, TokenKind::EndOfFile | TokenKind::RightCurly) {
                        state = ParseState::End;
                        continue;
                    }

                    match tok.kind {
                        TokenKind::Instruction => {
                            sec.items.push(CodeItem::Instr(Instruction {
                                span: tok.span,
                                name: self.text(tok.span).to_string(),
                                def_index: tok.tag,
                                operands: Vec::new(),
                                encoding: None,
                            }));

                            let peek = self.cur.peek();
                            if peek.kind == TokenKind::EndOfFile {
                                return Err(self.err(AsmError::EndAfterInstruction, tok.span));
                            }
                            if peek.kind != TokenKind::Eol {
                                state = ParseState::InstrBody;
                            }
                        }
                        TokenKind::LabelDef => {
                            // Strip the leading '@'.
                            let name = self
                                .src
                                .substring(tok.span.index + 1, tok.span.size - 1)
                                .to_string();
                            sec.items.push(CodeItem::Label(LabelDef {
                                span: tok.span,
                                name,
                            }));

                            if self.cur.peek().kind != TokenKind::Eol {
                                return Err(self.err(AsmError::ExpectedLabelNewline, tok.span));
                            }
                            self.cur.eat();
                        }
                        _ => return Err(self.err(AsmError::UnexpectedCodeToken, tok.span)),
                    }
                }
                ParseState::InstrBody => {
                    let operands = self.parse_operand_list(tok)?;
                    if let Some(CodeItem::Instr(instr)) = sec.items.last_mut() {
                        instr.operands = operands;
                    }
                    state = ParseState::GlobalScope;
                }
                ParseState::End => {}
            }
        }
        Ok(sec)
    }

    // operand_list := operand { ',' operand }
    fn parse_operand_list(&mut self, first: &Token) -> Result<Vec<Operand>, Msg> {
        let mut ops = Vec::new();
        let mut tok = first;
        let mut done = false;

        // A leading type operand types the rest of the list. Type-only
        // forms like `pop i8` end right after it.
        if tok.kind == TokenKind::TypeInfo {
            ops.push(Operand::Type(TypeInfo {
                span: tok.span,
                ty: tok.type_tag(),
            }));
            tok = self.cur.eat();
            match tok.kind {
                TokenKind::Eol => done = true,
                TokenKind::Comma => tok = self.cur.eat(),
                _ => return Err(self.err(AsmError::ExpectedParameter, tok.span)),
            }
        }

        while !done {
            let mut sign: Option<&Token> = None;
            if matches!(tok.kind, TokenKind::Plus | TokenKind::Minus) {
                sign = Some(tok);
                tok = self.cur.eat();
            }
            if let Some(sign_tok) = sign {
                if !matches!(
                    tok.kind,
                    TokenKind::IntegerNumber | TokenKind::FloatNumber
                ) {
                    return Err(self.err(AsmError::UnexpectedOperator, sign_tok.span));
                }
            }

            match tok.kind {
                TokenKind::Identifier => ops.push(Operand::Id(Ident {
                    span: tok.span,
                    name: self.text(tok.span).to_string(),
                })),
                TokenKind::RegisterDefinition => ops.push(Operand::Reg(RegisterId {
                    span: tok.span,
                    id: tok.reg_tag(),
                })),
                TokenKind::LeftSquare => ops.push(Operand::Offset(self.parse_reg_offset(tok)?)),
                TokenKind::IntegerNumber => ops.push(Operand::Int(self.parse_int_lit(tok, sign)?)),
                TokenKind::FloatNumber => {
                    ops.push(Operand::Float(self.parse_float_lit(tok, sign)?))
                }
                _ => return Err(self.err(AsmError::ExpectedParameter, tok.span)),
            }

            tok = self.cur.eat();
            match tok.kind {
                TokenKind::Comma => tok = self.cur.eat(),
                TokenKind::Eol => done = true,
                _ => return Err(self.err(AsmError::ExpectedParameter, tok.span)),
            }
        }
        Ok(ops)
    }

    // reg_offset := '[' (ident | register
    //                    | register ('+'|'-') (imm32 | register '*' imm16)) ']'
    fn parse_reg_offset(&mut self, open: &Token) -> Result<RegOffset, Msg> {
        let mut ro = RegOffset {
            span: open.span,
            layout: 0,
            base: None,
            offset: None,
            imm: RoImm::None,
            var: None,
        };

        let tok = self.cur.eat();

        // Variable-addressed form `[ident]`: no layout byte.
        if tok.kind == TokenKind::Identifier {
            ro.var = Some(Ident {
                span: tok.span,
                name: self.text(tok.span).to_string(),
            });
            let close = self.cur.eat();
            if close.kind != TokenKind::RightSquare {
                return Err(self.err(AsmError::ExpectedBracketAfterVar, close.span));
            }
            return Ok(ro);
        }

        if tok.kind != TokenKind::RegisterDefinition {
            return Err(self.err(AsmError::ExpectedOffsetBase, tok.span));
        }
        if reg_kind(tok.reg_tag()) != RegKind::Integer {
            return Err(self.err(AsmError::ExpectedIntBase, tok.span));
        }
        ro.base = Some(RegisterId {
            span: tok.span,
            id: tok.reg_tag(),
        });

        let tok = self.cur.eat();
        match tok.kind {
            TokenKind::RightSquare => {
                ro.layout = RO_LAYOUT_IR;
                return Ok(ro);
            }
            TokenKind::Plus => {}
            TokenKind::Minus => ro.layout |= RO_LAYOUT_NEGATIVE,
            _ => return Err(self.err(AsmError::UnexpectedOffsetToken, tok.span)),
        }

        let tok = self.cur.eat();
        if tok.kind == TokenKind::IntegerNumber {
            // <iR> +/- <i32>
            if self.cur.peek().kind != TokenKind::RightSquare {
                return Err(self.err(AsmError::ExpectedBracketAfterImm, tok.span));
            }
            let num = str_to_int(self.text(tok.span))
                .ok_or_else(|| self.err(AsmError::OffsetImm32, tok.span))?;
            if num >> 32 != 0 {
                return Err(self.err(AsmError::OffsetImm32, tok.span));
            }
            ro.imm = RoImm::U32(num as u32);
            ro.layout |= RO_LAYOUT_IR_INT;
            self.cur.eat(); // closing bracket
            Ok(ro)
        } else if tok.kind == TokenKind::RegisterDefinition {
            // <iR> +/- <iR> * <i16>
            if reg_kind(tok.reg_tag()) != RegKind::Integer {
                return Err(self.err(AsmError::ExpectedIntOffset, tok.span));
            }
            ro.offset = Some(RegisterId {
                span: tok.span,
                id: tok.reg_tag(),
            });

            let star = self.cur.eat();
            if star.kind != TokenKind::Asterisk {
                return Err(self.err(AsmError::ExpectedScaleOperator, star.span));
            }

            let num_tok = self.cur.eat();
            let num = str_to_int(self.text(num_tok.span))
                .ok_or_else(|| self.err(AsmError::OffsetImm16, num_tok.span))?;
            if num >> 16 != 0 {
                return Err(self.err(AsmError::OffsetImm16, num_tok.span));
            }
            ro.imm = RoImm::U16(num as u16);

            let close = self.cur.eat();
            if close.kind != TokenKind::RightSquare {
                return Err(self.err(AsmError::ExpectedBracketAfterScale, close.span));
            }
            ro.layout |= RO_LAYOUT_IR_IR_INT;
            Ok(ro)
        } else {
            Err(self.err(AsmError::ExpectedOffsetOperand, tok.span))
        }
    }

    // ------------------------------------------------------------------
    // Literals

    /// A sign token must sit directly on its number. The value keeps the
    /// unsigned magnitude; the sign is recorded separately.
    fn parse_int_lit(&mut self, tok: &Token, sign: Option<&Token>) -> Result<IntLit, Msg> {
        let negative = self.check_sign(tok, sign)? == Some(TokenKind::Minus);
        let magnitude = str_to_int(self.text(tok.span))
            .ok_or_else(|| self.err(AsmError::IntOverflow, tok.span))?;
        Ok(IntLit {
            span: tok.span,
            value: magnitude,
            signed: negative,
            ty: None,
        })
    }

    fn parse_float_lit(&mut self, tok: &Token, sign: Option<&Token>) -> Result<FloatLit, Msg> {
        let negative = self.check_sign(tok, sign)? == Some(TokenKind::Minus);
        let magnitude: f64 = self
            .text(tok.span)
            .parse()
            .map_err(|_| self.err(AsmError::FloatOverflow, tok.span))?;
        if !magnitude.is_finite() {
            return Err(self.err(AsmError::FloatOverflow, tok.span));
        }
        Ok(FloatLit {
            span: tok.span,
            value: if negative { -magnitude } else { magnitude },
            ty: None,
        })
    }

    fn check_sign(&self, tok: &Token, sign: Option<&Token>) -> Result<Option<TokenKind>, Msg> {
        match sign {
            None => Ok(None),
            Some(sign_tok) => {
                if sign_tok.span.index + 1 != tok.span.index {
                    return Err(self.err(AsmError::UnexpectedOperator, sign_tok.span));
                }
                Ok(Some(sign_tok.kind))
            }
        }
    }

    fn parse_string_lit(&mut self, tok: &Token) -> StrLit {
        StrLit {
            span: tok.span,
            bytes: expand_escapes(self.text(tok.span).as_bytes()),
        }
    }
}

/// Base 16 when `0x`-prefixed, base 10 otherwise. `None` when the value
/// does not fit into 64 bits.
fn str_to_int(text: &str) -> Option<u64> {
    if text.len() >= 3 && (text.starts_with("0x") || text.starts_with("0X")) {
        u64::from_str_radix(&text[2..], 16).ok()
    } else {
        text.parse().ok()
    }
}

/// Expands the recognised escapes of a quoted literal and strips the
/// quotes. An unknown escape ends expansion without adding further bytes.
fn expand_escapes(raw: &[u8]) -> Vec<u8> {
    if raw.len() <= 2 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(raw.len() - 2);
    let mut cursor = 1;
    while cursor + 1 < raw.len() {
        let mut byte = raw[cursor];
        if byte == b'\\' {
            byte = match raw[cursor + 1] {
                b't' => 0x09,
                b'v' => 0x0B,
                b'0' => 0x00,
                b'b' => 0x08,
                b'f' => 0x0C,
                b'n' => 0x0A,
                b'r' => 0x0D,
                b'"' => 0x22,
                b'\\' => 0x5C,
                _ => return out,
            };
            cursor += 1;
        }
        out.push(byte);
        cursor += 1;
    }
    out
}
