use arch::encoding::{self, ParamKind, SigNode};
use arch::reg::{reg_kind, RegKind};
use arch::types::UvmType;

use crate::error::AsmError;
use crate::grammar::ast::{
    CodeItem, CodeSection, Encoded, FileAst, Instruction, Operand, TypeInfo, VarSection,
};
use crate::grammar::token::Span;
use crate::msg::{Msg, MsgKind, Stage};

use super::symbols::{section_perm, LabelEntry, LabelTable, VarEntry, VarTable};

/// Walks a parsed file, attaching opcodes and operand types and resolving
/// symbol references by name. Errors accumulate so one pass surfaces as
/// many problems as possible; use a fresh checker per pass.
#[derive(Default)]
pub struct TypeChecker {
    pub vars: VarTable,
    pub labels: LabelTable,
    label_refs: Vec<(String, Span)>,
    msgs: Vec<Msg>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Msg] {
        &self.msgs
    }

    pub fn into_messages(self) -> Vec<Msg> {
        self.msgs
    }

    fn error(&mut self, err: AsmError, span: Span) {
        self.msgs.push(Msg::error(Stage::TypeChecker, err, span));
    }

    fn warn(&mut self, err: AsmError, span: Span) {
        self.msgs.push(Msg::warn(Stage::TypeChecker, err, span));
    }

    fn has_error(&self) -> bool {
        self.msgs.iter().any(|msg| msg.kind == MsgKind::Error)
    }

    /// Returns true iff no errors were recorded.
    pub fn check(&mut self, file: &mut FileAst) -> bool {
        for sec in [file.statics.as_mut(), file.globals.as_mut()]
            .into_iter()
            .flatten()
        {
            self.collect_vars(sec);
        }

        let Some(code) = file.code.as_mut() else {
            self.error(AsmError::MissingMainLabel, Span::default());
            return false;
        };
        if code.items.is_empty() {
            self.error(AsmError::MissingMainLabel, code.span);
            return false;
        }

        let has_main = code
            .items
            .iter()
            .any(|item| matches!(item, CodeItem::Label(label) if label.name == "main"));
        if !has_main {
            self.error(AsmError::MissingMainEntry, code.span);
            return false;
        }

        let mut instr_count = 0usize;
        for item in &mut code.items {
            match item {
                CodeItem::Label(label) => {
                    let entry = LabelEntry {
                        span: label.span,
                        vaddr: 0,
                    };
                    if self.labels.insert(&label.name, entry).is_none() {
                        self.error(AsmError::RedefinedLabel(label.name.clone()), label.span);
                    }
                }
                CodeItem::Instr(instr) => {
                    instr_count += 1;
                    self.check_instr(instr);
                }
            }
        }

        let refs = std::mem::take(&mut self.label_refs);
        for (name, span) in refs {
            if self.labels.get(&name).is_none() {
                self.error(AsmError::UnresolvedLabel(name), span);
            }
        }

        self.check_var_refs(code);

        if instr_count == 0 {
            self.warn(AsmError::EmptyCode, code.span);
        }

        !self.has_error()
    }

    /// Collects a section's declarations into the variable table.
    /// Redefinitions are recorded and skipped; the pass continues.
    fn collect_vars(&mut self, sec: &mut VarSection) {
        for var in &mut sec.vars {
            let entry = VarEntry {
                span: var.id.span,
                ty: var.ty.ty,
                section: sec.kind,
                perm: section_perm(sec.kind),
            };
            match self.vars.insert(&var.id.name, entry) {
                Some(index) => var.decl_index = index,
                None => self.error(AsmError::RedefinedVariable(var.id.name.clone()), var.span),
            }
        }
    }

    /// Matches an instruction against its mnemonic's signature trie,
    /// typing literal operands from the look-behind type info and
    /// collecting label references on the way. Sibling edges that do not
    /// accept an operand are skipped; their category diagnostics surface
    /// only once no edge of the node accepts it.
    fn check_instr(&mut self, instr: &mut Instruction) -> bool {
        let def = encoding::encoding().def(instr.def_index);

        // An instruction definition either takes no parameters at all or
        // at least one in every signature; a zero-operand definition is a
        // terminal root node.
        if instr.operands.is_empty() {
            return match &def.root.sig {
                Some(sig) if def.root.children.is_empty() => {
                    instr.encoding = Some(Encoded {
                        opcode: sig.opcode,
                        flags: sig.flags_byte(),
                        sig,
                    });
                    true
                }
                _ => {
                    self.error(AsmError::ExpectedParameters, instr.span);
                    false
                }
            };
        }

        let mut current: &'static SigNode = &def.root;
        let mut seen_type: Option<TypeInfo> = None;
        let mut range_error = false;
        let mut matched = None;
        let count = instr.operands.len();

        for (i, op) in instr.operands.iter_mut().enumerate() {
            let mut next: Option<&'static SigNode> = None;
            // Category diagnostics of non-accepting siblings, reported
            // only if the whole scan comes up empty.
            let mut rejected: Vec<(AsmError, Span)> = Vec::new();
            for edge in &current.children {
                match edge.kind {
                    ParamKind::IntType => {
                        let Operand::Type(info) = &*op else { continue };
                        if !info.ty.is_int() {
                            rejected.push((AsmError::ExpectedIntType, info.span));
                            continue;
                        }
                        seen_type = Some(*info);
                        next = Some(&edge.node);
                    }
                    ParamKind::FloatType => {
                        let Operand::Type(info) = &*op else { continue };
                        if !info.ty.is_float() {
                            rejected.push((AsmError::ExpectedFloatType, info.span));
                            continue;
                        }
                        seen_type = Some(*info);
                        next = Some(&edge.node);
                    }
                    ParamKind::IntReg => {
                        let Operand::Reg(reg) = &*op else { continue };
                        if reg_kind(reg.id) != RegKind::Integer {
                            rejected.push((AsmError::ExpectedIntReg, reg.span));
                            continue;
                        }
                        next = Some(&edge.node);
                    }
                    ParamKind::FloatReg => {
                        let Operand::Reg(reg) = &*op else { continue };
                        if reg_kind(reg.id) != RegKind::Float {
                            rejected.push((AsmError::ExpectedFloatReg, reg.span));
                            continue;
                        }
                        next = Some(&edge.node);
                    }
                    ParamKind::RegOffset => {
                        let Operand::Offset(_) = &*op else { continue };
                        next = Some(&edge.node);
                    }
                    ParamKind::LabelId => {
                        let Operand::Id(id) = &*op else { continue };
                        self.label_refs.push((id.name.clone(), id.span));
                        next = Some(&edge.node);
                    }
                    ParamKind::IntNum => {
                        let Operand::Int(num) = &mut *op else { continue };
                        let Some(info) = seen_type else { continue };
                        num.ty = Some(info.ty);
                        if !info.ty.int_fits(num.value) {
                            self.error(AsmError::IntWidth, num.span);
                            range_error = true;
                        }
                        next = Some(&edge.node);
                    }
                    ParamKind::FloatNum => {
                        let Operand::Float(num) = &mut *op else { continue };
                        let Some(info) = seen_type else { continue };
                        num.ty = Some(info.ty);
                        if !info.ty.float_fits(num.value) {
                            self.error(AsmError::FloatWidth, num.span);
                            range_error = true;
                        }
                        next = Some(&edge.node);
                    }
                    ParamKind::SysInt => {
                        let Operand::Int(num) = &mut *op else { continue };
                        // Syscall ids are always one byte.
                        num.ty = Some(UvmType::I8);
                        next = Some(&edge.node);
                    }
                }
                if next.is_some() {
                    break;
                }
            }

            let Some(node) = next else {
                for (err, span) in rejected {
                    self.error(err, span);
                }
                break;
            };
            current = node;
            if i + 1 == count {
                matched = current.sig.as_ref();
            }
        }

        let Some(sig) = matched else {
            self.error(AsmError::NoMatchingSignature(instr.name.clone()), instr.span);
            return false;
        };
        if range_error {
            return false;
        }

        let opcode = if sig.has_type_variants() {
            seen_type
                .and_then(|info| sig.variant_opcode(info.ty))
                .unwrap_or(0)
        } else {
            sig.opcode
        };
        instr.encoding = Some(Encoded {
            opcode,
            flags: sig.flags_byte(),
            sig,
        });
        true
    }

    /// Variable-addressed register offsets must name a declared variable.
    fn check_var_refs(&mut self, code: &CodeSection) {
        for item in &code.items {
            let CodeItem::Instr(instr) = item else { continue };
            for op in &instr.operands {
                let Operand::Offset(ro) = op else { continue };
                let Some(var) = &ro.var else { continue };
                if self.vars.get(&var.name).is_none() {
                    self.error(AsmError::UnresolvedVariable(var.name.clone()), var.span);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::lexer::Lexer;
    use crate::grammar::parser;
    use crate::source::SourceFile;

    fn check_src(text: &str) -> (bool, FileAst, Vec<Msg>) {
        let src = SourceFile::new("test", text);
        let (tokens, msgs) = Lexer::new(&src).scan();
        assert!(msgs.is_empty(), "scanner diagnostics: {msgs:?}");
        let mut file = match parser::parse(&src, &tokens) {
            Ok(file) => file,
            Err(msg) => panic!("parse failed: {:?}", msg.err),
        };
        let mut checker = TypeChecker::new();
        let ok = checker.check(&mut file);
        (ok, file, checker.into_messages())
    }

    fn errors(msgs: &[Msg]) -> Vec<&AsmError> {
        msgs.iter()
            .filter(|msg| msg.kind == MsgKind::Error)
            .map(|msg| &msg.err)
            .collect()
    }

    fn instructions(file: &FileAst) -> Vec<&Instruction> {
        file.code
            .as_ref()
            .unwrap()
            .items
            .iter()
            .filter_map(|item| match item {
                CodeItem::Instr(instr) => Some(instr),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn happy_path_attaches_opcodes_and_types() {
        let (ok, file, msgs) = check_src("code {\n@main\n    push i32, 42\n    exit\n}\n");
        assert!(ok, "diagnostics: {msgs:?}");

        let instrs = instructions(&file);
        let push = instrs[0].encoding.unwrap();
        assert_eq!(push.opcode, 0x03); // i32 variant
        match &instrs[0].operands[1] {
            Operand::Int(lit) => assert_eq!(lit.ty, Some(UvmType::I32)),
            other => panic!("expected int literal, got {other:?}"),
        }
        let exit = instrs[1].encoding.unwrap();
        assert_eq!(exit.opcode, 0x50);
    }

    #[test]
    fn literal_type_follows_the_leading_type_info() {
        let (ok, file, _) = check_src("code {\n@main\n    push i8, 7\n    add i64, r0, 1\n    exit\n}\n");
        assert!(ok);
        let instrs = instructions(&file);
        assert_eq!(instrs[0].encoding.unwrap().opcode, 0x01); // push i8
        match &instrs[0].operands[1] {
            Operand::Int(lit) => assert_eq!(lit.ty, Some(UvmType::I8)),
            other => panic!("expected int literal, got {other:?}"),
        }
        assert_eq!(instrs[1].encoding.unwrap().opcode, 0x34); // add i64 imm
        match &instrs[1].operands[2] {
            Operand::Int(lit) => assert_eq!(lit.ty, Some(UvmType::I64)),
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn register_signature_selects_the_non_variant_opcode() {
        let (ok, file, _) = check_src("code {\n@main\n    push i32, r3\n    exit\n}\n");
        assert!(ok);
        let push = instructions(&file)[0].encoding.unwrap();
        assert_eq!(push.opcode, 0x05);
        assert_eq!(push.flags, arch::encoding::INSTR_FLAG_ENCODE_TYPE);
    }

    #[test]
    fn int_literal_width_boundaries() {
        let (ok, _, _) = check_src("code {\n@main\n    push i8, 255\n    exit\n}\n");
        assert!(ok);

        let (ok, _, msgs) = check_src("code {\n@main\n    push i8, 256\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(errors(&msgs), vec![&AsmError::IntWidth]);
    }

    #[test]
    fn register_class_mismatches() {
        let (ok, _, _) = check_src("code {\n@main\n    add i32, r0, r1\n    exit\n}\n");
        assert!(ok);

        let (ok, _, msgs) = check_src("code {\n@main\n    add f32, r0, r1\n    exit\n}\n");
        assert!(!ok);
        assert!(errors(&msgs).contains(&&AsmError::ExpectedIntType));

        let (ok, _, msgs) = check_src("code {\n@main\n    add i32, f0, r1\n    exit\n}\n");
        assert!(!ok);
        assert!(errors(&msgs).contains(&&AsmError::ExpectedIntReg));
        assert!(errors(&msgs).contains(&&AsmError::NoMatchingSignature("add".into())));
    }

    #[test]
    fn float_instructions() {
        let (ok, file, msgs) =
            check_src("code {\n@main\n    addf f64, f0, -2.5\n    exit\n}\n");
        assert!(ok, "diagnostics: {msgs:?}");
        let addf = instructions(&file)[0];
        assert_eq!(addf.encoding.unwrap().opcode, 0x37); // f64 variant
        match &addf.operands[2] {
            Operand::Float(lit) => {
                assert_eq!(lit.ty, Some(UvmType::F64));
                assert!(lit.value < 0.0);
            }
            other => panic!("expected float literal, got {other:?}"),
        }
    }

    #[test]
    fn sys_forces_the_syscall_id_to_one_byte() {
        let (ok, file, _) = check_src("code {\n@main\n    sys 0\n    exit\n}\n");
        assert!(ok);
        let sys = instructions(&file)[0];
        assert_eq!(sys.encoding.unwrap().opcode, 0x40);
        match &sys.operands[0] {
            Operand::Int(lit) => assert_eq!(lit.ty, Some(UvmType::I8)),
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn zero_operand_mnemonic_rejects_operands() {
        let (ok, _, msgs) = check_src("code {\n@main\n    nop r0\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(
            errors(&msgs),
            vec![&AsmError::NoMatchingSignature("nop".into())]
        );
    }

    #[test]
    fn missing_operands_are_rejected() {
        let (ok, _, msgs) = check_src("code {\n@main\n    push\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(errors(&msgs), vec![&AsmError::ExpectedParameters]);

        // A prefix of a valid signature is not a match.
        let (ok, _, msgs) = check_src("code {\n@main\n    pop i8, r0, r1\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(
            errors(&msgs),
            vec![&AsmError::NoMatchingSignature("pop".into())]
        );
    }

    #[test]
    fn label_references_resolve_forward() {
        let (ok, _, msgs) =
            check_src("code {\n@main\n    jmp loop\n@loop\n    sys 0\n    exit\n}\n");
        assert!(ok, "diagnostics: {msgs:?}");

        let (ok, _, msgs) = check_src("code {\n@main\n    jmp end\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(errors(&msgs), vec![&AsmError::UnresolvedLabel("end".into())]);
    }

    #[test]
    fn duplicate_labels_report_once() {
        let (ok, _, msgs) = check_src("code {\n@main\n    exit\n@main\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(
            errors(&msgs),
            vec![&AsmError::RedefinedLabel("main".into())]
        );
    }

    #[test]
    fn missing_main_is_fatal() {
        let (ok, _, msgs) = check_src("code {\n@start\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(errors(&msgs), vec![&AsmError::MissingMainEntry]);

        let (ok, _, msgs) = check_src("code {\n}\n");
        assert!(!ok);
        assert_eq!(errors(&msgs), vec![&AsmError::MissingMainLabel]);
    }

    #[test]
    fn labels_without_instructions_only_warn() {
        let (ok, _, msgs) = check_src("code {\n@main\n}\n");
        assert!(ok);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].kind, MsgKind::Warn);
        assert_eq!(msgs[0].err, AsmError::EmptyCode);
    }

    #[test]
    fn variable_addressing_resolves_against_static_and_global() {
        let (ok, file, msgs) = check_src(
            "static {\n    msg : i8 = \"hi\"\n}\nglobal {\n    counter : i64 = 0\n}\ncode {\n@main\n    lea [msg], r0\n    lea [counter], r1\n    exit\n}\n",
        );
        assert!(ok, "diagnostics: {msgs:?}");
        assert_eq!(file.statics.as_ref().unwrap().vars[0].decl_index, 0);
        assert_eq!(file.globals.as_ref().unwrap().vars[0].decl_index, 1);

        let (ok, _, msgs) = check_src("code {\n@main\n    lea [nope], r0\n    exit\n}\n");
        assert!(!ok);
        assert_eq!(
            errors(&msgs),
            vec![&AsmError::UnresolvedVariable("nope".into())]
        );
    }

    #[test]
    fn variable_redefinition_across_sections() {
        let (ok, _, msgs) = check_src(
            "static {\n    x : i32 = 1\n}\nglobal {\n    x : i64 = 2\n}\ncode {\n@main\n    exit\n}\n",
        );
        assert!(!ok);
        assert_eq!(
            errors(&msgs),
            vec![&AsmError::RedefinedVariable("x".into())]
        );
    }

    #[test]
    fn variable_table_records_section_permissions() {
        let src = SourceFile::new(
            "test",
            "static {\n    ro : i32 = 1\n}\nglobal {\n    rw : i32 = 2\n}\ncode {\n@main\n    exit\n}\n",
        );
        let (tokens, _) = Lexer::new(&src).scan();
        let mut file = parser::parse(&src, &tokens).unwrap();
        let mut checker = TypeChecker::new();
        assert!(checker.check(&mut file));

        use crate::check::symbols::{PERM_READ, PERM_WRITE};
        assert_eq!(checker.vars.get("ro").unwrap().perm, PERM_READ);
        assert_eq!(checker.vars.get("rw").unwrap().perm, PERM_READ | PERM_WRITE);
    }

    #[test]
    fn checking_twice_is_idempotent() {
        let text = "code {\n@main\n    push i32, 42\n    jmp main\n    exit\n}\n";
        let src = SourceFile::new("test", text);
        let (tokens, _) = Lexer::new(&src).scan();
        let mut file = parser::parse(&src, &tokens).unwrap();

        let mut first = TypeChecker::new();
        assert!(first.check(&mut file));
        let types_first: Vec<_> = instructions(&file)
            .iter()
            .flat_map(|instr| instr.operands.iter())
            .filter_map(|op| match op {
                Operand::Int(lit) => Some(lit.ty),
                _ => None,
            })
            .collect();

        let mut second = TypeChecker::new();
        assert!(second.check(&mut file));
        let types_second: Vec<_> = instructions(&file)
            .iter()
            .flat_map(|instr| instr.operands.iter())
            .filter_map(|op| match op {
                Operand::Int(lit) => Some(lit.ty),
                _ => None,
            })
            .collect();

        assert_eq!(types_first, types_second);
    }

    #[test]
    fn every_checked_instruction_has_an_opcode() {
        let (ok, file, msgs) = check_src(
            "static {\n    msg : i8 = \"hello\\n\"\n}\ncode {\n@main\n    nop\n    push i32, 42\n    pop i8\n    load i32, [bp - 8], r2\n    store i32, r2, [bp - 8]\n    lea [msg], r0\n    copy i32, 1, [r0]\n    sqrt f32, f1\n    cmp i32, r0, r1\n    call fn\n@fn\n    ret\n    exit\n}\n",
        );
        assert!(ok, "diagnostics: {msgs:?}");
        for instr in instructions(&file) {
            let enc = instr.encoding.unwrap();
            assert!(
                enc.opcode != 0 || instr.name == "nop",
                "{} has no opcode",
                instr.name
            );
        }
        // The nop opcode itself.
        assert_eq!(instructions(&file)[0].encoding.unwrap().opcode, 0xA0);
    }
}
