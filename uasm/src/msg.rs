use std::fmt;

use color_print::cprintln;

use crate::error::AsmError;
use crate::grammar::token::Span;
use crate::source::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanner,
    Parser,
    TypeChecker,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Scanner => write!(f, "Scanner"),
            Stage::Parser => write!(f, "Parser"),
            Stage::TypeChecker => write!(f, "Type Checker"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    Error,
    Warn,
}

/// One diagnostic, tied to a source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    pub kind: MsgKind,
    pub stage: Stage,
    pub err: AsmError,
    pub span: Span,
}

impl Msg {
    pub fn error(stage: Stage, err: AsmError, span: Span) -> Self {
        Msg {
            kind: MsgKind::Error,
            stage,
            err,
            span,
        }
    }

    pub fn warn(stage: Stage, err: AsmError, span: Span) -> Self {
        Msg {
            kind: MsgKind::Warn,
            stage,
            err,
            span,
        }
    }

    fn head(&self) -> String {
        format!(
            "[{}] {} at Ln {}, Col {}",
            self.stage, self.err, self.span.line_row, self.span.line_col
        )
    }

    fn underline(&self, src: &SourceFile) -> (String, String) {
        let (line, line_start) = src.line_of(self.span.index);
        let pad = self.span.index.saturating_sub(line_start) as usize;
        let width = (self.span.size.max(1) as usize).min(line.len().saturating_sub(pad).max(1));
        let carets = format!("{}{}", " ".repeat(pad), "^".repeat(width));
        (line.to_string(), carets)
    }

    /// Plain-text rendering: header, source echo, caret underline.
    pub fn render(&self, src: &SourceFile) -> String {
        let (line, carets) = self.underline(src);
        format!("{}\n{}\n{}", self.head(), line, carets)
    }

    pub fn print(&self, src: &SourceFile) {
        match self.kind {
            MsgKind::Error => cprintln!("<red,bold>{}</>", self.head()),
            MsgKind::Warn => cprintln!("<yellow,bold>{}</>", self.head()),
        }
        let (line, carets) = self.underline(src);
        println!("{line}");
        cprintln!("<blue>{}</>", carets);
    }
}

pub fn dump(msgs: &[Msg], src: &SourceFile) {
    for msg in msgs {
        msg.print(src);
    }
}

pub fn has_error(msgs: &[Msg]) -> bool {
    msgs.iter().any(|msg| msg.kind == MsgKind::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_echo_and_caret() {
        let src = SourceFile::new("test", "code {\n    push i32, 99999999999\n}\n");
        let span = Span {
            index: 21,
            size: 11,
            line_row: 2,
            line_col: 15,
        };
        let msg = Msg::error(Stage::TypeChecker, AsmError::IntWidth, span);
        let rendered = msg.render(&src);
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next(),
            Some("[Type Checker] Integer does not fit into given type at Ln 2, Col 15")
        );
        assert_eq!(lines.next(), Some("    push i32, 99999999999"));
        assert_eq!(lines.next(), Some("              ^^^^^^^^^^^"));
    }
}
