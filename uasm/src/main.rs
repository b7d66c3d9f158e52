use color_print::cprintln;

use uasm::check::typecheck::TypeChecker;
use uasm::grammar::ast::{CodeItem, FileAst};
use uasm::grammar::lexer::Lexer;
use uasm::grammar::parser;
use uasm::msg;
use uasm::source::SourceFile;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "UVM assembler front end", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    #[clap(default_value = "main.uasm")]
    input: String,

    /// Dump the checked AST
    #[clap(short, long)]
    dump: bool,
}

fn main() {
    use clap::Parser;

    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.input) {
        Ok(text) => text,
        Err(err) => {
            cprintln!("<red,bold>error</>: failed to open `{}`: {}", args.input, err);
            std::process::exit(1);
        }
    };
    let src = SourceFile::new(args.input.as_str(), text);

    // 1. Scan
    let (tokens, scan_msgs) = Lexer::new(&src).scan();
    msg::dump(&scan_msgs, &src);
    if msg::has_error(&scan_msgs) {
        std::process::exit(1);
    }

    // 2. Parse
    let mut file = match parser::parse(&src, &tokens) {
        Ok(file) => file,
        Err(err) => {
            err.print(&src);
            std::process::exit(1);
        }
    };

    // 3. Type check
    let mut checker = TypeChecker::new();
    let ok = checker.check(&mut file);
    msg::dump(checker.messages(), &src);
    if !ok {
        std::process::exit(1);
    }

    if args.dump {
        dump_ast(&file);
    }
}

fn dump_ast(file: &FileAst) {
    for sec in [&file.statics, &file.globals].into_iter().flatten() {
        cprintln!("<blue,bold>{}</> {{", sec.name);
        for var in &sec.vars {
            cprintln!("  {:<12} : <green>{}</>", var.id.name, var.ty.ty);
        }
        println!("}}");
    }
    if let Some(code) = &file.code {
        cprintln!("<blue,bold>{}</> {{", code.name);
        for item in &code.items {
            match item {
                CodeItem::Label(label) => cprintln!("<yellow>@{}</>", label.name),
                CodeItem::Instr(instr) => {
                    let opcode = instr.encoding.map(|enc| enc.opcode).unwrap_or(0);
                    cprintln!("  <red>0x{:02X}</> {}", opcode, instr.name);
                }
            }
        }
        println!("}}");
    }
}
