use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

pub mod asm;
pub mod asm_gen;
pub mod cursor;
pub mod data_layout;
pub mod error;
pub mod frame;
pub mod ir;
pub mod ir_gen;
pub mod parser;
pub mod stack;
pub mod symbol_table;
pub mod temp;
pub mod tokenizer;

use error::{CompileError, Result};
use parser::Program;

#[derive(Debug)]
pub struct Compilation {
    pub tac: String,
    pub asm: String,
}

/// Tokenize, analyze and lower `source` to TAC.
pub fn front_end(source: &str) -> Result<Program> {
    let tokens = tokenizer::tokenize(source);
    parser::Parser::new(Box::new(tokens)).parse()
}

pub fn compile(source: &str) -> Result<Compilation> {
    let program = front_end(source)?;
    let asm = asm_gen::generate(&program.tac, &program.layout);
    Ok(Compilation {
        tac: program.tac,
        asm,
    })
}

/// Compile `input` to `<input>.tac` and `<input>.asm`, returning both paths.
///
/// The code generator reads the TAC back from disk, so the `.tac` file is the
/// hand-off between the two halves of the compiler.
pub fn compile_file(input: &Path) -> Result<(PathBuf, PathBuf)> {
    let tac_path = input.with_extension("tac");
    let asm_path = input.with_extension("asm");
    for path in [&tac_path, &asm_path] {
        if path.as_path() == input {
            return Err(CompileError::OutputOverwritesInput { path: path.clone() });
        }
    }

    let source = std::fs::read_to_string(input)?;
    let program = front_end(&source)?;

    std::fs::write(&tac_path, &program.tac)?;
    info!("wrote {}", tac_path.display());

    let tac = std::fs::read_to_string(&tac_path)?;
    let listing = asm_gen::generate_listing(&tac, &program.layout);
    let mut out = BufWriter::new(File::create(&asm_path)?);
    listing.write(&mut out)?;
    out.flush()?;
    info!("wrote {}", asm_path.display());

    Ok((tac_path, asm_path))
}
