use std::{fmt::Display, io::Write};

/// One line of 8086 assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // segment and model directives, includes, anything passed through
    Directive(String),
    Data {
        label: String,
        definition: String,
    },
    ProcStart(String),
    ProcEnd(String),
    // `d<i>` / `s<i>` placeholders are replaced by the operands
    Operation {
        assembly: String,
        destination: Vec<String>,
        source: Vec<String>,
    },
    Comment(String),
}

impl Instruction {
    pub fn op(assembly: &str, destination: Vec<String>, source: Vec<String>) -> Instruction {
        Instruction::Operation {
            assembly: assembly.to_string(),
            destination,
            source,
        }
    }

    // operation without operands
    pub fn plain(assembly: &str) -> Instruction {
        Instruction::op(assembly, vec![], vec![])
    }

    pub fn instance(&self) -> String {
        match self {
            Instruction::Directive(s) => s.clone(),
            Instruction::Data { label, definition } => format!("{} {}", label, definition),
            Instruction::ProcStart(name) => format!("{} PROC", name),
            Instruction::ProcEnd(name) => format!("{} ENDP", name),
            Instruction::Operation {
                assembly,
                destination,
                source,
            } => {
                let mut assembly = assembly.clone();
                for (i, v) in destination.iter().enumerate() {
                    assembly = assembly.replace(&format!("`d{}", i), v);
                }
                for (i, v) in source.iter().enumerate() {
                    assembly = assembly.replace(&format!("`s{}", i), v);
                }
                assembly
            }
            Instruction::Comment(s) => format!("; {}", s),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub instructions: Vec<Instruction>,
}

impl Listing {
    pub fn new() -> Listing {
        Listing::default()
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for inst in &self.instructions {
            writeln!(w, "{}", inst.instance())?;
        }
        Ok(())
    }
}

impl Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in &self.instructions {
            writeln!(f, "{}", i.instance())?;
        }
        Ok(())
    }
}
