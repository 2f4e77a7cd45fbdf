use log::{debug, warn};

use crate::asm::{self, Instruction as Asm};
use crate::data_layout::DataLayout;
use crate::frame::Frame;
use crate::ir::{self, BinOp, Operand};

/// Translate a TAC listing to 8086 assembly. The TAC is parsed once up front;
/// the layout supplies what the TAC text does not carry.
pub fn generate(tac: &str, layout: &DataLayout) -> String {
    generate_listing(tac, layout).to_string()
}

pub fn generate_listing(tac: &str, layout: &DataLayout) -> asm::Listing {
    let program = ir::parse_listing(tac);
    let mut gen = Gen::new(layout);
    gen.munch_intro();
    gen.munch_program(program);
    gen.munch_main();
    gen.result()
}

pub struct Gen<'a> {
    layout: &'a DataLayout,
    listing: asm::Listing,
    // procedure whose body is being translated
    current: Option<(String, Frame)>,
    start: Option<String>,
}

impl<'a> Gen<'a> {
    pub fn new(layout: &'a DataLayout) -> Self {
        Gen {
            layout,
            listing: asm::Listing::new(),
            current: None,
            start: None,
        }
    }

    pub fn result(self) -> asm::Listing {
        self.listing
    }

    fn emit(&mut self, inst: Asm) {
        self.listing.push(inst);
    }

    fn emit_op(&mut self, assembly: &str, destination: &[&str], source: &[&str]) {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        self.emit(Asm::op(assembly, strings(destination), strings(source)));
    }

    pub fn munch_intro(&mut self) {
        self.emit(Asm::Directive(".model small".to_string()));
        self.emit(Asm::Directive(".stack 100h".to_string()));
        self.emit(Asm::Directive(".data".to_string()));
        let layout = self.layout;
        for name in &layout.globals {
            self.emit(Asm::Data {
                label: name.clone(),
                definition: "DW ?".to_string(),
            });
        }
        for (label, content) in &layout.strings {
            self.emit(Asm::Data {
                label: label.clone(),
                definition: format!("DB \"{}\",\"$\"", content.replace('"', "\"\"")),
            });
        }
        self.emit(Asm::Directive(".code".to_string()));
        self.emit(Asm::Directive("include io.asm".to_string()));
    }

    pub fn munch_program(&mut self, program: Vec<ir::Instruction>) {
        for inst in program {
            self.munch_instruction(inst);
        }
        if let Some((name, _)) = &self.current {
            warn!("procedure {} has no ENDP", name);
        }
    }

    pub fn munch_main(&mut self) {
        self.emit(Asm::ProcStart("main".to_string()));
        self.emit_op("mov `d0, @data", &["ax"], &[]);
        self.emit_op("mov `d0, `s0", &["ds"], &["ax"]);
        match self.start.clone() {
            Some(start) => self.emit_op("call `s0", &[], &[start.as_str()]),
            None => warn!("no START instruction, main calls nothing"),
        }
        self.emit_op("mov `d0, 04ch", &["ah"], &[]);
        self.emit(Asm::plain("int 21h"));
        self.emit(Asm::ProcEnd("main".to_string()));
        self.emit(Asm::Directive("END main".to_string()));
    }

    pub fn munch_instruction(&mut self, inst: ir::Instruction) {
        match inst {
            ir::Instruction::ProcStart(name) => {
                let frame = self.frame_of(&name);
                debug!("procedure {}: {:?}", name, frame);
                self.emit(Asm::ProcStart(name.clone()));
                self.emit_op("push `s0", &[], &["bp"]);
                self.emit_op("mov `d0, `s0", &["bp"], &["sp"]);
                self.emit_op("sub `d0, `s0", &["sp"], &[frame.size_of_locals.to_string().as_str()]);
                self.current = Some((name, frame));
            }
            ir::Instruction::ProcEnd(name) => {
                let frame = match self.current.take() {
                    Some((open, frame)) if open == name => frame,
                    _ => {
                        warn!("ENDP {} does not close the open procedure", name);
                        self.frame_of(&name)
                    }
                };
                self.emit_op("add `d0, `s0", &["sp"], &[frame.size_of_locals.to_string().as_str()]);
                self.emit_op("pop `d0", &["bp"], &[]);
                self.emit_op("ret `s0", &[], &[frame.size_of_parameters.to_string().as_str()]);
                self.emit(Asm::ProcEnd(name));
            }
            ir::Instruction::Start(name) => self.start = Some(name),
            ir::Instruction::Assign { dst, src } => {
                self.load("ax", &src);
                self.store("ax", &dst);
            }
            ir::Instruction::BinaryAssign {
                dst,
                left,
                op,
                right,
            } => {
                self.load("ax", &left);
                self.load("bx", &right);
                match op {
                    BinOp::Plus => self.emit_op("add `d0, `s0", &["ax"], &["bx"]),
                    BinOp::Minus => self.emit_op("sub `d0, `s0", &["ax"], &["bx"]),
                    BinOp::Multiply => self.emit_op("imul `s0", &[], &["bx"]),
                    BinOp::Divide | BinOp::Div => {
                        self.emit(Asm::plain("cwd"));
                        self.emit_op("idiv `s0", &[], &["bx"]);
                    }
                    BinOp::Mod => {
                        self.emit(Asm::plain("cwd"));
                        self.emit_op("idiv `s0", &[], &["bx"]);
                        self.emit_op("mov `d0, `s0", &["ax"], &["dx"]);
                    }
                    BinOp::And => self.emit_op("and `d0, `s0", &["ax"], &["bx"]),
                    BinOp::Or => self.emit_op("or `d0, `s0", &["ax"], &["bx"]),
                }
                self.store("ax", &dst);
            }
            ir::Instruction::Read(ids) => {
                for id in ids {
                    self.emit_op("call `s0", &[], &["readint"]);
                    self.store("bx", &id);
                }
            }
            ir::Instruction::WriteInt(operand) => {
                self.load("ax", &operand);
                self.emit_op("call `s0", &[], &["writeint"]);
            }
            ir::Instruction::WriteStr(label) => {
                self.emit(Asm::op(
                    "mov `d0, OFFSET `s0",
                    vec!["dx".to_string()],
                    vec![label.to_string()],
                ));
                self.emit_op("call `s0", &[], &["writestr"]);
            }
            ir::Instruction::WriteLn => self.emit_op("call `s0", &[], &["writeln"]),
            ir::Instruction::UnknownWrite(line) => {
                warn!("unknown write operation: {}", line);
                self.emit(Asm::Comment(format!("unknown write operation: {}", line)));
            }
            ir::Instruction::Push(operand) => match operand {
                Operand::Name(_) | Operand::Frame(_) => {
                    self.emit(Asm::op("push `s0", vec![], vec![translate_operand(&operand)]));
                }
                _ => {
                    self.load("ax", &operand);
                    self.emit_op("push `s0", &[], &["ax"]);
                }
            },
            ir::Instruction::Pop(operand) => match operand {
                Operand::Name(_) | Operand::Frame(_) => {
                    self.emit(Asm::op("pop `d0", vec![translate_operand(&operand)], vec![]));
                }
                _ => {
                    self.emit_op("pop `d0", &["ax"], &[]);
                    self.store("ax", &operand);
                }
            },
            ir::Instruction::Call(name) => {
                self.emit(Asm::op("call `s0", vec![], vec![name]));
            }
            ir::Instruction::Verbatim(line) => {
                debug!("passing through: {}", line);
                self.emit(Asm::Directive(line));
            }
        }
    }

    fn frame_of(&self, name: &str) -> Frame {
        match self.layout.frame(name) {
            Some(frame) => *frame,
            None => {
                warn!("no frame recorded for procedure {}", name);
                Frame::default()
            }
        }
    }

    // value of `operand` into `reg`
    fn load(&mut self, reg: &str, operand: &Operand) {
        match operand {
            Operand::Indirect(d) => {
                self.emit(Asm::op(
                    "mov `d0, `s0",
                    vec!["si".to_string()],
                    vec![frame_slot(*d)],
                ));
                self.emit_op("mov `d0, [`s0]", &[reg], &["si"]);
            }
            Operand::AddressOf(inner) => match inner.as_ref() {
                Operand::Frame(d) => {
                    self.emit(Asm::op("lea `d0, `s0", vec![reg.to_string()], vec![frame_slot(*d)]));
                }
                Operand::Name(_) => {
                    self.emit(Asm::op(
                        "mov `d0, `s0",
                        vec![reg.to_string()],
                        vec![translate_operand(operand)],
                    ));
                }
                // `@*_bp+N` is the slot itself
                Operand::Indirect(d) => {
                    self.emit(Asm::op("mov `d0, `s0", vec![reg.to_string()], vec![frame_slot(*d)]));
                }
                other => {
                    warn!("cannot take the address of {}", other);
                    self.emit(Asm::Comment(format!("cannot take the address of {}", other)));
                }
            },
            _ => {
                self.emit(Asm::op(
                    "mov `d0, `s0",
                    vec![reg.to_string()],
                    vec![translate_operand(operand)],
                ));
            }
        }
    }

    // `reg` into the location named by `operand`
    fn store(&mut self, reg: &str, operand: &Operand) {
        match operand {
            Operand::Name(_) | Operand::Frame(_) => {
                self.emit(Asm::op(
                    "mov `d0, `s0",
                    vec![translate_operand(operand)],
                    vec![reg.to_string()],
                ));
            }
            Operand::Indirect(d) => {
                self.emit(Asm::op(
                    "mov `d0, `s0",
                    vec!["si".to_string()],
                    vec![frame_slot(*d)],
                ));
                self.emit_op("mov [`d0], `s0", &["si"], &[reg]);
            }
            Operand::Literal(_) | Operand::AddressOf(_) => {
                warn!("cannot store to {}", operand);
                self.emit(Asm::Comment(format!("cannot store to {}", operand)));
            }
        }
    }
}

fn frame_slot(displacement: i64) -> String {
    if displacement < 0 {
        format!("[BP-{}]", -displacement)
    } else {
        format!("[BP+{}]", displacement)
    }
}

/// `@x` -> `OFFSET x`, `_bp+N` -> `[BP+N]`, everything else unchanged.
pub fn translate_operand(operand: &Operand) -> String {
    match operand {
        Operand::Name(s) | Operand::Literal(s) => s.clone(),
        Operand::Frame(d) => frame_slot(*d),
        Operand::Indirect(d) => format!("*{}", frame_slot(*d)),
        Operand::AddressOf(inner) => format!("OFFSET {}", translate_operand(inner)),
    }
}
