use std::fmt::Display;

// Three-address code. Every instruction is one line of whitespace separated
// fields; `Display` writes that line and `Instruction::parse` reads it back.

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Operand {
    // global variable, module level temporary or string label
    Name(String),
    Literal(String),
    // _bp+N / _bp-N
    Frame(i64),
    // *_bp+N, the word addressed by the frame slot
    Indirect(i64),
    // @operand
    AddressOf(Box<Operand>),
}

impl Operand {
    pub fn parse(s: &str) -> Operand {
        if let Some(rest) = s.strip_prefix('@') {
            return Operand::AddressOf(Box::new(Operand::parse(rest)));
        }
        if let Some(d) = s.strip_prefix('*').and_then(parse_frame) {
            return Operand::Indirect(d);
        }
        if let Some(d) = parse_frame(s) {
            return Operand::Frame(d);
        }
        let mut chars = s.chars();
        let literal = match chars.next() {
            Some(c) if c.is_ascii_digit() || c == '.' => true,
            Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
            _ => false,
        };
        if literal {
            Operand::Literal(s.to_owned())
        } else {
            Operand::Name(s.to_owned())
        }
    }
}

fn parse_frame(s: &str) -> Option<i64> {
    let rest = s.strip_prefix("_bp").or_else(|| s.strip_prefix("_BP"))?;
    if let Some(n) = rest.strip_prefix('+') {
        n.parse::<i64>().ok()
    } else if let Some(n) = rest.strip_prefix('-') {
        n.parse::<i64>().ok().map(|n| -n)
    } else {
        None
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Name(s) | Operand::Literal(s) => f.write_str(s),
            Operand::Frame(d) if *d < 0 => write!(f, "_bp-{}", -d),
            Operand::Frame(d) => write!(f, "_bp+{}", d),
            Operand::Indirect(d) => write!(f, "*{}", Operand::Frame(*d)),
            Operand::AddressOf(o) => write!(f, "@{}", o),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Div,
    Mod,
    And,
    Or,
}

impl BinOp {
    /// Operator from its source or TAC spelling.
    pub fn parse(s: &str) -> Option<BinOp> {
        let op = match s {
            "+" => BinOp::Plus,
            "-" => BinOp::Minus,
            "*" => BinOp::Multiply,
            "/" => BinOp::Divide,
            "DIV" => BinOp::Div,
            "MOD" => BinOp::Mod,
            "AND" | "&" => BinOp::And,
            "OR" => BinOp::Or,
            _ => return None,
        };
        Some(op)
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Div => "DIV",
            BinOp::Mod => "MOD",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
    ProcStart(String),
    ProcEnd(String),
    // entry procedure of the program
    Start(String),
    Assign {
        dst: Operand,
        src: Operand,
    },
    BinaryAssign {
        dst: Operand,
        left: Operand,
        op: BinOp,
        right: Operand,
    },
    Read(Vec<Operand>),
    WriteInt(Operand),
    WriteStr(Operand),
    WriteLn,
    // a `WR*` line that is none of the above
    UnknownWrite(String),
    Push(Operand),
    Pop(Operand),
    Call(String),
    // anything else, kept as written
    Verbatim(String),
}

impl Instruction {
    /// Classify one TAC line, `None` for a blank line.
    pub fn parse(line: &str) -> Option<Instruction> {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let (first, rest) = fields.split_first()?;
        let opcode = first.to_ascii_uppercase();
        let inst = match (opcode.as_str(), rest) {
            ("PROC", [name]) => Instruction::ProcStart(name.to_string()),
            ("ENDP", [name]) => Instruction::ProcEnd(name.to_string()),
            ("START", [name]) => Instruction::Start(name.to_string()),
            ("RD", ids) if !ids.is_empty() => {
                Instruction::Read(ids.iter().map(|s| Operand::parse(s)).collect())
            }
            ("WRI", [operand]) => Instruction::WriteInt(Operand::parse(operand)),
            ("WRS", [operand]) => Instruction::WriteStr(Operand::parse(operand)),
            ("WRLN", []) => Instruction::WriteLn,
            (w, _) if w.starts_with("WR") => Instruction::UnknownWrite(line.trim().to_string()),
            ("PUSH", [operand]) => Instruction::Push(Operand::parse(operand)),
            ("POP", [operand]) => Instruction::Pop(Operand::parse(operand)),
            ("CALL", [name]) => Instruction::Call(name.to_string()),
            (_, ["=", src]) => Instruction::Assign {
                dst: Operand::parse(first),
                src: Operand::parse(src),
            },
            (_, ["=", left, op, right]) => match BinOp::parse(&op.to_ascii_uppercase()) {
                Some(op) => Instruction::BinaryAssign {
                    dst: Operand::parse(first),
                    left: Operand::parse(left),
                    op,
                    right: Operand::parse(right),
                },
                None => Instruction::Verbatim(line.trim().to_string()),
            },
            _ => Instruction::Verbatim(line.trim().to_string()),
        };
        Some(inst)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::ProcStart(name) => write!(f, "PROC {}", name),
            Instruction::ProcEnd(name) => write!(f, "ENDP {}", name),
            Instruction::Start(name) => write!(f, "START {}", name),
            Instruction::Assign { dst, src } => write!(f, "{} = {}", dst, src),
            Instruction::BinaryAssign {
                dst,
                left,
                op,
                right,
            } => write!(f, "{} = {} {} {}", dst, left, op, right),
            Instruction::Read(ids) => {
                f.write_str("RD")?;
                for id in ids {
                    write!(f, " {}", id)?;
                }
                Ok(())
            }
            Instruction::WriteInt(o) => write!(f, "WRI {}", o),
            Instruction::WriteStr(o) => write!(f, "WRS {}", o),
            Instruction::WriteLn => f.write_str("WRLN"),
            Instruction::Push(o) => write!(f, "PUSH {}", o),
            Instruction::Pop(o) => write!(f, "POP {}", o),
            Instruction::Call(name) => write!(f, "CALL {}", name),
            Instruction::UnknownWrite(line) | Instruction::Verbatim(line) => f.write_str(line),
        }
    }
}

/// Parse a whole TAC listing, skipping blank lines.
pub fn parse_listing(tac: &str) -> Vec<Instruction> {
    tac.lines().filter_map(Instruction::parse).collect()
}
