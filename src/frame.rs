use crate::data_layout::FRAME_LINKAGE;
use crate::ir::Operand;
use crate::symbol_table::{Procedure, Variable};

/// Where a variable lives at run time.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Access {
    // depth 0, addressed by its name
    Global,
    // displacement to frame pointer
    Frame(i64),
    // displacement to frame pointer of a slot holding the variable's address
    Indirect(i64),
}

impl Access {
    pub fn of(var: &Variable) -> Access {
        if var.depth == 0 {
            Access::Global
        } else if var.is_parameter {
            // first parameter is pushed first, so it sits at the highest address
            let displacement = FRAME_LINKAGE + var.offset - var.size;
            if var.by_reference {
                Access::Indirect(displacement)
            } else {
                Access::Frame(displacement)
            }
        } else {
            Access::Frame(-(var.offset + var.size))
        }
    }

    pub fn value(&self, name: &str) -> Operand {
        match *self {
            Access::Global => Operand::Name(name.to_owned()),
            Access::Frame(d) => Operand::Frame(d),
            Access::Indirect(d) => Operand::Indirect(d),
        }
    }

    pub fn address(&self, name: &str) -> Operand {
        match *self {
            Access::Global => Operand::AddressOf(Box::new(Operand::Name(name.to_owned()))),
            Access::Frame(d) => Operand::AddressOf(Box::new(Operand::Frame(d))),
            // the slot already holds the address
            Access::Indirect(d) => Operand::Frame(d),
        }
    }
}

/// Stack frame of a procedure, as seen by its prologue and epilogue.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Frame {
    pub size_of_locals: i64,
    pub size_of_parameters: i64,
}

impl From<&Procedure> for Frame {
    fn from(proc: &Procedure) -> Frame {
        Frame {
            size_of_locals: proc.size_of_locals,
            size_of_parameters: proc.size_of_parameters,
        }
    }
}
