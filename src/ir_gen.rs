// Lowering of semantic actions to three-address code

use log::trace;

use crate::data_layout::WORD_SIZE;
use crate::error::{CompileError, Result};
use crate::ir::{BinOp, Instruction, Operand};
use crate::symbol_table::{
    Constant, EntryId, EntryKind, Parameter, SymbolTable, VarType, Variable,
};
use crate::temp::{Label, Temp};
use crate::tokenizer::{Kind, Lexeme, Value};

/// Writes TAC for one compilation unit. Owns the temporary and string
/// counters, so two compilations never share numbering.
#[derive(Default)]
pub struct Emitter {
    temps: usize,
    strings: usize,
    output: String,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter::default()
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn emit(&mut self, inst: Instruction) {
        trace!("{}", inst);
        self.output.push_str(&inst.to_string());
        self.output.push('\n');
    }

    pub fn emit_procedure_start(&mut self, name: &str) {
        self.emit(Instruction::ProcStart(name.to_owned()));
    }

    pub fn emit_procedure_end(&mut self, name: &str) {
        self.emit(Instruction::ProcEnd(name.to_owned()));
    }

    pub fn emit_program_start(&mut self, name: &str) {
        self.emit(Instruction::Start(name.to_owned()));
    }

    /// `temp = left op right`, returns the temporary as an identifier.
    pub fn emit_expression(
        &mut self,
        table: &mut SymbolTable,
        left: &Lexeme,
        op: &Lexeme,
        right: &Lexeme,
        depth: usize,
        procedure: Option<EntryId>,
    ) -> Result<Lexeme> {
        let bin_op = BinOp::parse(&op.lexeme()).ok_or_else(|| CompileError::Syntax {
            line: op.line,
            found: op.lexeme(),
            expected: "an arithmetic operator".to_string(),
        })?;
        let left = self.value_of(table, left)?;
        let right = self.value_of(table, right)?;
        let temp = self.new_temporary(table, op.line, depth, procedure)?;
        let dst = self.value_of(table, &temp)?;
        self.emit(Instruction::BinaryAssign {
            dst,
            left,
            op: bin_op,
            right,
        });
        Ok(temp)
    }

    /// Unary minus, `0 - operand`.
    pub fn emit_negation(
        &mut self,
        table: &mut SymbolTable,
        operand: &Lexeme,
        depth: usize,
        procedure: Option<EntryId>,
    ) -> Result<Lexeme> {
        let zero = Lexeme::new(Kind::Number, operand.line, Value::Int(0));
        let minus = Lexeme::text(Kind::Minus, operand.line, "-");
        self.emit_expression(table, &zero, &minus, operand, depth, procedure)
    }

    /// `~operand`, `1 - operand`.
    pub fn emit_not(
        &mut self,
        table: &mut SymbolTable,
        operand: &Lexeme,
        depth: usize,
        procedure: Option<EntryId>,
    ) -> Result<Lexeme> {
        let one = Lexeme::new(Kind::Number, operand.line, Value::Int(1));
        let minus = Lexeme::text(Kind::Minus, operand.line, "-");
        self.emit_expression(table, &one, &minus, operand, depth, procedure)
    }

    /// Copy `value` into a fresh temporary.
    pub fn emit_buffer(
        &mut self,
        table: &mut SymbolTable,
        value: &Lexeme,
        depth: usize,
        procedure: Option<EntryId>,
    ) -> Result<Lexeme> {
        let src = self.value_of(table, value)?;
        let temp = self.new_temporary(table, value.line, depth, procedure)?;
        let dst = self.value_of(table, &temp)?;
        self.emit(Instruction::Assign { dst, src });
        Ok(temp)
    }

    pub fn emit_assignment(
        &mut self,
        table: &SymbolTable,
        dst: &Lexeme,
        src: &Lexeme,
    ) -> Result<()> {
        let dst = self.destination_of(table, dst, "assign to")?;
        let src = self.value_of(table, src)?;
        self.emit(Instruction::Assign { dst, src });
        Ok(())
    }

    pub fn emit_procedure_call(
        &mut self,
        table: &SymbolTable,
        callee: &Lexeme,
        args: &[Lexeme],
    ) -> Result<()> {
        let name = callee.lexeme();
        let entry = table.find(&name).ok_or_else(|| CompileError::Undeclared {
            line: callee.line,
            name: name.clone(),
        })?;
        let procedure = entry.procedure().ok_or_else(|| {
            CompileError::type_error(
                callee.line,
                format!("attempted to call non-procedure {}", name),
            )
        })?;

        let mut pushes = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let parameter = procedure.parameters.get(i).ok_or_else(|| CompileError::Arity {
                line: callee.line,
                procedure: name.clone(),
                message: "too many arguments".to_string(),
            })?;
            pushes.push(Instruction::Push(self.argument(table, arg, parameter)?));
        }
        if args.len() < procedure.parameters.len() {
            return Err(CompileError::Arity {
                line: callee.line,
                procedure: name,
                message: format!(
                    "not enough arguments, expected {} got {}",
                    procedure.parameters.len(),
                    args.len()
                ),
            });
        }

        for push in pushes {
            self.emit(push);
        }
        self.emit(Instruction::Call(procedure.label.clone()));
        Ok(())
    }

    pub fn emit_read_statement(&mut self, table: &SymbolTable, ids: &[Lexeme]) -> Result<()> {
        for id in ids {
            let dst = self.destination_of(table, id, "READ into")?;
            self.emit(Instruction::Read(vec![dst]));
        }
        Ok(())
    }

    pub fn emit_write_statement(
        &mut self,
        table: &mut SymbolTable,
        items: &[Lexeme],
    ) -> Result<()> {
        for item in items {
            match item.kind {
                Kind::Str => {
                    let label = self.register_string(table, item)?;
                    self.emit(Instruction::WriteStr(Operand::Name(label)));
                }
                _ => {
                    let value = self.value_of(table, item)?;
                    self.emit(Instruction::WriteInt(value));
                }
            }
        }
        Ok(())
    }

    pub fn emit_write_ln_statement(
        &mut self,
        table: &mut SymbolTable,
        items: &[Lexeme],
    ) -> Result<()> {
        self.emit_write_statement(table, items)?;
        self.emit(Instruction::WriteLn);
        Ok(())
    }

    pub fn is_temporary(&self, lexeme: &Lexeme) -> bool {
        lexeme.is(Kind::Identifier) && Temp::is_temp_name(&lexeme.lexeme())
    }

    // string literals always live in the data segment
    fn register_string(&mut self, table: &mut SymbolTable, literal: &Lexeme) -> Result<String> {
        let label = Label(self.strings).to_string();
        self.strings += 1;
        let id = table.insert(&label, literal.clone(), 0)?;
        table.get_mut(id).kind = EntryKind::Str(literal.lexeme());
        Ok(label)
    }

    fn new_temporary(
        &mut self,
        table: &mut SymbolTable,
        line: usize,
        depth: usize,
        procedure: Option<EntryId>,
    ) -> Result<Lexeme> {
        let name = Temp(self.temps).to_string();
        self.temps += 1;

        let offset = procedure
            .and_then(|p| table.get(p).procedure())
            .map_or(0, |p| p.size_of_locals);
        let var = Variable {
            ty: VarType::Int,
            offset,
            size: WORD_SIZE,
            depth,
            is_parameter: false,
            by_reference: false,
        };
        let lexeme = Lexeme::text(Kind::Identifier, line, name.as_str());
        let id = table.insert(&name, lexeme.clone(), depth)?;
        if let Some(owner) = procedure {
            if let Some(owner) = table.get_mut(owner).procedure_mut() {
                owner.add_local(&var);
            }
        }
        table.get_mut(id).kind = EntryKind::Variable(var);
        Ok(lexeme)
    }

    fn value_of(&self, table: &SymbolTable, lexeme: &Lexeme) -> Result<Operand> {
        match lexeme.kind {
            Kind::Number => Ok(Operand::Literal(lexeme.lexeme())),
            Kind::Identifier => {
                let name = lexeme.lexeme();
                let entry = table.find(&name).ok_or_else(|| CompileError::Undeclared {
                    line: lexeme.line,
                    name: name.clone(),
                })?;
                match &entry.kind {
                    EntryKind::Constant(c) => Ok(Operand::Literal(c.to_string())),
                    EntryKind::Variable(v) => Ok(v.access().value(&name)),
                    _ => Err(CompileError::type_error(
                        lexeme.line,
                        format!("use of invalid identifier {} in expression", name),
                    )),
                }
            }
            _ => Err(CompileError::Syntax {
                line: lexeme.line,
                found: lexeme.lexeme(),
                expected: "identifier or number".to_string(),
            }),
        }
    }

    fn destination_of(&self, table: &SymbolTable, lexeme: &Lexeme, action: &str) -> Result<Operand> {
        let name = lexeme.lexeme();
        let entry = table.find(&name).ok_or_else(|| CompileError::Undeclared {
            line: lexeme.line,
            name: name.clone(),
        })?;
        match entry.variable() {
            Some(v) => Ok(v.access().value(&name)),
            None => Err(CompileError::type_error(
                lexeme.line,
                format!("cannot {} non-variable {}", action, name),
            )),
        }
    }

    fn argument(&self, table: &SymbolTable, arg: &Lexeme, parameter: &Parameter) -> Result<Operand> {
        let mismatch = |ty: VarType| {
            CompileError::type_error(
                arg.line,
                format!(
                    "mismatched argument type, '{}' is {} but the parameter is {}",
                    arg.lexeme(),
                    ty,
                    parameter.ty
                ),
            )
        };
        let by_reference = || CompileError::Reference {
            line: arg.line,
            name: arg.lexeme(),
        };

        match arg.kind {
            Kind::Number => {
                let ty = match arg.value {
                    Value::Real(_) => VarType::Real,
                    _ => VarType::Int,
                };
                if parameter.by_reference {
                    return Err(by_reference());
                }
                if ty != parameter.ty {
                    return Err(mismatch(ty));
                }
                Ok(Operand::Literal(arg.lexeme()))
            }
            Kind::Identifier => {
                let name = arg.lexeme();
                let entry = table.find(&name).ok_or_else(|| CompileError::Undeclared {
                    line: arg.line,
                    name: name.clone(),
                })?;
                match &entry.kind {
                    EntryKind::Constant(c) => {
                        if parameter.by_reference {
                            return Err(by_reference());
                        }
                        if c.ty() != parameter.ty {
                            return Err(mismatch(c.ty()));
                        }
                        Ok(Operand::Literal(c.to_string()))
                    }
                    EntryKind::Variable(v) => {
                        if v.ty != parameter.ty {
                            return Err(mismatch(v.ty));
                        }
                        if parameter.by_reference {
                            Ok(v.access().address(&name))
                        } else {
                            Ok(v.access().value(&name))
                        }
                    }
                    _ => Err(CompileError::type_error(
                        arg.line,
                        format!("argument {} has no value", name),
                    )),
                }
            }
            _ => Err(CompileError::Syntax {
                line: arg.line,
                found: arg.lexeme(),
                expected: "identifier or number".to_string(),
            }),
        }
    }
}

pub fn constant_of(lexeme: &Lexeme) -> Option<Constant> {
    match lexeme.value {
        Value::Int(i) => Some(Constant::Int(i)),
        Value::Real(r) => Some(Constant::Real(r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::Procedure;

    fn ident(name: &str, line: usize) -> Lexeme {
        Lexeme::text(Kind::Identifier, line, name)
    }

    fn int(i: i64) -> Lexeme {
        Lexeme::new(Kind::Number, 1, Value::Int(i))
    }

    fn declare(table: &mut SymbolTable, name: &str, var: Variable) {
        let id = table.insert(name, ident(name, 1), var.depth).unwrap();
        table.get_mut(id).kind = EntryKind::Variable(var);
    }

    fn global(ty: VarType) -> Variable {
        Variable {
            ty,
            offset: 0,
            size: ty.size(),
            depth: 0,
            is_parameter: false,
            by_reference: false,
        }
    }

    fn declare_procedure(table: &mut SymbolTable, name: &str, parameters: &[Parameter]) -> EntryId {
        let id = table.insert(name, ident(name, 1), 0).unwrap();
        let mut procedure = Procedure::new(name);
        for p in parameters {
            procedure.add_parameter(&Variable {
                ty: p.ty,
                offset: 0,
                size: p.ty.size(),
                depth: 1,
                is_parameter: true,
                by_reference: p.by_reference,
            });
        }
        table.get_mut(id).kind = EntryKind::Procedure(procedure);
        id
    }

    #[test]
    fn test_expression_at_module_level() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        declare(&mut table, "x", global(VarType::Int));
        let plus = Lexeme::text(Kind::AddOp, 1, "+");
        let t = emitter
            .emit_expression(&mut table, &int(3), &plus, &int(4), 0, None)
            .unwrap();
        assert_eq!(t.lexeme(), "_t0");
        assert!(emitter.is_temporary(&t));
        emitter.emit_assignment(&table, &ident("x", 1), &t).unwrap();
        assert_eq!(emitter.output, "_t0 = 3 + 4\nx = _t0\n");
        assert_eq!(table.get(table.lookup("_t0").unwrap()).depth, 0);
    }

    #[test]
    fn test_temporaries_grow_procedure_frame() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        let owner = declare_procedure(&mut table, "p", &[]);
        let times = Lexeme::text(Kind::MulOp, 2, "*");
        let t0 = emitter
            .emit_expression(&mut table, &int(2), &times, &int(5), 1, Some(owner))
            .unwrap();
        let t1 = emitter
            .emit_negation(&mut table, &t0, 1, Some(owner))
            .unwrap();
        assert_eq!(t1.lexeme(), "_t1");
        assert_eq!(emitter.output, "_bp-2 = 2 * 5\n_bp-4 = 0 - _bp-2\n");
        assert_eq!(table.get(owner).procedure().unwrap().size_of_locals, 4);

        table.delete_depth(1);
        assert_eq!(table.lookup("_t0"), None);
        assert_eq!(table.lookup("_t1"), None);
    }

    #[test]
    fn test_constants_resolve_to_literals() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        let id = table.insert("limit", ident("limit", 1), 0).unwrap();
        table.get_mut(id).kind = EntryKind::Constant(Constant::Int(10));
        declare(&mut table, "x", global(VarType::Int));
        let t = emitter
            .emit_buffer(&mut table, &ident("limit", 2), 0, None)
            .unwrap();
        emitter.emit_assignment(&table, &ident("x", 2), &t).unwrap();
        assert_eq!(emitter.output, "_t0 = 10\nx = _t0\n");

        let err = emitter
            .emit_assignment(&table, &ident("limit", 3), &t)
            .unwrap_err();
        assert!(matches!(err, CompileError::Type { line: 3, .. }));
    }

    #[test]
    fn test_undeclared_identifier() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        let plus = Lexeme::text(Kind::AddOp, 4, "+");
        let err = emitter
            .emit_expression(&mut table, &ident("nope", 4), &plus, &int(1), 0, None)
            .unwrap_err();
        assert!(matches!(err, CompileError::Undeclared { line: 4, ref name } if name == "nope"));
    }

    #[test]
    fn test_procedure_call_pushes_arguments() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        declare(&mut table, "x", global(VarType::Int));
        declare_procedure(&mut table, "p", &[
            Parameter {
                ty: VarType::Int,
                by_reference: false,
            },
            Parameter {
                ty: VarType::Int,
                by_reference: true,
            },
            Parameter {
                ty: VarType::Real,
                by_reference: false,
            },
        ]);
        let real = Lexeme::new(Kind::Number, 1, Value::Real(2.5));
        emitter
            .emit_procedure_call(&table, &ident("p", 9), &[int(1), ident("x", 9), real])
            .unwrap();
        assert_eq!(emitter.output, "PUSH 1\nPUSH @x\nPUSH 2.5\nCALL p\n");

        let err = emitter
            .emit_procedure_call(&table, &ident("p", 9), &[int(1), ident("x", 9), ident("x", 9)])
            .unwrap_err();
        assert!(matches!(err, CompileError::Type { line: 9, .. }));
    }

    #[test]
    fn test_procedure_call_arity() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        let int_param = Parameter {
            ty: VarType::Int,
            by_reference: false,
        };
        declare_procedure(&mut table, "p", &[int_param, int_param]);

        let err = emitter
            .emit_procedure_call(&table, &ident("p", 12), &[int(1)])
            .unwrap_err();
        assert!(matches!(err, CompileError::Arity { line: 12, .. }));
        let err = emitter
            .emit_procedure_call(&table, &ident("p", 13), &[int(1), int(2), int(3)])
            .unwrap_err();
        assert!(matches!(err, CompileError::Arity { line: 13, .. }));
        assert_eq!(emitter.output, "");
    }

    #[test]
    fn test_reference_legality() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        let id = table.insert("c", ident("c", 1), 0).unwrap();
        table.get_mut(id).kind = EntryKind::Constant(Constant::Int(1));
        declare_procedure(&mut table, "p", &[Parameter {
            ty: VarType::Int,
            by_reference: true,
        }]);

        let err = emitter
            .emit_procedure_call(&table, &ident("p", 5), &[ident("c", 5)])
            .unwrap_err();
        assert!(matches!(err, CompileError::Reference { line: 5, ref name } if name == "c"));
        let err = emitter
            .emit_procedure_call(&table, &ident("p", 6), &[int(3)])
            .unwrap_err();
        assert!(matches!(err, CompileError::Reference { line: 6, .. }));
    }

    #[test]
    fn test_call_non_procedure() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        declare(&mut table, "x", global(VarType::Int));
        let err = emitter
            .emit_procedure_call(&table, &ident("x", 2), &[])
            .unwrap_err();
        assert!(matches!(err, CompileError::Type { line: 2, .. }));
        let err = emitter
            .emit_procedure_call(&table, &ident("q", 3), &[])
            .unwrap_err();
        assert!(matches!(err, CompileError::Undeclared { line: 3, .. }));
    }

    #[test]
    fn test_read_and_write() {
        let mut table = SymbolTable::new();
        let mut emitter = Emitter::new();
        declare(&mut table, "a", global(VarType::Int));
        declare(&mut table, "b", global(VarType::Char));
        emitter
            .emit_read_statement(&table, &[ident("a", 1), ident("b", 1)])
            .unwrap();
        let hello = Lexeme::text(Kind::Str, 2, "hello");
        let bye = Lexeme::text(Kind::Str, 2, "bye");
        emitter
            .emit_write_ln_statement(&mut table, &[hello, ident("a", 2), int(7), bye])
            .unwrap();
        assert_eq!(
            emitter.output,
            "RD a\nRD b\nWRS _S0\nWRI a\nWRI 7\nWRS _S1\nWRLN\n"
        );
        let strings = table
            .entries_at(0)
            .filter_map(|e| match &e.kind {
                EntryKind::Str(s) => Some((e.name.as_str(), s.as_str())),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(strings, vec![("_S0", "hello"), ("_S1", "bye")]);
    }

    #[test]
    fn test_counters_are_per_emitter() {
        let plus = Lexeme::text(Kind::AddOp, 1, "+");
        for _ in 0..2 {
            let mut table = SymbolTable::new();
            let mut emitter = Emitter::new();
            let t = emitter
                .emit_expression(&mut table, &int(1), &plus, &int(1), 0, None)
                .unwrap();
            assert_eq!(t.lexeme(), "_t0");
        }
    }
}
