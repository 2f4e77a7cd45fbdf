use log::debug;

use crate::data_layout::DataLayout;
use crate::error::{CompileError, Result};
use crate::frame::Frame;
use crate::ir_gen::{self, Emitter};
use crate::stack::Stack;
use crate::symbol_table::{EntryId, EntryKind, Procedure, SymbolTable, VarType, Variable};

use crate::tokenizer::{Kind, Lexeme, Value};

// joins a nested procedure's label to its parent's, never part of an identifier
const LABEL_SEPARATOR: char = '$';

// parenthesized and unary factors
const MAX_NESTING: usize = 256;

/// Output of the front end: TAC text plus the declarations it refers to.
#[derive(Debug)]
pub struct Program {
    pub tac: String,
    pub layout: DataLayout,
}

/// One pass recursive descent analyzer. Parses, checks and drives the
/// emitter; there is no syntax tree.
pub struct Parser<'a> {
    tokens: Box<dyn Iterator<Item = Lexeme> + 'a>,
    current: Lexeme,
    next: Lexeme,
    table: SymbolTable,
    emitter: Emitter,
    layout: DataLayout,
    depth: usize,
    // names of the open MODULE / PROCEDURE blocks
    blocks: Stack<String>,
    procedures: Stack<EntryId>,
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Box<dyn Iterator<Item = Lexeme> + 'a>) -> Self {
        let current = tokens
            .next()
            .unwrap_or_else(|| Lexeme::new(Kind::Eof, 1, Value::None));
        let next = tokens
            .next()
            .unwrap_or_else(|| Lexeme::new(Kind::Eof, current.line, Value::None));
        Parser {
            tokens,
            current,
            next,
            table: SymbolTable::new(),
            emitter: Emitter::new(),
            layout: DataLayout::default(),
            depth: 0,
            blocks: Stack::new(),
            procedures: Stack::new(),
            nesting: 0,
        }
    }

    pub fn parse(mut self) -> Result<Program> {
        Self::check_lexical(&self.current)?;
        self.parse_prog()?;

        self.table.dump_depth(0);
        for entry in self.table.entries_at(0) {
            match &entry.kind {
                EntryKind::Variable(_) => self.layout.globals.push(entry.name.clone()),
                EntryKind::Str(content) => self
                    .layout
                    .strings
                    .push((entry.name.clone(), content.clone())),
                _ => (),
            }
        }
        self.table.delete_depth(0);

        Ok(Program {
            tac: self.emitter.finish(),
            layout: self.layout,
        })
    }

    fn check_lexical(lexeme: &Lexeme) -> Result<()> {
        match lexeme.kind {
            Kind::Error => Err(CompileError::Lexical {
                line: lexeme.line,
                message: lexeme.lexeme(),
            }),
            Kind::Unknown => Err(CompileError::Lexical {
                line: lexeme.line,
                message: format!("unknown character '{}'", lexeme.lexeme()),
            }),
            _ => Ok(()),
        }
    }

    // consume `current`, returning it
    fn bump(&mut self) -> Result<Lexeme> {
        let upcoming = self
            .tokens
            .next()
            .unwrap_or_else(|| Lexeme::new(Kind::Eof, self.next.line, Value::None));
        let next = std::mem::replace(&mut self.next, upcoming);
        let prev = std::mem::replace(&mut self.current, next);
        Self::check_lexical(&self.current)?;
        Ok(prev)
    }

    fn look(&self, kind: Kind) -> bool {
        self.current.is(kind)
    }

    fn eat_expect(&mut self, expected: Kind) -> Result<Lexeme> {
        if self.look(expected) {
            self.bump()
        } else {
            Err(self.unexpected_token(&expected.to_string()))
        }
    }

    fn eat_ident(&mut self) -> Result<Lexeme> {
        self.eat_expect(Kind::Identifier)
    }

    fn unexpected_token(&self, expected: &str) -> CompileError {
        CompileError::Syntax {
            line: self.current.line,
            found: self.current.lexeme(),
            expected: expected.to_owned(),
        }
    }

    fn procedure(&self) -> Option<EntryId> {
        self.procedures.peek().copied()
    }

    fn declare(&mut self, lexeme: &Lexeme) -> Result<EntryId> {
        self.table.insert(&lexeme.lexeme(), lexeme.clone(), self.depth)
    }

    // MODULE id ; DeclarativePart StatementPart END id .
    fn parse_prog(&mut self) -> Result<()> {
        self.eat_expect(Kind::Module)?;
        let module = self.eat_ident()?;
        let name = module.lexeme();
        let id = self.declare(&module)?;
        self.table.get_mut(id).kind = EntryKind::Module;
        self.blocks.push(name.clone());
        self.eat_expect(Kind::SemiColon)?;

        self.parse_declarative_part()?;
        self.emitter.emit_procedure_start(&name);
        self.parse_statement_part()?;
        self.eat_expect(Kind::End)?;
        self.close_block()?;
        self.eat_expect(Kind::Period)?;
        self.emitter.emit_procedure_end(&name);
        self.layout.frames.insert(name.clone(), Frame::default());
        self.emitter.emit_program_start(&name);

        if !self.look(Kind::Eof) {
            return Err(self.unexpected_token(&Kind::Eof.to_string()));
        }
        Ok(())
    }

    fn parse_declarative_part(&mut self) -> Result<()> {
        self.parse_const_part()?;
        self.parse_var_part()?;
        self.parse_proc_part()
    }

    // CONST { id = number ; }
    fn parse_const_part(&mut self) -> Result<()> {
        if !self.look(Kind::Const) {
            return Ok(());
        }
        self.bump()?;
        while self.look(Kind::Identifier) {
            let name = self.bump()?;
            let id = self.declare(&name)?;
            self.eat_expect(Kind::Equal)?;
            let value = self.eat_expect(Kind::Number)?;
            let constant = ir_gen::constant_of(&value).ok_or_else(|| CompileError::Syntax {
                line: value.line,
                found: value.lexeme(),
                expected: "a numeric constant".to_string(),
            })?;
            self.table.get_mut(id).kind = EntryKind::Constant(constant);
            self.eat_expect(Kind::SemiColon)?;
        }
        Ok(())
    }

    // VAR { IdentifierList : TypeMark ; }
    fn parse_var_part(&mut self) -> Result<()> {
        if !self.look(Kind::Var) {
            return Ok(());
        }
        self.bump()?;
        let mut offset = 0;
        while self.look(Kind::Identifier) {
            let ids = self.parse_identifier_list()?;
            self.eat_expect(Kind::Colon)?;
            let ty = self.parse_type_mark()?;
            for id in ids {
                let var = Variable {
                    ty,
                    offset,
                    size: ty.size(),
                    depth: self.depth,
                    is_parameter: false,
                    by_reference: false,
                };
                offset += var.size;
                if let Some(owner) = self.procedure() {
                    if let Some(owner) = self.table.get_mut(owner).procedure_mut() {
                        owner.add_local(&var);
                    }
                }
                self.table.get_mut(id).kind = EntryKind::Variable(var);
            }
            self.eat_expect(Kind::SemiColon)?;
        }
        Ok(())
    }

    // every identifier is declared as soon as it is matched
    fn parse_identifier_list(&mut self) -> Result<Vec<EntryId>> {
        let first = self.eat_ident()?;
        let mut ids = vec![self.declare(&first)?];
        while self.look(Kind::Comma) {
            self.bump()?;
            let name = self.eat_ident()?;
            ids.push(self.declare(&name)?);
        }
        Ok(ids)
    }

    fn parse_type_mark(&mut self) -> Result<VarType> {
        let ty = match self.current.kind {
            Kind::IntegerType => VarType::Int,
            Kind::RealType => VarType::Real,
            Kind::CharType => VarType::Char,
            _ => return Err(self.unexpected_token("INTEGER, REAL or CHAR")),
        };
        self.bump()?;
        Ok(ty)
    }

    fn parse_proc_part(&mut self) -> Result<()> {
        while self.look(Kind::Procedure) {
            self.parse_procedure_decl()?;
        }
        Ok(())
    }

    // ProcHeading ; ProcBody id ;
    fn parse_procedure_decl(&mut self) -> Result<()> {
        let label = self.parse_proc_heading()?;
        self.eat_expect(Kind::SemiColon)?;

        self.parse_declarative_part()?;
        self.emitter.emit_procedure_start(&label);
        self.parse_statement_part()?;
        self.eat_expect(Kind::End)?;
        self.close_block()?;
        self.eat_expect(Kind::SemiColon)?;
        self.emitter.emit_procedure_end(&label);

        self.table.dump_depth(self.depth);
        if let Some(owner) = self.procedures.pop() {
            if let Some(procedure) = self.table.get(owner).procedure() {
                self.layout.frames.insert(label, Frame::from(procedure));
            }
        }
        self.table.delete_depth(self.depth);
        self.depth -= 1;
        Ok(())
    }

    // PROCEDURE id Args, leaves the parser inside the procedure's scope and
    // returns the procedure's label
    fn parse_proc_heading(&mut self) -> Result<String> {
        self.eat_expect(Kind::Procedure)?;
        let name = self.eat_ident()?;
        let id = self.declare(&name)?;
        let label = match self.procedure().and_then(|p| self.table.get(p).procedure()) {
            Some(parent) => format!("{}{}{}", parent.label, LABEL_SEPARATOR, name.lexeme()),
            None => name.lexeme(),
        };
        self.table.get_mut(id).kind = EntryKind::Procedure(Procedure::new(label.as_str()));
        debug!("procedure {} at depth {}", label, self.depth);

        self.blocks.push(name.lexeme());
        self.procedures.push(id);
        self.depth += 1;
        self.parse_args(id)?;
        Ok(label)
    }

    // ( [VAR] IdentifierList : TypeMark { ; [VAR] IdentifierList : TypeMark } )
    fn parse_args(&mut self, owner: EntryId) -> Result<()> {
        if !self.look(Kind::LParen) {
            return Ok(());
        }
        self.bump()?;

        let mut formals = vec![];
        if !self.look(Kind::RParen) {
            loop {
                let by_reference = if self.look(Kind::Var) {
                    self.bump()?;
                    true
                } else {
                    false
                };
                let ids = self.parse_identifier_list()?;
                self.eat_expect(Kind::Colon)?;
                let ty = self.parse_type_mark()?;
                formals.extend(ids.into_iter().map(|id| (id, ty, by_reference)));
                if self.look(Kind::SemiColon) {
                    self.bump()?;
                } else {
                    break;
                }
            }
        }
        self.eat_expect(Kind::RParen)?;

        // offsets count down from the total size, the first parameter
        // is pushed first
        let mut offset = formals
            .iter()
            .map(|(_, ty, by_reference)| Variable::parameter_size(*ty, *by_reference))
            .sum::<i64>();
        for (id, ty, by_reference) in formals {
            let var = Variable {
                ty,
                offset,
                size: Variable::parameter_size(ty, by_reference),
                depth: self.depth,
                is_parameter: true,
                by_reference,
            };
            offset -= var.size;
            if let Some(procedure) = self.table.get_mut(owner).procedure_mut() {
                procedure.add_parameter(&var);
            }
            self.table.get_mut(id).kind = EntryKind::Variable(var);
        }
        Ok(())
    }

    // the identifier after END
    fn close_block(&mut self) -> Result<()> {
        let found = self.eat_ident()?;
        let name = found.lexeme();
        match self.blocks.peek() {
            Some(open) if *open == name => {
                self.blocks.pop();
                Ok(())
            }
            Some(open) => Err(CompileError::BlockMismatch {
                line: found.line,
                expected: open.clone(),
                found: name,
            }),
            None => Err(CompileError::UnmatchedEnd {
                line: found.line,
                found: name,
            }),
        }
    }

    fn parse_statement_part(&mut self) -> Result<()> {
        if !self.look(Kind::Begin) {
            return Ok(());
        }
        self.bump()?;
        self.parse_statement()?;
        while self.look(Kind::SemiColon) {
            self.bump()?;
            self.parse_statement()?;
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<()> {
        match self.current.kind {
            Kind::Identifier if self.next.is(Kind::AssignOp) => self.parse_assign_stat(),
            Kind::Identifier => self.parse_proc_call(),
            Kind::Read => self.parse_read(),
            Kind::Write => self.parse_write(),
            Kind::WriteLn => self.parse_write_ln(),
            // empty statement
            _ => Ok(()),
        }
    }

    // id := Expr
    fn parse_assign_stat(&mut self) -> Result<()> {
        let dst = self.eat_ident()?;
        self.eat_expect(Kind::AssignOp)?;
        let value = self.parse_expr()?;
        let value = if self.emitter.is_temporary(&value) {
            value
        } else {
            let (depth, procedure) = (self.depth, self.procedure());
            self.emitter
                .emit_buffer(&mut self.table, &value, depth, procedure)?
        };
        self.emitter.emit_assignment(&self.table, &dst, &value)
    }

    // id [ ( [ Param { , Param } ] ) ]
    fn parse_proc_call(&mut self) -> Result<()> {
        let callee = self.eat_ident()?;
        let mut args = vec![];
        if self.look(Kind::LParen) {
            self.bump()?;
            if !self.look(Kind::RParen) {
                loop {
                    match self.current.kind {
                        Kind::Identifier | Kind::Number => args.push(self.bump()?),
                        _ => return Err(self.unexpected_token("identifier or number")),
                    }
                    if self.look(Kind::Comma) {
                        self.bump()?;
                    } else {
                        break;
                    }
                }
            }
            self.eat_expect(Kind::RParen)?;
        }
        self.emitter
            .emit_procedure_call(&self.table, &callee, &args)
    }

    // READ ( id { , id } )
    fn parse_read(&mut self) -> Result<()> {
        self.eat_expect(Kind::Read)?;
        self.eat_expect(Kind::LParen)?;
        let mut ids = vec![self.eat_ident()?];
        while self.look(Kind::Comma) {
            self.bump()?;
            ids.push(self.eat_ident()?);
        }
        self.eat_expect(Kind::RParen)?;
        self.emitter.emit_read_statement(&self.table, &ids)
    }

    fn parse_write(&mut self) -> Result<()> {
        self.eat_expect(Kind::Write)?;
        self.eat_expect(Kind::LParen)?;
        let items = self.parse_write_list()?;
        self.eat_expect(Kind::RParen)?;
        self.emitter.emit_write_statement(&mut self.table, &items)
    }

    // WRITELN, WRITELN () and WRITELN (items) are all accepted
    fn parse_write_ln(&mut self) -> Result<()> {
        self.eat_expect(Kind::WriteLn)?;
        let mut items = vec![];
        if self.look(Kind::LParen) {
            self.bump()?;
            if !self.look(Kind::RParen) {
                items = self.parse_write_list()?;
            }
            self.eat_expect(Kind::RParen)?;
        }
        self.emitter
            .emit_write_ln_statement(&mut self.table, &items)
    }

    fn parse_write_list(&mut self) -> Result<Vec<Lexeme>> {
        let mut items = vec![self.parse_write_item()?];
        while self.look(Kind::Comma) {
            self.bump()?;
            items.push(self.parse_write_item()?);
        }
        Ok(items)
    }

    fn parse_write_item(&mut self) -> Result<Lexeme> {
        match self.current.kind {
            Kind::Identifier | Kind::Number | Kind::Str => self.bump(),
            _ => Err(self.unexpected_token("identifier, number or string")),
        }
    }

    // Expr -> Relation -> SimpleExpr
    fn parse_expr(&mut self) -> Result<Lexeme> {
        self.parse_simple_expr()
    }

    fn parse_simple_expr(&mut self) -> Result<Lexeme> {
        let mut left = self.parse_term()?;
        while self.look(Kind::AddOp) || self.look(Kind::Minus) {
            let op = self.bump()?;
            let right = self.parse_term()?;
            left = self.emit_binary(&left, &op, &right)?;
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Lexeme> {
        let mut left = self.parse_factor()?;
        while self.look(Kind::MulOp) {
            let op = self.bump()?;
            let right = self.parse_factor()?;
            left = self.emit_binary(&left, &op, &right)?;
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Lexeme> {
        match self.current.kind {
            Kind::Identifier | Kind::Number => self.bump(),
            Kind::LParen => {
                self.enter()?;
                self.bump()?;
                let value = self.parse_expr()?;
                self.eat_expect(Kind::RParen)?;
                self.leave();
                Ok(value)
            }
            Kind::Tilde | Kind::Minus => {
                self.enter()?;
                let op = self.bump()?;
                let operand = self.parse_factor()?;
                let (depth, procedure) = (self.depth, self.procedure());
                let value = if op.is(Kind::Tilde) {
                    self.emitter
                        .emit_not(&mut self.table, &operand, depth, procedure)?
                } else {
                    self.emitter
                        .emit_negation(&mut self.table, &operand, depth, procedure)?
                };
                self.leave();
                Ok(value)
            }
            _ => Err(self.unexpected_token("identifier, number, '(', '~' or '-'")),
        }
    }

    fn emit_binary(&mut self, left: &Lexeme, op: &Lexeme, right: &Lexeme) -> Result<Lexeme> {
        let (depth, procedure) = (self.depth, self.procedure());
        self.emitter
            .emit_expression(&mut self.table, left, op, right, depth, procedure)
    }

    fn enter(&mut self) -> Result<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(CompileError::NestingTooDeep {
                line: self.current.line,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse(source: &str) -> Result<Program> {
        Parser::new(Box::new(tokenize(source))).parse()
    }

    fn tac(source: &str) -> String {
        parse(source).unwrap().tac
    }

    #[test]
    fn test_empty_module() {
        let program = parse("MODULE Id1; END Id1.").unwrap();
        assert_eq!(program.tac, "PROC Id1\nENDP Id1\nSTART Id1\n");
        assert!(program.layout.globals.is_empty());
        assert_eq!(program.layout.frame("Id1"), Some(&Frame::default()));
    }

    #[test]
    fn test_block_mismatch() {
        let err = parse("MODULE Id1; END Id2.").unwrap_err();
        assert!(matches!(
            err,
            CompileError::BlockMismatch { line: 1, ref expected, ref found }
                if expected == "Id1" && found == "Id2"
        ));
    }

    #[test]
    fn test_assignment_and_write() {
        assert_eq!(
            tac("MODULE M; VAR x: INTEGER; BEGIN x := 3 + 4; WRITE(x) END M."),
            "PROC M\n_t0 = 3 + 4\nx = _t0\nWRI x\nENDP M\nSTART M\n"
        );
    }

    #[test]
    fn test_plain_value_is_buffered() {
        assert_eq!(
            tac("MODULE M; CONST k = 5; VAR x, y: INTEGER; BEGIN x := y; y := k END M."),
            "PROC M\n_t0 = y\nx = _t0\n_t1 = 5\ny = _t1\nENDP M\nSTART M\n"
        );
    }

    #[test]
    fn test_precedence_and_unary() {
        assert_eq!(
            tac("MODULE M; VAR a, b: INTEGER; BEGIN a := -b + 2 * (b - 1) END M."),
            "PROC M\n\
             _t0 = 0 - b\n\
             _t1 = b - 1\n\
             _t2 = 2 * _t1\n\
             _t3 = _t0 + _t2\n\
             a = _t3\n\
             ENDP M\n\
             START M\n"
        );
        assert_eq!(
            tac("MODULE M; VAR a, b: INTEGER; BEGIN a := ~b & a OR b END M."),
            "PROC M\n_t0 = 1 - b\n_t1 = _t0 AND a\n_t2 = _t1 OR b\na = _t2\nENDP M\nSTART M\n"
        );
    }

    #[test]
    fn test_globals_in_declaration_order() {
        let program =
            parse("MODULE M; VAR a, b: INTEGER; c: REAL; d: CHAR; BEGIN a := b + 1 END M.")
                .unwrap();
        assert_eq!(program.layout.globals, vec!["a", "b", "c", "d", "_t0"]);
    }

    #[test]
    fn test_parameter_offsets() {
        let source = "PROCEDURE p(a, b: INTEGER; VAR c: REAL);";
        let mut parser = Parser::new(Box::new(tokenize(source)));
        parser.parse_proc_heading().unwrap();
        let offsets = ["a", "b", "c"]
            .iter()
            .map(|name| parser.table.find(name).unwrap().variable().unwrap().offset)
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![8, 6, 4]);
        let procedure = parser.table.find("p").unwrap().procedure().unwrap();
        assert_eq!(procedure.size_of_parameters, 8);
        assert_eq!(procedure.parameters.len(), 3);
        assert!(procedure.parameters[2].by_reference);
        assert_eq!(parser.depth, 1);
    }

    #[test]
    fn test_local_offsets() {
        let source = "VAR i, j: INTEGER; r: REAL; BEGIN";
        let mut parser = Parser::new(Box::new(tokenize(source)));
        parser.depth = 1;
        parser.parse_var_part().unwrap();
        let offsets = ["i", "j", "r"]
            .iter()
            .map(|name| parser.table.find(name).unwrap().variable().unwrap().offset)
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 2, 4]);
        assert!(parser.look(Kind::Begin));
    }

    #[test]
    fn test_procedure_frame() {
        let source = "MODULE M;\n\
                      VAR g: INTEGER;\n\
                      PROCEDURE p(a: INTEGER; VAR b: INTEGER);\n\
                      VAR l: INTEGER;\n\
                      BEGIN\n\
                        l := a * 2;\n\
                        b := l\n\
                      END p;\n\
                      BEGIN p(1, g) END M.";
        let program = parse(source).unwrap();
        assert_eq!(
            program.tac,
            "PROC p\n\
             _bp-4 = _bp+6 * 2\n\
             _bp-2 = _bp-4\n\
             _bp-6 = _bp-2\n\
             *_bp+4 = _bp-6\n\
             ENDP p\n\
             PROC M\n\
             PUSH 1\n\
             PUSH @g\n\
             CALL p\n\
             ENDP M\n\
             START M\n"
        );
        assert_eq!(
            program.layout.frame("p"),
            Some(&Frame {
                size_of_locals: 6,
                size_of_parameters: 4,
            })
        );
        // procedure temporaries are not globals
        assert_eq!(program.layout.globals, vec!["g"]);
    }

    #[test]
    fn test_nested_procedure_comes_first() {
        let source = "MODULE M;\n\
                      PROCEDURE outer;\n\
                        PROCEDURE inner; BEGIN WRITELN END inner;\n\
                      BEGIN inner END outer;\n\
                      BEGIN outer END M.";
        assert_eq!(
            tac(source),
            "PROC outer$inner\nWRLN\nENDP outer$inner\nPROC outer\nCALL outer$inner\nENDP outer\n\
             PROC M\nCALL outer\nENDP M\nSTART M\n"
        );
    }

    #[test]
    fn test_sibling_nested_procedures_get_distinct_labels() {
        let source = "MODULE M;\n\
                      PROCEDURE a;\n\
                        PROCEDURE h; BEGIN WRITELN END h;\n\
                      BEGIN h END a;\n\
                      PROCEDURE b;\n\
                        PROCEDURE h; VAR k: INTEGER; BEGIN k := 1 END h;\n\
                      BEGIN h END b;\n\
                      BEGIN a; b END M.";
        let program = parse(source).unwrap();
        assert!(program.tac.contains("PROC a$h\nWRLN\nENDP a$h\n"));
        assert!(program.tac.contains("PROC a\nCALL a$h\nENDP a\n"));
        assert!(program.tac.contains("PROC b\nCALL b$h\nENDP b\n"));
        assert_eq!(
            program.layout.frames.keys().collect::<Vec<_>>(),
            vec!["a$h", "a", "b$h", "b", "M"]
        );
        assert_eq!(program.layout.frame("a$h"), Some(&Frame::default()));
        assert_eq!(
            program.layout.frame("b$h"),
            Some(&Frame {
                size_of_locals: 4,
                size_of_parameters: 0,
            })
        );
    }

    #[test]
    fn test_reference_real_parameter_takes_one_word() {
        let source = "MODULE M;\n\
                      VAR r: REAL;\n\
                      PROCEDURE p(a: INTEGER; VAR x: REAL);\n\
                      BEGIN WRITE(a) END p;\n\
                      BEGIN p(1, r) END M.";
        let program = parse(source).unwrap();
        assert_eq!(
            program.tac,
            "PROC p\nWRI _bp+6\nENDP p\n\
             PROC M\nPUSH 1\nPUSH @r\nCALL p\nENDP M\nSTART M\n"
        );
        assert_eq!(
            program.layout.frame("p"),
            Some(&Frame {
                size_of_locals: 0,
                size_of_parameters: 4,
            })
        );
    }

    #[test]
    fn test_procedure_scope_is_evicted() {
        let source = "MODULE M;\n\
                      PROCEDURE p; VAR x: INTEGER; BEGIN x := 1 END p;\n\
                      BEGIN x := 2 END M.";
        let err = parse(source).unwrap_err();
        assert!(matches!(err, CompileError::Undeclared { line: 3, ref name } if name == "x"));
    }

    #[test]
    fn test_redeclaration_stops_at_duplicate() {
        let err = parse("MODULE M;\nVAR a, b,\n a: INTEGER;\nEND M.").unwrap_err();
        assert!(matches!(err, CompileError::Redeclaration { line: 3, ref name } if name == "a"));
    }

    #[test]
    fn test_call_arity_line() {
        let source = "MODULE M;\n\
                      PROCEDURE p(a, b: INTEGER); END p;\n\
                      BEGIN\n\
                      p(1)\n\
                      END M.";
        let err = parse(source).unwrap_err();
        assert!(matches!(err, CompileError::Arity { line: 4, .. }));
    }

    #[test]
    fn test_io_statements() {
        assert_eq!(
            tac("MODULE M; VAR a, b: INTEGER; BEGIN READ(a, b); WRITE(\"sum\", a); WRITELN(); WRITELN(b) END M."),
            "PROC M\nRD a\nRD b\nWRS _S0\nWRI a\nWRLN\nWRI b\nWRLN\nENDP M\nSTART M\n"
        );
        let program = parse("MODULE M; BEGIN WRITELN('hi') END M.").unwrap();
        assert_eq!(
            program.layout.strings,
            vec![("_S0".to_string(), "hi".to_string())]
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = parse("MODULE M; VAR x INTEGER; END M.").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Syntax { line: 1, ref found, .. } if found == "INTEGER"
        ));
        let err = parse("MODULE M; END M. extra").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn test_lexical_error() {
        let err = parse("MODULE M;\nBEGIN WRITE(\"open\nEND M.").unwrap_err();
        assert!(matches!(err, CompileError::Lexical { line: 2, .. }));
        let err = parse("MODULE M; VAR x: INTEGER; BEGIN x := 1 ? 2 END M.").unwrap_err();
        assert!(matches!(err, CompileError::Lexical { line: 1, .. }));
    }

    #[test]
    fn test_nesting_too_deep() {
        let depth = MAX_NESTING + 1;
        let source = format!(
            "MODULE M; VAR x: INTEGER; BEGIN x := {}1{} END M.",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        assert!(matches!(
            parse(&source).unwrap_err(),
            CompileError::NestingTooDeep { line: 1 }
        ));
        let source = format!(
            "MODULE M; VAR x: INTEGER; BEGIN x := {}1{} END M.",
            "(".repeat(MAX_NESTING),
            ")".repeat(MAX_NESTING)
        );
        assert!(parse(&source).is_ok());
    }
}
