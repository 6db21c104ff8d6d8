//! Generación de código de tres direcciones.
//!
//! El generador recorre las mismas líneas de sentencia que el analizador
//! semántico, con la misma disciplina de ámbitos, y emite [`ir`]. Asume
//! que la entrada ya fue validada: cualquier violación de esa
//! precondición es un [`CodegenError`] fatal.
//!
//! Cada función tiene su propio frame. Las dos primeras palabras guardan
//! `LR` y `FP`, por lo que la primera variable queda en `fp + 8`; cada
//! variable o temporal ocupa 4 bytes si es entera u 8 si es `double`.
//! Las expresiones se aplanan en dos pasadas: primero `*`, `/` y `%`,
//! luego `+` y `-`, siempre de izquierda a derecha.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use thiserror::Error;

use crate::{
    condition::Condition,
    ir::{self, Instruction, Label, Operand, Program, Temp},
    lex::{Keyword, Terminal, Token},
    lines::StatementLine,
    scope::{Bindings, Listing, ScopeKind, ScopeStack},
    source::{Located, Location},
    symbols::{DataType, Entry, SymbolTable},
};

/// Violación de precondiciones durante la generación.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Empty expression")]
    EmptyExpression,

    #[error("Malformed expression near `{0}`")]
    MalformedExpression(String),

    #[error("Malformed statement `{0}`")]
    MalformedStatement(String),

    #[error("Symbol `{0}` has no storage")]
    Undefined(String),

    #[error("`return` outside of a function")]
    ReturnOutsideFunction,

    #[error("`{0}` does not close any block")]
    UnbalancedBlock(&'static str),
}

pub type Codegen<T> = Result<T, Located<CodegenError>>;

/// Código generado junto con su listado de símbolos.
pub struct Tac {
    program: Program,
    listing: Listing,
}

impl Tac {
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Variables, parámetros y temporales, indentados por ámbito.
    pub fn listing(&self) -> &Listing {
        &self.listing
    }
}

impl Display for Tac {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.program.fmt(fmt)
    }
}

/// Genera código para un programa que ya pasó el análisis semántico.
pub fn generate(lines: &[StatementLine], table: &SymbolTable) -> Codegen<Tac> {
    let mut generator = Generator {
        table,
        scopes: ScopeStack::new(),
        variables: Bindings::default(),
        main: Section::new(),
        function: None,
        functions: Vec::new(),
        blocks: Vec::new(),
        temps: 0,
        labels: 0,
        last_compare: None,
        listing: Listing::default(),
    };

    for line in lines {
        generator.line(line)?;
    }

    if let Some(open) = generator.function.take() {
        if let Some(location) = lines.last().and_then(StatementLine::location) {
            return Err(Located::at(
                CodegenError::MalformedStatement(format!("def {}", open.name)),
                location,
            ));
        }
    }

    let main = ir::Function {
        name: String::from("main"),
        bytes: generator.main.bytes,
        body: generator.main.body,
        exit: None,
    };

    Ok(Tac {
        program: Program {
            functions: generator.functions,
            main,
        },
        listing: generator.listing,
    })
}

/// Código y frame de una función, o del programa principal.
struct Section {
    sp: u32,
    bytes: u32,
    body: Vec<Instruction>,
}

impl Section {
    fn new() -> Self {
        Section {
            sp: 8,
            bytes: 0,
            body: Vec::new(),
        }
    }

    /// Reserva espacio en el frame y retorna su desplazamiento.
    fn allocate(&mut self, data_type: DataType) -> u32 {
        let offset = self.sp;
        self.sp += data_type.size();
        self.bytes += data_type.size();

        offset
    }
}

struct OpenFunction {
    name: String,
    return_type: DataType,
    section: Section,
}

enum Block {
    If { otherwise: Label, end: Option<Label> },
    While { top: Label, exit: Label },
}

/// Fragmento de una expresión ya reducido a operando.
enum Item {
    Value(Operand, DataType),
    Op(Terminal, Location),
}

struct Generator<'a> {
    table: &'a SymbolTable,
    scopes: ScopeStack,
    variables: Bindings<DataType>,
    main: Section,
    function: Option<OpenFunction>,
    functions: Vec<ir::Function>,
    blocks: Vec<Block>,
    temps: u32,
    labels: u32,
    last_compare: Option<(Operand, Operand)>,
    listing: Listing,
}

impl Generator<'_> {
    fn line(&mut self, line: &StatementLine) -> Codegen<()> {
        let (head, location) = match (line.first(), line.location()) {
            (Some(head), Some(location)) => (head, location),
            _ => return Ok(()),
        };

        let tokens = line.tokens();
        let body = line.body();

        match head {
            Token::Reserved(Keyword::Def) => self.function(line, location),
            Token::Reserved(Keyword::If) => self.if_statement(line, location),
            Token::Reserved(Keyword::While) => self.while_statement(line, location),
            Token::Reserved(Keyword::Else) => self.else_branch(location),
            Token::Reserved(Keyword::Fi) => self.end_if(location),
            Token::Reserved(Keyword::Od) => self.end_while(location),
            Token::Reserved(Keyword::Fed) => self.end_function(location),
            Token::Reserved(Keyword::Return) => self.return_statement(&body[1..], location),

            Token::Reserved(Keyword::Print) => {
                let (value, _) = self.expression(&body[1..], &location)?;
                self.emit(Instruction::Print(value));
                Ok(())
            }

            Token::Reserved(keyword) if keyword.data_type().is_some() => {
                match keyword.data_type() {
                    Some(data_type) => self.declarations(&body[1..], data_type),
                    None => Ok(()),
                }
            }

            Token::Id(_) => self.assignment(body, location),

            _ => Err(Located::at(
                CodegenError::MalformedStatement(line.to_string()),
                tokens[0].location().clone(),
            )),
        }
    }

    fn function(&mut self, line: &StatementLine, location: Location) -> Codegen<()> {
        let tokens = line.tokens();
        let return_type = match tokens.get(1).map(Located::val) {
            Some(Token::Reserved(keyword)) => keyword.data_type(),
            _ => None,
        };

        let name = tokens.get(2).and_then(|token| token.val().id());
        let (return_type, name) = match (return_type, name, &self.function) {
            (Some(return_type), Some(name), None) => (return_type, name.as_ref()),
            _ => {
                let error = CodegenError::MalformedStatement(line.to_string());
                return Err(Located::at(error, location));
            }
        };

        self.listing.record(&self.scopes, name, return_type);
        self.scopes.push(ScopeKind::Function);
        self.function = Some(OpenFunction {
            name: name.to_owned(),
            return_type,
            section: Section::new(),
        });

        let params = tokens.get(4..tokens.len().saturating_sub(1)).unwrap_or_default();

        let mut data_type = None;
        for token in params {
            match token.val() {
                Token::Reserved(keyword) => data_type = keyword.data_type(),
                Token::Id(id) => {
                    if let Some(data_type) = data_type {
                        self.allocate(id.as_ref(), data_type);
                    }

                    data_type = None;
                }

                _ => (),
            }
        }

        Ok(())
    }

    fn declarations(&mut self, names: &[Located<Token>], data_type: DataType) -> Codegen<()> {
        let mut depth = 0usize;
        for token in names {
            match token.val() {
                Token::Terminal(Terminal::OpenSquare) => depth += 1,
                Token::Terminal(Terminal::CloseSquare) => depth = depth.saturating_sub(1),
                Token::Id(id) if depth == 0 => self.allocate(id.as_ref(), data_type),
                _ => (),
            }
        }

        Ok(())
    }

    /// Asigna un slot del frame a una variable nueva.
    fn allocate(&mut self, name: &str, data_type: DataType) {
        let frame = self.scopes.top();
        if self.variables.declare(frame, name, data_type).is_err() {
            return;
        }

        self.listing.record(&self.scopes, name, data_type);
        let offset = self.section().allocate(data_type);

        self.emit(Instruction::Slot {
            name: Rc::from(name),
            offset,
        });
    }

    fn if_statement(&mut self, line: &StatementLine, location: Location) -> Codegen<()> {
        let condition = self.condition(line, &location)?;
        self.scopes.push(ScopeKind::If);

        let then = self.label();
        let otherwise = self.label();

        self.branch(&condition, &then, true, &location)?;
        self.emit(Instruction::Jump(otherwise.clone()));
        self.emit(Instruction::SetLabel(then));

        self.blocks.push(Block::If {
            otherwise,
            end: None,
        });

        Ok(())
    }

    fn else_branch(&mut self, location: Location) -> Codegen<()> {
        let end = self.label();
        match self.blocks.last_mut() {
            Some(Block::If {
                otherwise,
                end: slot @ None,
            }) => {
                *slot = Some(end.clone());
                let otherwise = otherwise.clone();

                self.scopes.enter_else();
                self.emit(Instruction::Jump(end));
                self.emit(Instruction::SetLabel(otherwise));

                Ok(())
            }

            _ => Err(Located::at(CodegenError::UnbalancedBlock("else"), location)),
        }
    }

    fn end_if(&mut self, location: Location) -> Codegen<()> {
        match self.blocks.pop() {
            Some(Block::If { otherwise, end }) => {
                self.scopes.pop();
                self.emit(Instruction::SetLabel(end.unwrap_or(otherwise)));

                Ok(())
            }

            _ => Err(Located::at(CodegenError::UnbalancedBlock("fi"), location)),
        }
    }

    fn while_statement(&mut self, line: &StatementLine, location: Location) -> Codegen<()> {
        let condition = self.condition(line, &location)?;
        self.scopes.push(ScopeKind::While);

        let top = self.label();
        let exit = self.label();

        self.emit(Instruction::SetLabel(top.clone()));
        self.branch(&condition, &exit, false, &location)?;
        self.blocks.push(Block::While { top, exit });

        Ok(())
    }

    fn end_while(&mut self, location: Location) -> Codegen<()> {
        match self.blocks.pop() {
            Some(Block::While { top, exit }) => {
                self.scopes.pop();
                self.emit(Instruction::Jump(top));
                self.emit(Instruction::SetLabel(exit));

                Ok(())
            }

            _ => Err(Located::at(CodegenError::UnbalancedBlock("od"), location)),
        }
    }

    fn end_function(&mut self, location: Location) -> Codegen<()> {
        let open = match self.function.take() {
            Some(open) => open,
            None => return Err(Located::at(CodegenError::UnbalancedBlock("fed"), location)),
        };

        self.scopes.pop();
        self.last_compare = None;

        self.functions.push(ir::Function {
            exit: Some(Label::Exit(open.name.clone())),
            name: open.name,
            bytes: open.section.bytes,
            body: open.section.body,
        });

        Ok(())
    }

    fn return_statement(&mut self, value: &[Located<Token>], location: Location) -> Codegen<()> {
        let (name, return_type) = match &self.function {
            Some(open) => (open.name.clone(), open.return_type),
            None => return Err(Located::at(CodegenError::ReturnOutsideFunction, location)),
        };

        let (value, _) = self.expression(value, &location)?;
        self.emit(Instruction::Return {
            offset: return_type.size(),
            value,
        });

        self.emit(Instruction::Jump(Label::Exit(name)));
        Ok(())
    }

    /// Asignación, o una llamada cuyo resultado se descarta.
    fn assignment(&mut self, tokens: &[Located<Token>], location: Location) -> Codegen<()> {
        let split = tokens
            .iter()
            .position(|token| token.val().is_terminal(Terminal::Assign));

        let split = match split {
            Some(split) => split,
            None => {
                self.expression(tokens, &location)?;
                return Ok(());
            }
        };

        let target = match &tokens[..split] {
            [name] => self.operand(name)?.0,

            [name, open, index @ .., close]
                if open.val().is_terminal(Terminal::OpenSquare)
                    && close.val().is_terminal(Terminal::CloseSquare) =>
            {
                let (index, _) = self.expression(index, open.location())?;
                self.element(name, index)?.0
            }

            _ => {
                let error = CodegenError::MalformedStatement(tokens[0].val().text().to_owned());
                return Err(Located::at(error, location));
            }
        };

        let (value, _) = self.expression(&tokens[split + 1..], &location)?;
        self.emit(Instruction::Copy { target, value });

        Ok(())
    }

    fn condition<'l>(&self, line: &'l StatementLine, location: &Location) -> Codegen<Condition<'l>> {
        Condition::of_line(line.tokens()).ok_or_else(|| {
            let error = CodegenError::MalformedStatement(line.to_string());
            Located::at(error, location.clone())
        })
    }

    /// Emite saltos hacia `target` que se toman cuando la condición vale
    /// `when`; en caso contrario la ejecución continúa en la siguiente
    /// instrucción.
    fn branch(
        &mut self,
        condition: &Condition<'_>,
        target: &Label,
        when: bool,
        location: &Location,
    ) -> Codegen<()> {
        match condition {
            Condition::Compare { lhs, op, rhs } => {
                let (lhs, _) = self.expression(lhs, location)?;
                let (rhs, _) = self.expression(rhs, location)?;

                let operands = (lhs, rhs);
                if self.last_compare.as_ref() != Some(&operands) {
                    let (lhs, rhs) = operands.clone();
                    self.emit(Instruction::Compare(lhs, rhs));
                    self.last_compare = Some(operands);
                }

                let op = if when { *op } else { op.negate() };
                self.emit(Instruction::Branch(op, target.clone()));
            }

            Condition::Not(inner) => self.branch(inner, target, !when, location)?,

            Condition::And(lhs, rhs) if when => {
                let skip = self.label();
                self.branch(lhs, &skip, false, location)?;
                self.branch(rhs, target, true, location)?;
                self.emit(Instruction::SetLabel(skip));
            }

            Condition::And(lhs, rhs) => {
                self.branch(lhs, target, false, location)?;
                self.branch(rhs, target, false, location)?;
            }

            Condition::Or(lhs, rhs) if when => {
                self.branch(lhs, target, true, location)?;
                self.branch(rhs, target, true, location)?;
            }

            Condition::Or(lhs, rhs) => {
                let skip = self.label();
                self.branch(lhs, &skip, true, location)?;
                self.branch(rhs, target, false, location)?;
                self.emit(Instruction::SetLabel(skip));
            }
        }

        Ok(())
    }

    /// Aplana una expresión y retorna el operando con su resultado.
    fn expression(
        &mut self,
        tokens: &[Located<Token>],
        location: &Location,
    ) -> Codegen<(Operand, DataType)> {
        let mut items = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            let next = tokens.get(i + 1).map(Located::val);

            match token.val() {
                Token::Id(id) if next.map_or(false, |next| next.is_terminal(Terminal::OpenParen)) => {
                    let close = closing(tokens, i + 1)?;
                    let (value, data_type) = self.call(id.as_ref(), &tokens[i + 2..close], token)?;

                    self.push_value(&mut items, value, data_type);
                    i = close + 1;
                }

                Token::Id(_) if next.map_or(false, |next| next.is_terminal(Terminal::OpenSquare)) => {
                    let close = closing(tokens, i + 1)?;
                    let (index, _) = self.expression(&tokens[i + 2..close], tokens[i + 1].location())?;
                    let (value, data_type) = self.element(token, index)?;

                    self.push_value(&mut items, value, data_type);
                    i = close + 1;
                }

                Token::Terminal(Terminal::OpenParen) => {
                    let close = closing(tokens, i)?;
                    let (value, data_type) = self.expression(&tokens[i + 1..close], token.location())?;

                    self.push_value(&mut items, value, data_type);
                    i = close + 1;
                }

                Token::Terminal(terminal) if terminal.is_arithmetic() => {
                    items.push(Item::Op(*terminal, token.location().clone()));
                    i += 1;
                }

                Token::Id(_) | Token::Integer(_) | Token::Double(_) => {
                    let (value, data_type) = self.operand(token)?;
                    self.push_value(&mut items, value, data_type);
                    i += 1;
                }

                other => {
                    let error = CodegenError::MalformedExpression(other.text().to_owned());
                    return Err(Located::at(error, token.location().clone()));
                }
            }
        }

        self.fold(items, location)
    }

    /// Agrega un valor a la secuencia pendiente. Si lo precede un
    /// operador multiplicativo, la operación se emite de inmediato para
    /// respetar el orden del código fuente frente a llamadas posteriores.
    fn push_value(&mut self, items: &mut Vec<Item>, value: Operand, data_type: DataType) {
        let multiplicative = matches!(
            items.as_slice(),
            [.., Item::Value(..), Item::Op(Terminal::Times | Terminal::Slash | Terminal::Percent, _)]
        );

        if multiplicative {
            if let (Some(Item::Op(op, _)), Some(Item::Value(lhs, lhs_type))) = (items.pop(), items.pop()) {
                let (value, data_type) = self.binary((lhs, lhs_type), op, (value, data_type));
                items.push(Item::Value(value, data_type));
                return;
            }
        }

        items.push(Item::Value(value, data_type));
    }

    /// Reduce una secuencia `valor (op valor)*` a un único operando.
    fn fold(&mut self, items: Vec<Item>, location: &Location) -> Codegen<(Operand, DataType)> {
        let mut items = items.into_iter();
        let first = match items.next() {
            Some(Item::Value(value, data_type)) => (value, data_type),
            Some(Item::Op(op, at)) => return Err(malformed(op, at)),
            None => return Err(Located::at(CodegenError::EmptyExpression, location.clone())),
        };

        let mut rest = Vec::new();
        while let Some(item) = items.next() {
            let (op, at) = match item {
                Item::Op(op, at) => (op, at),
                Item::Value(value, _) => {
                    let error = CodegenError::MalformedExpression(value.to_string());
                    return Err(Located::at(error, location.clone()));
                }
            };

            match items.next() {
                Some(Item::Value(value, data_type)) => rest.push((op, (value, data_type))),
                _ => return Err(malformed(op, at)),
            }
        }

        // Multiplicativos primero
        let mut lhs = first;
        let mut additive = Vec::new();
        for (op, rhs) in rest {
            match op {
                Terminal::Times | Terminal::Slash | Terminal::Percent => {
                    lhs = self.binary(lhs, op, rhs);
                }

                _ => {
                    additive.push((op, std::mem::replace(&mut lhs, rhs)));
                }
            }
        }

        // Queda `v0 op1 v1 op2 ... vn`, con cada `op` aditivo
        let mut operands = additive;
        operands.push((Terminal::Plus, lhs));

        let mut operands = operands.into_iter();
        let (mut op, mut result) = match operands.next() {
            Some(first) => first,
            None => return Err(Located::at(CodegenError::EmptyExpression, location.clone())),
        };

        for (next_op, rhs) in operands {
            result = self.binary(result, op, rhs);
            op = next_op;
        }

        Ok(result)
    }

    fn binary(
        &mut self,
        (lhs, lhs_type): (Operand, DataType),
        op: Terminal,
        (rhs, rhs_type): (Operand, DataType),
    ) -> (Operand, DataType) {
        let data_type = lhs_type.widen(rhs_type);
        let output = self.temp(data_type);

        self.emit(Instruction::Binary {
            output,
            lhs,
            op,
            rhs,
        });

        (Operand::Temp(output), data_type)
    }

    /// `push` de cada argumento, salto con enlace y `pop` en orden inverso.
    fn call(
        &mut self,
        name: &str,
        args: &[Located<Token>],
        token: &Located<Token>,
    ) -> Codegen<(Operand, DataType)> {
        let return_type = self
            .table
            .function(name)
            .and_then(Entry::data_type)
            .ok_or_else(|| undefined(token))?;

        let mut values = Vec::new();
        for arg in arguments(args) {
            let (value, _) = self.expression(arg, token.location())?;
            values.push(value);
        }

        for value in &values {
            self.emit(Instruction::Push(value.clone()));
        }

        let output = self.temp(return_type);
        self.emit(Instruction::Call {
            output,
            target: name.to_owned(),
        });

        for value in values.into_iter().rev() {
            self.emit(Instruction::Pop(value));
        }

        Ok((Operand::Temp(output), return_type))
    }

    fn operand(&self, token: &Located<Token>) -> Codegen<(Operand, DataType)> {
        match token.val() {
            Token::Integer(text) => Ok((Operand::Literal(text.clone()), DataType::Integer)),
            Token::Double(text) => Ok((Operand::Literal(text.clone()), DataType::Double)),
            Token::Id(id) => {
                let data_type = self.type_of(id.as_ref()).ok_or_else(|| undefined(token))?;
                Ok((Operand::Name(Rc::from(id.as_ref())), data_type))
            }

            other => {
                let error = CodegenError::MalformedExpression(other.text().to_owned());
                Err(Located::at(error, token.location().clone()))
            }
        }
    }

    fn element(&self, token: &Located<Token>, index: Operand) -> Codegen<(Operand, DataType)> {
        match self.operand(token)? {
            (Operand::Name(name), data_type) => Ok((Operand::Element(name, Box::new(index)), data_type)),
            _ => {
                let error = CodegenError::MalformedExpression(token.val().text().to_owned());
                Err(Located::at(error, token.location().clone()))
            }
        }
    }

    fn type_of(&self, name: &str) -> Option<DataType> {
        self.variables
            .resolve(&self.scopes, name)
            .map(|(_, data_type)| *data_type)
            .or_else(|| self.table.function(name).and_then(Entry::data_type))
    }

    fn temp(&mut self, data_type: DataType) -> Temp {
        self.temps += 1;
        let temp = Temp(self.temps);

        self.listing.record(&self.scopes, &temp.to_string(), data_type);
        self.section().allocate(data_type);

        temp
    }

    fn label(&mut self) -> Label {
        self.labels += 1;
        Label::Numbered(self.labels)
    }

    fn section(&mut self) -> &mut Section {
        match &mut self.function {
            Some(open) => &mut open.section,
            None => &mut self.main,
        }
    }

    /// Un `cmp` solo se reutiliza si entre ambos no hubo más que saltos
    /// condicionales.
    fn emit(&mut self, instruction: Instruction) {
        if !matches!(instruction, Instruction::Compare(..) | Instruction::Branch(..)) {
            self.last_compare = None;
        }

        self.section().body.push(instruction);
    }
}

/// Índice del cierre que corresponde a la apertura en `open`.
fn closing(tokens: &[Located<Token>], open: usize) -> Codegen<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.val() {
            Token::Terminal(Terminal::OpenParen | Terminal::OpenSquare) => depth += 1,
            Token::Terminal(Terminal::CloseParen | Terminal::CloseSquare) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(i);
                }
            }

            _ => (),
        }
    }

    let token = &tokens[open];
    let error = CodegenError::MalformedExpression(token.val().text().to_owned());
    Err(Located::at(error, token.location().clone()))
}

/// Argumentos separados por comas al nivel más externo.
fn arguments(tokens: &[Located<Token>]) -> Vec<&[Located<Token>]> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.val() {
            Token::Terminal(Terminal::OpenParen | Terminal::OpenSquare) => depth += 1,
            Token::Terminal(Terminal::CloseParen | Terminal::CloseSquare) => {
                depth = depth.saturating_sub(1)
            }

            Token::Terminal(Terminal::Comma) if depth == 0 => {
                args.push(&tokens[start..i]);
                start = i + 1;
            }

            _ => (),
        }
    }

    args.push(&tokens[start..]);
    args
}

fn malformed(op: Terminal, location: Location) -> Located<CodegenError> {
    Located::at(CodegenError::MalformedExpression(op.text().to_owned()), location)
}

fn undefined(token: &Located<Token>) -> Located<CodegenError> {
    let error = CodegenError::Undefined(token.val().text().to_owned());
    Located::at(error, token.location().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Diagnostics, lex::Lexer, parse, source};

    fn generate_str(input: &str) -> Codegen<Tac> {
        let mut table = SymbolTable::new();
        let mut diagnostics = Diagnostics::default();

        let (start, chars) = source::consume(input.as_bytes(), "<test>");
        let tokens: Vec<_> = Lexer::new(start.clone(), chars, &mut table, &mut diagnostics).collect();

        let parsed = parse::parse(&start, &tokens, &mut table, &mut diagnostics);
        assert!(diagnostics.is_empty(), "{}", diagnostics);

        generate(parsed.lines(), &table)
    }

    fn main_body(input: &str) -> Vec<String> {
        let tac = generate_str(input).unwrap();
        tac.program()
            .main
            .body
            .iter()
            .map(Instruction::to_string)
            .collect()
    }

    #[test]
    fn flattens_simple_assignment() {
        let tac = generate_str("int a; a = 2 + 3;.").unwrap();
        let expected = "B main\n\n\
                        main: 8:\npush {LR}\npush {FP}\n\
                        a = fp + 8\nt1 = 2 + 3\na = t1\n\
                        pop {FP}\npop {PC}\n";

        assert_eq!(tac.to_string(), expected);
    }

    #[test]
    fn multiplicative_operators_fold_first() {
        assert_eq!(
            main_body("int a, b; a = a + b * 2 - 6 / b % 4;."),
            [
                "a = fp + 8",
                "b = fp + 12",
                "t1 = b * 2",
                "t2 = 6 / b",
                "t3 = t2 % 4",
                "t4 = a + t1",
                "t5 = t4 - t3",
                "a = t5",
            ]
        );
    }

    #[test]
    fn doubles_take_eight_bytes() {
        let tac = generate_str("int i; double d; d = i * 1.5;.").unwrap();
        assert_eq!(tac.program().main.bytes, 4 + 8 + 8);
        assert_eq!(
            tac.listing().to_string(),
            "GLOBAL SCOPE\n\ti, integer, GLOBAL\n\td, double, GLOBAL\n\tt1, double, GLOBAL\n"
        );
    }

    #[test]
    fn function_call_and_return() {
        let tac = generate_str("def int f(int x) return(x); fed f(1);.").unwrap();
        let expected = "B main\n\n\
                        f: 4:\npush {LR}\npush {FP}\n\
                        x = fp + 8\nfp - 4 = x\nB exitf\n\
                        exitf:\npop {FP}\npop {PC}\n\n\
                        main: 4:\npush {LR}\npush {FP}\n\
                        push {1}\nt1 = BL f\npop {1}\n\
                        pop {FP}\npop {PC}\n";

        assert_eq!(tac.to_string(), expected);
    }

    #[test]
    fn call_arguments_are_evaluated_first() {
        assert_eq!(
            main_body(
                "def double g(int a, double b) return(b); fed \
                 double r; r = 1 + g(2, r * 3);."
            ),
            [
                "r = fp + 8",
                "t1 = r * 3",
                "push {2}",
                "push {t1}",
                "t2 = BL g",
                "pop {t1}",
                "pop {2}",
                "t3 = 1 + t2",
                "r = t3",
            ]
        );
    }

    #[test]
    fn if_else_branches() {
        assert_eq!(
            main_body("int a; if (a < 1) then a = 1 else a = 2 fi; print(a)."),
            [
                "a = fp + 8",
                "cmp a, 1",
                "blt label1",
                "B label2",
                "label1:",
                "a = 1",
                "B label3",
                "label2:",
                "a = 2",
                "label3:",
                "print(a)",
            ]
        );
    }

    #[test]
    fn while_branches_on_negated_comparison() {
        assert_eq!(
            main_body("int a; while (a > 0) do a = a - 1 od."),
            [
                "a = fp + 8",
                "label1:",
                "cmp a, 0",
                "ble label2",
                "t1 = a - 1",
                "a = t1",
                "B label1",
                "label2:",
            ]
        );

        assert_eq!(
            main_body("int a; while (a <> 0) do a = 0 od."),
            ["a = fp + 8", "label1:", "cmp a, 0", "beq label2", "a = 0", "B label1", "label2:"]
        );
    }

    #[test]
    fn products_before_calls_keep_source_order() {
        assert_eq!(
            main_body(
                "def int g(int n) return(n); fed \
                 int a; print(a * 3 + g(a + 1) - 4)."
            ),
            [
                "a = fp + 8",
                "t1 = a * 3",
                "t2 = a + 1",
                "push {t2}",
                "t3 = BL g",
                "pop {t2}",
                "t4 = t1 + t3",
                "t5 = t4 - 4",
                "print(t5)",
            ]
        );
    }

    #[test]
    fn while_or_branches() {
        assert_eq!(
            main_body("int a, b; while ((a < 10) or (b > 3)) do a = 1 od."),
            [
                "a = fp + 8",
                "b = fp + 12",
                "label1:",
                "cmp a, 10",
                "blt label3",
                "cmp b, 3",
                "ble label2",
                "label3:",
                "a = 1",
                "B label1",
                "label2:",
            ]
        );
    }

    #[test]
    fn connectives_short_circuit() {
        assert_eq!(
            main_body("int a, b; while ((a < 10) and (b < 10)) do a = 1 od."),
            [
                "a = fp + 8",
                "b = fp + 12",
                "label1:",
                "cmp a, 10",
                "bge label2",
                "cmp b, 10",
                "bge label2",
                "a = 1",
                "B label1",
                "label2:",
            ]
        );

        // El segundo `cmp` es idéntico al anterior
        assert_eq!(
            main_body("int a, b; if ((a < b) or not (a <> b)) then print(a) fi."),
            [
                "a = fp + 8",
                "b = fp + 12",
                "cmp a, b",
                "blt label1",
                "beq label1",
                "B label2",
                "label1:",
                "print(a)",
                "label2:",
            ]
        );
    }

    #[test]
    fn array_elements() {
        assert_eq!(
            main_body("int v[4], i; v[i + 1] = v[i] * 2;."),
            ["v = fp + 8", "i = fp + 12", "t1 = i + 1", "t2 = v[i] * 2", "v[t1] = t2"]
        );
    }

    #[test]
    fn return_outside_function_is_fatal() {
        let error = generate_str("return(1).").err().unwrap();
        assert!(matches!(error.val(), CodegenError::ReturnOutsideFunction));
    }
}
