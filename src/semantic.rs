//! Análisis semántico.
//!
//! El analizador recorre las líneas de sentencia con una [`ScopeStack`],
//! validando declaraciones, compatibilidad de tipos en asignaciones,
//! condiciones y retornos, y la existencia de cada nombre usado. Nunca
//! transforma su entrada: todos los errores se reportan al [`Sink`] y el
//! recorrido continúa hasta el final, de modo que una sola ejecución
//! muestra todos los problemas.

use thiserror::Error;

use crate::{
    condition::Condition,
    error::{Category, Sink},
    lex::{Keyword, Terminal, Token},
    lines::StatementLine,
    scope::{Bindings, Listing, ScopeKind, ScopeStack},
    source::{Located, Location},
    symbols::{DataType, Entry, SymbolError, SymbolTable},
};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error("Variable `{0}` does not exist")]
    Undefined(String),

    #[error("Assignment type mismatch: `{name}` is {expected}, value is {found}")]
    AssignmentMismatch {
        name: String,
        expected: DataType,
        found: DataType,
    },

    #[error("Condition compares {0} against {1}")]
    ConditionMismatch(DataType, DataType),

    #[error("Function `{name}` returns {found}, but is declared {expected}")]
    ReturnMismatch {
        name: String,
        expected: DataType,
        found: DataType,
    },

    #[error("`return` outside of a function")]
    ReturnOutsideFunction,

    #[error("Unrecognized statement `{0}`")]
    Unrecognized(String),
}

/// Resultado del análisis.
pub struct Analysis {
    correct: bool,
    depth: usize,
    listing: Listing,
}

impl Analysis {
    /// Determina si el programa puede pasar a generación de código.
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    /// Profundidad final de la pila de ámbitos.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn into_listing(self) -> Listing {
        self.listing
    }
}

/// Analiza un programa ya validado por el parser.
pub fn analyze(lines: &[StatementLine], table: &SymbolTable, sink: &mut dyn Sink) -> Analysis {
    let mut analyzer = Analyzer {
        table,
        sink,
        scopes: ScopeStack::new(),
        variables: Bindings::default(),
        returns: Vec::new(),
        listing: Listing::default(),
        errors: 0,
    };

    for line in lines {
        analyzer.line(line);
    }

    Analysis {
        correct: analyzer.errors == 0,
        depth: analyzer.scopes.depth(),
        listing: analyzer.listing,
    }
}

/// Retorno esperado por la función que se está analizando.
struct PendingReturn {
    name: String,
    expected: DataType,
    mismatch: Option<DataType>,
}

struct Analyzer<'a> {
    table: &'a SymbolTable,
    sink: &'a mut dyn Sink,
    scopes: ScopeStack,
    variables: Bindings<DataType>,
    returns: Vec<PendingReturn>,
    listing: Listing,
    errors: usize,
}

impl Analyzer<'_> {
    fn line(&mut self, line: &StatementLine) {
        let (head, location) = match (line.first(), line.location()) {
            (Some(head), Some(location)) => (head, location),
            _ => return,
        };

        let tokens = line.tokens();
        let body = line.body();
        match head {
            Token::Reserved(Keyword::Def) => self.function(tokens),

            Token::Reserved(keyword @ (Keyword::If | Keyword::While)) => {
                let kind = match keyword {
                    Keyword::If => ScopeKind::If,
                    _ => ScopeKind::While,
                };

                self.scopes.push(kind);
                self.condition(tokens, location);
            }

            Token::Reserved(Keyword::Else) => {
                self.scopes.enter_else();
            }

            Token::Reserved(Keyword::Od | Keyword::Fi) => {
                self.scopes.pop();
            }

            Token::Reserved(Keyword::Fed) => {
                if let Some(pending) = self.returns.pop() {
                    if let Some(found) = pending.mismatch {
                        let error = SemanticError::ReturnMismatch {
                            name: pending.name,
                            expected: pending.expected,
                            found,
                        };

                        self.report(error, location);
                    }
                }

                self.scopes.pop();
            }

            Token::Reserved(Keyword::Return) => self.return_statement(&body[1..], location),

            Token::Reserved(keyword) if keyword.data_type().is_some() => {
                if let Some(data_type) = keyword.data_type() {
                    self.declarations(&body[1..], data_type);
                }
            }

            Token::Reserved(Keyword::Print) => {
                self.expression_type(&body[1..]);
            }

            Token::Id(_) => self.assignment(body, location),

            // Las líneas provienen de un programa ya aceptado por el parser
            _ => self.report(SemanticError::Unrecognized(line.to_string()), location),
        }
    }

    /// `def <tipo> <nombre> ( <parámetros> )`
    fn function(&mut self, tokens: &[Located<Token>]) {
        let return_type = match tokens.get(1).map(Located::val) {
            Some(Token::Reserved(keyword)) => keyword.data_type(),
            _ => None,
        };

        let name = tokens.get(2).and_then(|token| token.val().id());
        let (return_type, name, name_token) = match (return_type, name) {
            (Some(return_type), Some(name)) => (return_type, name.as_ref(), &tokens[2]),
            _ => return,
        };

        self.declare(name_token, name, return_type);

        self.scopes.push(ScopeKind::Function);
        self.returns.push(PendingReturn {
            name: name.to_owned(),
            expected: return_type,
            mismatch: None,
        });

        let params = tokens.get(4..tokens.len().saturating_sub(1)).unwrap_or_default();

        let mut data_type = None;
        let mut depth = 0usize;
        for token in params {
            match token.val() {
                Token::Reserved(keyword) if depth == 0 => data_type = keyword.data_type(),
                Token::Terminal(Terminal::OpenSquare) => depth += 1,
                Token::Terminal(Terminal::CloseSquare) => depth = depth.saturating_sub(1),

                Token::Id(id) if depth == 0 => {
                    if let Some(data_type) = data_type {
                        self.declare(token, id.as_ref(), data_type);
                    }
                }

                Token::Id(_) => {
                    self.type_of(token);
                }

                _ => (),
            }
        }
    }

    /// Lista de nombres de una declaración `int a, b;`
    fn declarations(&mut self, names: &[Located<Token>], data_type: DataType) {
        let mut depth = 0usize;
        for token in names {
            match token.val() {
                Token::Terminal(Terminal::OpenSquare) => depth += 1,
                Token::Terminal(Terminal::CloseSquare) => depth = depth.saturating_sub(1),
                Token::Id(id) if depth == 0 => self.declare(token, id.as_ref(), data_type),

                Token::Id(_) => {
                    self.type_of(token);
                }

                _ => (),
            }
        }
    }

    fn condition(&mut self, tokens: &[Located<Token>], location: Location) {
        let condition = match Condition::of_line(tokens) {
            Some(condition) => condition,
            None => return,
        };

        for (lhs, _, rhs) in condition.comparisons() {
            let lhs = self.expression_type(lhs);
            let rhs = self.expression_type(rhs);

            if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                if lhs != rhs {
                    self.report(SemanticError::ConditionMismatch(lhs, rhs), location.clone());
                }
            }
        }
    }

    fn return_statement(&mut self, value: &[Located<Token>], location: Location) {
        if !self.scopes.in_function() {
            self.report(SemanticError::ReturnOutsideFunction, location);
            return;
        }

        let found = match self.expression_type(value) {
            Some(found) => found,
            None => return,
        };

        if let Some(pending) = self.returns.last_mut() {
            if found != pending.expected && pending.mismatch.is_none() {
                pending.mismatch = Some(found);
            }
        }
    }

    /// Asignación o llamada usada como sentencia.
    fn assignment(&mut self, tokens: &[Located<Token>], location: Location) {
        let split = tokens
            .iter()
            .position(|token| token.val().is_terminal(Terminal::Assign));

        let (target, value) = match split {
            Some(split) => (&tokens[..split], &tokens[split + 1..]),
            None => {
                self.expression_type(tokens);
                return;
            }
        };

        let expected = self.expression_type(target);
        let found = self.expression_type(value);

        if let (Some(expected), Some(found)) = (expected, found) {
            if expected != found {
                let error = SemanticError::AssignmentMismatch {
                    name: target[0].val().text().to_owned(),
                    expected,
                    found,
                };

                self.report(error, location);
            }
        }
    }

    /// Tipo de una expresión aritmética.
    ///
    /// Un solo operando `double` promueve el resultado. Los argumentos de
    /// llamadas y los índices no influyen en el tipo, pero sus nombres sí
    /// deben existir. Retorna `None` si algún nombre no se encontró.
    fn expression_type(&mut self, tokens: &[Located<Token>]) -> Option<DataType> {
        let mut result: Option<DataType> = None;
        let mut complete = true;
        let mut nested = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let hidden = nested.iter().any(|&inner| inner);
            match token.val() {
                Token::Terminal(Terminal::OpenParen) => {
                    let call = i > 0 && matches!(tokens[i - 1].val(), Token::Id(_));
                    nested.push(call);
                }

                Token::Terminal(Terminal::OpenSquare) => nested.push(true),

                Token::Terminal(Terminal::CloseParen | Terminal::CloseSquare) => {
                    nested.pop();
                }

                Token::Id(_) | Token::Integer(_) | Token::Double(_) => match self.type_of(token) {
                    Some(data_type) if !hidden => {
                        result = Some(result.map_or(data_type, |current| current.widen(data_type)));
                    }

                    Some(_) => (),
                    None => complete = false,
                },

                _ => (),
            }
        }

        if complete {
            result
        } else {
            None
        }
    }

    /// Tipo de un operando. Primero se buscan funciones por nombre
    /// exacto, luego variables del bloque más interno hacia el global, y
    /// por último el tipo léxico de las literales.
    fn type_of(&mut self, token: &Located<Token>) -> Option<DataType> {
        let name = match token.val() {
            Token::Integer(_) => return Some(DataType::Integer),
            Token::Double(_) => return Some(DataType::Double),
            Token::Id(id) => id.as_ref(),
            _ => return None,
        };

        let found = self
            .table
            .function(name)
            .and_then(Entry::data_type)
            .or_else(|| {
                self.variables
                    .resolve(&self.scopes, name)
                    .map(|(_, data_type)| *data_type)
            });

        if found.is_none() {
            let error = SemanticError::Undefined(name.to_owned());
            self.report(error, token.location().clone());
        }

        found
    }

    fn declare(&mut self, token: &Located<Token>, name: &str, data_type: DataType) {
        let frame = self.scopes.top();
        match self.variables.declare(frame, name, data_type) {
            Ok(()) => self.listing.record(&self.scopes, name, data_type),
            Err(error) => self.report(error.into(), token.location().clone()),
        }
    }

    fn report(&mut self, error: SemanticError, location: Location) {
        self.errors += 1;
        self.sink
            .push(Category::Semantic, Located::at(error, location));
    }
}
