//! Análisis sintáctico.
//!
//! Parser predictivo descendente recursivo. Cada no terminal de
//! [`grammar::Nonterminal`] tiene su propia función; las alternativas se
//! seleccionan por lookahead contra los conjuntos FIRST y, en caso de
//! error, el análisis se resincroniza saltando tokens hasta alguno del
//! conjunto FOLLOW de la sentencia o declaración que falló. Un error que
//! escapa de la regla de programa detiene el análisis.
//!
//! Además de verificar la gramática, el parser registra en la tabla de
//! símbolos las funciones, sus parámetros y las declaraciones de
//! variables. Al cerrar una función con `fed`, el cuerpo renderizado se
//! guarda como payload de la entrada de la función.

pub mod grammar;
pub mod tree;

pub use tree::SyntaxNode;

use thiserror::Error;

use crate::{
    error::{Category, Sink},
    lex::Token,
    lines::{self, StatementLine},
    source::{Located, Location},
    symbols::{DataType, EntryKind, Payload, ScopeId, SymbolTable},
};

use grammar::{expected, Nonterminal, Symbol};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {expected}, found {found} instead")]
    UnexpectedToken { expected: String, found: String },

    #[error("Expected {0}, found end of input")]
    UnexpectedEof(String),
}

/// Resultado del análisis sintáctico.
pub struct Parsed {
    tree: SyntaxNode,
    lines: Vec<StatementLine>,
    correct: bool,
}

impl Parsed {
    /// Árbol sintáctico, solo para diagnóstico.
    pub fn tree(&self) -> &SyntaxNode {
        &self.tree
    }

    /// Líneas de sentencia para las fases posteriores.
    pub fn lines(&self) -> &[StatementLine] {
        &self.lines
    }

    /// Determina si no se encontraron errores de sintaxis.
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    pub fn into_tree(self) -> SyntaxNode {
        self.tree
    }
}

/// Analiza un flujo completo de tokens.
///
/// `start` es la ubicación que se reporta si no existe token alguno.
pub fn parse(
    start: &Location,
    tokens: &[Located<Token>],
    table: &mut SymbolTable,
    sink: &mut dyn Sink,
) -> Parsed {
    let mut parser = Parser {
        tokens,
        position: 0,
        last_known: start.clone(),
        table,
        sink,
        errors: 0,
        function: None,
    };

    let tree = parser.program();
    let correct = parser.errors == 0;

    Parsed {
        tree,
        lines: lines::split(tokens),
        correct,
    }
}

type Parse<T> = Result<T, Located<ParserError>>;

struct Parser<'a> {
    tokens: &'a [Located<Token>],
    position: usize,
    last_known: Location,
    table: &'a mut SymbolTable,
    sink: &'a mut dyn Sink,
    errors: usize,
    function: Option<OpenFunction>,
}

/// Función cuyo cuerpo se está analizando.
struct OpenFunction {
    name: String,
    scope: ScopeId,
}

impl<'a> Parser<'a> {
    fn program(&mut self) -> SyntaxNode {
        let mut children = self.func_decl();
        children.push(self.declarations());
        children.push(self.statement_sequence());

        if let Err(error) = self.expect(Symbol::End) {
            self.report(error);
        }

        SyntaxNode::prop("program", children)
    }

    fn func_decl(&mut self) -> Vec<SyntaxNode> {
        let mut functions = Vec::new();
        while self.first(Nonterminal::FuncDecl).is_some() {
            match self.func_def() {
                Ok(function) => functions.push(function),
                Err(error) => {
                    self.report(error);
                    self.function = None;

                    // Se descarta el resto de la función
                    while let Some(token) = self.lookahead() {
                        if Symbol::End.matches(token) {
                            break;
                        }

                        self.advance();
                        if Symbol::Text("fed").matches(token) {
                            break;
                        }
                    }
                }
            }

            // `;` opcional tras `fed`
            if self.at(Symbol::Text(";")) {
                self.advance();
            }
        }

        functions
    }

    fn func_def(&mut self) -> Parse<SyntaxNode> {
        self.expect(Symbol::Text("def"))?;
        let return_type = self.data_type()?;
        let name = self.expect(Symbol::Id)?.val().text();
        self.begin_function(name, return_type);

        self.expect(Symbol::Text("("))?;
        let params = self.params()?;
        self.expect(Symbol::Text(")"))?;

        let declarations = self.declarations();
        let body = self.statement_sequence();
        self.expect(Symbol::Text("fed"))?;
        self.end_function(&body);

        Ok(SyntaxNode::prop(
            "def",
            vec![
                SyntaxNode::leaf(return_type.to_string()),
                SyntaxNode::leaf(name),
                params,
                declarations,
                body,
            ],
        ))
    }

    fn params(&mut self) -> Parse<SyntaxNode> {
        let mut params = Vec::new();
        if self.first(Nonterminal::Params).is_some() {
            loop {
                let data_type = self.data_type()?;
                let var = self.var(Some(data_type))?;
                params.push(SyntaxNode::prop(data_type.to_string(), vec![var]));

                if self.first(Nonterminal::ParamsRight).is_none() {
                    break;
                }

                self.advance();
            }
        }

        Ok(SyntaxNode::prop("params", params))
    }

    fn declarations(&mut self) -> SyntaxNode {
        let mut declarations = Vec::new();
        while self.first(Nonterminal::Declarations).is_some() {
            let declaration = self.decl().and_then(|declaration| {
                self.expect(Symbol::Text(";"))?;
                Ok(declaration)
            });

            match declaration {
                Ok(declaration) => declarations.push(declaration),
                Err(error) => {
                    self.report(error);
                    self.recover(Nonterminal::Decl);

                    if self.at(Symbol::Text(";")) {
                        self.advance();
                    }
                }
            }
        }

        SyntaxNode::prop("declarations", declarations)
    }

    fn decl(&mut self) -> Parse<SyntaxNode> {
        let data_type = self.data_type()?;

        let mut names = vec![self.var(Some(data_type))?];
        while self.first(Nonterminal::VarlistRight).is_some() {
            self.advance();
            names.push(self.var(Some(data_type))?);
        }

        Ok(SyntaxNode::prop(data_type.to_string(), names))
    }

    fn data_type(&mut self) -> Parse<DataType> {
        let data_type = match self.lookahead() {
            Some(Token::Reserved(keyword)) => keyword.data_type(),
            _ => None,
        };

        match data_type {
            Some(data_type) => {
                self.advance();
                Ok(data_type)
            }

            None => Err(self.unexpected(expected(Nonterminal::Type.first()))),
        }
    }

    fn statement_sequence(&mut self) -> SyntaxNode {
        let mut statements = Vec::new();
        loop {
            match self.statement() {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => (),
                Err(error) => {
                    self.report(error);
                    self.recover(Nonterminal::Statement);
                }
            }

            if self.at(Symbol::Text(";")) {
                self.advance();
                continue;
            }

            match self.lookahead() {
                Some(token) if !follows(Nonterminal::StatementSequence, token) => {
                    let error = self.unexpected(expected(
                        Nonterminal::StatementSequenceRight.first(),
                    ));

                    self.report(error);
                    self.recover(Nonterminal::Statement);

                    if !self.at(Symbol::Text(";")) {
                        break;
                    }

                    self.advance();
                }

                _ => break,
            }
        }

        SyntaxNode::prop("statementSequence", statements)
    }

    fn statement(&mut self) -> Parse<Option<SyntaxNode>> {
        use crate::lex::Keyword;

        let token = match self.lookahead() {
            Some(token) => token,
            None => return Ok(None),
        };

        let statement = match token {
            Token::Reserved(Keyword::If) => self.if_statement()?,
            Token::Reserved(Keyword::While) => self.while_statement()?,

            Token::Reserved(keyword @ (Keyword::Print | Keyword::Return)) => {
                self.advance();
                let expr = self.expr()?;

                SyntaxNode::prop(keyword.text(), vec![expr])
            }

            // Llamada como sentencia
            Token::Id(_) if self.next_lookahead().map_or(false, |next| Symbol::Text("(").matches(next)) => {
                self.factor()?
            }

            Token::Id(_) => {
                let target = self.var(None)?;
                self.expect(Symbol::Text("="))?;
                let value = self.expr()?;

                SyntaxNode::prop("=", vec![target, value])
            }

            token if follows(Nonterminal::Statement, token) => return Ok(None),
            _ => return Err(self.unexpected(String::from("a statement"))),
        };

        Ok(Some(statement))
    }

    fn if_statement(&mut self) -> Parse<SyntaxNode> {
        self.expect(Symbol::Text("if"))?;
        let condition = self.branch_expression()?;
        self.expect(Symbol::Text("then"))?;

        let mut children = vec![condition, self.statement_sequence()];
        if self.first(Nonterminal::OptionElse).is_some() {
            self.advance();
            children.push(SyntaxNode::prop("else", vec![self.statement_sequence()]));
        }

        self.expect(Symbol::Text("fi"))?;
        Ok(SyntaxNode::prop("if", children))
    }

    fn while_statement(&mut self) -> Parse<SyntaxNode> {
        self.expect(Symbol::Text("while"))?;
        let condition = self.branch_expression()?;
        self.expect(Symbol::Text("do"))?;

        let body = self.statement_sequence();
        self.expect(Symbol::Text("od"))?;

        Ok(SyntaxNode::prop("while", vec![condition, body]))
    }

    fn expr(&mut self) -> Parse<SyntaxNode> {
        let mut lhs = self.term()?;
        while let Some(Symbol::Text(operator)) = self.first(Nonterminal::TermRight) {
            self.advance();
            let rhs = self.term()?;
            lhs = SyntaxNode::prop(operator, vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    fn term(&mut self) -> Parse<SyntaxNode> {
        let mut lhs = self.factor()?;
        while let Some(Symbol::Text(operator)) = self.first(Nonterminal::FactorRight) {
            self.advance();
            let rhs = self.factor()?;
            lhs = SyntaxNode::prop(operator, vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    fn factor(&mut self) -> Parse<SyntaxNode> {
        let (symbol, token) = self.select(Nonterminal::Factor)?;
        match symbol {
            Symbol::Id if self.next_lookahead().map_or(false, |next| Symbol::Text("(").matches(next)) => {
                self.advance();
                self.advance();

                let args = self.expression_sequence()?;
                self.expect(Symbol::Text(")"))?;

                let args = SyntaxNode::prop("params", args);
                Ok(SyntaxNode::prop(token.val().text(), vec![args]))
            }

            Symbol::Id => self.var(None),

            Symbol::Number => {
                self.advance();
                Ok(SyntaxNode::leaf(token.val().text()))
            }

            _ => {
                self.advance();
                let expr = self.expr()?;
                self.expect(Symbol::Text(")"))?;

                Ok(expr)
            }
        }
    }

    fn expression_sequence(&mut self) -> Parse<Vec<SyntaxNode>> {
        let mut args = Vec::new();
        if self.first(Nonterminal::ExpressionSequence).is_some() {
            args.push(self.expr()?);
            while self.first(Nonterminal::ExpressionSequenceRight).is_some() {
                self.advance();
                args.push(self.expr()?);
            }
        }

        Ok(args)
    }

    fn var(&mut self, declare: Option<DataType>) -> Parse<SyntaxNode> {
        let name = self.expect(Symbol::Id)?.val().text();
        if let Some(data_type) = declare {
            self.declare(name, data_type);
        }

        let leaf = SyntaxNode::leaf(name);
        if self.first(Nonterminal::VarRight).is_none() {
            return Ok(leaf);
        }

        self.advance();
        let index = self.expr()?;
        self.expect(Symbol::Text("]"))?;

        Ok(SyntaxNode::prop("[]", vec![leaf, index]))
    }

    fn branch_expression(&mut self) -> Parse<SyntaxNode> {
        let mut lhs = self.branch_term()?;
        while self.first(Nonterminal::BranchTermRight).is_some() {
            self.advance();
            let rhs = self.branch_term()?;
            lhs = SyntaxNode::prop("or", vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    fn branch_term(&mut self) -> Parse<SyntaxNode> {
        let mut lhs = self.branch_factor()?;
        while self.first(Nonterminal::BranchFactorRight).is_some() {
            self.advance();
            let rhs = self.branch_factor()?;
            lhs = SyntaxNode::prop("and", vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    fn branch_factor(&mut self) -> Parse<SyntaxNode> {
        let (symbol, _) = self.select(Nonterminal::BranchFactor)?;
        self.advance();

        if symbol == Symbol::Text("not") {
            let negated = self.branch_factor()?;
            return Ok(SyntaxNode::prop("not", vec![negated]));
        }

        let inner = self.branch_factor_paren()?;
        self.expect(Symbol::Text(")"))?;

        Ok(inner)
    }

    fn branch_factor_paren(&mut self) -> Parse<SyntaxNode> {
        match self.select(Nonterminal::BranchFactorParen)?.0 {
            Symbol::Id | Symbol::Number => {
                let lhs = self.expr()?;
                let (_, comparison) = self.select(Nonterminal::Comp)?;
                self.advance();
                let rhs = self.expr()?;

                Ok(SyntaxNode::prop(comparison.val().text(), vec![lhs, rhs]))
            }

            _ => self.branch_expression(),
        }
    }

    fn begin_function(&mut self, name: &str, return_type: DataType) {
        let scope = match self.table.define_function(name, return_type) {
            Ok(scope) => Some(scope),
            Err(_) => self.table.function_scope(name),
        };

        self.function = scope.map(|scope| OpenFunction {
            name: name.to_owned(),
            scope,
        });
    }

    fn end_function(&mut self, body: &SyntaxNode) {
        if let Some(function) = self.function.take() {
            let global = self.table.global();
            let body = Payload::Text(body.to_string());
            self.table
                .set_payload(global, &function.name, EntryKind::Function, body);
        }
    }

    /// Las redeclaraciones se reportan durante análisis semántico.
    fn declare(&mut self, name: &str, data_type: DataType) {
        let scope = match &self.function {
            Some(function) => function.scope,
            None => self.table.global(),
        };

        let _ = self.table.insert(
            scope,
            name,
            EntryKind::Variable,
            Some(data_type),
            Payload::Empty,
        );
    }

    /// Símbolo de FIRST que coincide con el lookahead, sin consumirlo.
    fn first(&self, rule: Nonterminal) -> Option<Symbol> {
        let token = self.lookahead()?;
        rule.first()
            .iter()
            .copied()
            .find(|symbol| symbol.matches(token))
    }

    /// Como [`Parser::first()`], pero falla si no hay coincidencia.
    fn select(&self, rule: Nonterminal) -> Parse<(Symbol, &'a Located<Token>)> {
        match (self.first(rule), self.tokens.get(self.position)) {
            (Some(symbol), Some(token)) => Ok((symbol, token)),
            _ => Err(self.unexpected(expected(rule.first()))),
        }
    }

    fn expect(&mut self, symbol: Symbol) -> Parse<&'a Located<Token>> {
        match self.tokens.get(self.position) {
            Some(token) if symbol.matches(token.val()) => {
                self.advance();
                Ok(token)
            }

            _ => Err(self.unexpected(symbol.to_string())),
        }
    }

    fn at(&self, symbol: Symbol) -> bool {
        self.lookahead().map_or(false, |token| symbol.matches(token))
    }

    fn lookahead(&self) -> Option<&'a Token> {
        self.tokens.get(self.position).map(Located::val)
    }

    fn next_lookahead(&self) -> Option<&'a Token> {
        self.tokens.get(self.position + 1).map(Located::val)
    }

    fn advance(&mut self) {
        if let Some(token) = self.tokens.get(self.position) {
            self.last_known = token.location().clone();
            self.position += 1;
        }
    }

    /// Salta tokens hasta encontrar alguno de FOLLOW de la regla.
    fn recover(&mut self, rule: Nonterminal) {
        while let Some(token) = self.lookahead() {
            if Symbol::End.matches(token) || follows(rule, token) {
                break;
            }

            self.advance();
        }
    }

    fn unexpected(&self, expected: String) -> Located<ParserError> {
        match self.tokens.get(self.position) {
            Some(token) => {
                let found = token.val().to_string();
                let error = ParserError::UnexpectedToken { expected, found };

                Located::at(error, token.location().clone())
            }

            None => Located::at(ParserError::UnexpectedEof(expected), self.last_known.clone()),
        }
    }

    fn report(&mut self, error: Located<ParserError>) {
        self.errors += 1;
        self.sink.push(Category::Parse, error);
    }
}

fn follows(rule: Nonterminal, token: &Token) -> bool {
    rule.follow().iter().any(|symbol| symbol.matches(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Diagnostics,
        lex::Lexer,
        source,
        symbols::{DataType, SymbolTable},
    };

    fn parse_str(input: &str) -> (Parsed, SymbolTable, Diagnostics) {
        let mut table = SymbolTable::new();
        let mut diagnostics = Diagnostics::default();

        let (start, chars) = source::consume(input.as_bytes(), "<test>");
        let tokens: Vec<_> =
            Lexer::new(start.clone(), chars, &mut table, &mut diagnostics).collect();

        let parsed = parse(&start, &tokens, &mut table, &mut diagnostics);
        (parsed, table, diagnostics)
    }

    #[test]
    fn declarations_and_assignments() {
        let (parsed, table, diagnostics) = parse_str("int a; a = 2 + 3;.");

        assert!(parsed.is_correct());
        assert!(diagnostics.is_empty());
        assert_eq!(parsed.lines().len(), 2);

        let expected = "program\n  declarations\n    integer\n      a\n  statementSequence\n    =\n      a\n      +\n        2\n        3\n";
        assert_eq!(parsed.tree().to_string(), expected);

        let global = table.global();
        let a = table.lookup(global, "a").unwrap();
        assert_eq!(a.data_type(), Some(DataType::Integer));
    }

    #[test]
    fn functions_register_signature_and_body() {
        let (parsed, table, diagnostics) =
            parse_str("def int f(int x) return(x); fed f(1);.");

        assert!(parsed.is_correct(), "{}", diagnostics);

        let f = table.function("f").unwrap();
        assert_eq!(f.data_type(), Some(DataType::Integer));
        assert_eq!(
            *f.payload(),
            Payload::Text(String::from("statementSequence\n  return\n    x\n"))
        );

        let scope = table.function_scope("f").unwrap();
        let x = table.lookup(scope, "x").unwrap();
        assert_eq!(x.scope(), scope);
        assert_eq!(x.data_type(), Some(DataType::Integer));
    }

    #[test]
    fn precedence_and_calls_in_expressions() {
        let (parsed, _, diagnostics) =
            parse_str("double r; r = 1 + g(2, x * 3) % 4 - (5 - 6);.");

        assert!(parsed.is_correct(), "{}", diagnostics);

        let statements = &parsed.tree().children()[1];
        let assignment = &statements.children()[0];
        let value = &assignment.children()[1];

        assert_eq!(value.value(), "-");
        assert_eq!(value.children()[0].value(), "+");
        assert_eq!(value.children()[0].children()[1].value(), "%");
        assert_eq!(value.children()[0].children()[1].children()[0].value(), "g");
    }

    #[test]
    fn nested_conditions() {
        let (parsed, _, diagnostics) = parse_str(
            "int a; if ((a < 1) and not (a == 2) or (a <> 3)) then print a else a = 1 fi; \
             while (a[0] >= 0) do a = a - 1 od.",
        );

        assert!(parsed.is_correct(), "{}", diagnostics);

        let statements = &parsed.tree().children()[1];
        let condition = &statements.children()[0].children()[0];
        assert_eq!(condition.value(), "or");
        assert_eq!(condition.children()[0].value(), "and");
        assert_eq!(condition.children()[0].children()[1].value(), "not");
    }

    #[test]
    fn recovers_at_statement_boundaries() {
        let (parsed, _, diagnostics) = parse_str("int a; a = ; a = 2; print a.");

        assert!(!parsed.is_correct());
        assert_eq!(diagnostics.count(Category::Parse), 1);
        assert_eq!(
            diagnostics.messages(Category::Parse),
            ["Expected identifier, number or `(`, found `;` instead"]
        );

        let statements = &parsed.tree().children()[1];
        assert_eq!(statements.children().len(), 2);
    }

    #[test]
    fn missing_semicolon_is_reported_once() {
        let (parsed, _, diagnostics) = parse_str("int a; a = 1 a = 2; print a.");

        assert!(!parsed.is_correct());
        assert_eq!(
            diagnostics.messages(Category::Parse),
            ["Expected `;`, found identifier `a` instead"]
        );
    }

    #[test]
    fn bad_declarations_are_skipped() {
        let (parsed, _, diagnostics) = parse_str("int 3; double b; b = 1.5;.");

        assert!(!parsed.is_correct());
        assert_eq!(diagnostics.count(Category::Parse), 1);
        assert_eq!(parsed.tree().children()[0].children().len(), 1);
    }

    #[test]
    fn unterminated_function_is_reported() {
        let (parsed, table, diagnostics) = parse_str("def int f() return 1;.");

        assert!(!parsed.is_correct());
        assert!(diagnostics.count(Category::Parse) >= 1);
        assert!(table.function("f").is_some());
    }

    #[test]
    fn error_tokens_become_parse_errors() {
        let (parsed, _, diagnostics) = parse_str("3.e");

        assert!(!parsed.is_correct());
        assert_eq!(diagnostics.count(Category::Lexical), 1);
        assert!(diagnostics.count(Category::Parse) >= 1);
        assert_eq!(
            diagnostics.messages(Category::Parse)[0],
            "Expected a statement, found invalid token `3.e` instead"
        );
    }
}
