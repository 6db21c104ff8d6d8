//! Condiciones de `if` y `while`.
//!
//! Una condición ya validada por el parser se lee como un árbol de
//! comparaciones combinadas con `and`, `or` y `not`. Los operandos de
//! cada comparación se conservan como rebanadas de tokens, ya que tanto
//! el analizador semántico como el generador de código los tratan como
//! expresiones.

use crate::{
    lex::{Comparison, Keyword, Terminal, Token},
    source::Located,
};

/// Una condición.
#[derive(Debug)]
pub enum Condition<'a> {
    Compare {
        lhs: &'a [Located<Token>],
        op: Comparison,
        rhs: &'a [Located<Token>],
    },

    Not(Box<Condition<'a>>),
    And(Box<Condition<'a>>, Box<Condition<'a>>),
    Or(Box<Condition<'a>>, Box<Condition<'a>>),
}

impl<'a> Condition<'a> {
    /// Lee la condición de una línea `if (...) then` o `while (...) do`.
    ///
    /// Retorna `None` si la línea no tiene esa forma.
    pub fn of_line(tokens: &'a [Located<Token>]) -> Option<Condition<'a>> {
        match tokens {
            [head, inner @ .., tail]
                if matches!(head.val(), Token::Reserved(Keyword::If | Keyword::While))
                    && matches!(tail.val(), Token::Reserved(Keyword::Then | Keyword::Do)) =>
            {
                Condition::read(inner)
            }

            _ => None,
        }
    }

    /// Lee una condición que debe abarcar todos los tokens.
    pub fn read(tokens: &'a [Located<Token>]) -> Option<Condition<'a>> {
        let mut reader = Reader {
            tokens,
            position: 0,
        };

        let condition = reader.expression()?;
        (reader.position == tokens.len()).then(|| condition)
    }

    /// Todas las comparaciones, de izquierda a derecha.
    pub fn comparisons(&self) -> Vec<(&'a [Located<Token>], Comparison, &'a [Located<Token>])> {
        let mut comparisons = Vec::new();
        self.collect(&mut comparisons);
        comparisons
    }

    fn collect(&self, into: &mut Vec<(&'a [Located<Token>], Comparison, &'a [Located<Token>])>) {
        match self {
            Condition::Compare { lhs, op, rhs } => into.push((lhs, *op, rhs)),
            Condition::Not(inner) => inner.collect(into),
            Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => {
                lhs.collect(into);
                rhs.collect(into);
            }
        }
    }
}

struct Reader<'a> {
    tokens: &'a [Located<Token>],
    position: usize,
}

impl<'a> Reader<'a> {
    fn expression(&mut self) -> Option<Condition<'a>> {
        let mut lhs = self.term()?;
        while self.eat(|token| token.is_keyword(Keyword::Or)) {
            let rhs = self.term()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }

        Some(lhs)
    }

    fn term(&mut self) -> Option<Condition<'a>> {
        let mut lhs = self.factor()?;
        while self.eat(|token| token.is_keyword(Keyword::And)) {
            let rhs = self.factor()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }

        Some(lhs)
    }

    fn factor(&mut self) -> Option<Condition<'a>> {
        if self.eat(|token| token.is_keyword(Keyword::Not)) {
            let negated = self.factor()?;
            return Some(Condition::Not(Box::new(negated)));
        }

        if !self.eat(|token| token.is_terminal(Terminal::OpenParen)) {
            return None;
        }

        let inner = match self.peek()? {
            Token::Id(_) | Token::Integer(_) | Token::Double(_) => self.comparison()?,
            _ => self.expression()?,
        };

        self.eat(|token| token.is_terminal(Terminal::CloseParen))
            .then(|| inner)
    }

    fn comparison(&mut self) -> Option<Condition<'a>> {
        let lhs = self.operand();
        let op = match self.peek()? {
            Token::Comparison(op) => *op,
            _ => return None,
        };

        self.position += 1;
        let rhs = self.operand();

        if lhs.is_empty() || rhs.is_empty() {
            return None;
        }

        Some(Condition::Compare { lhs, op, rhs })
    }

    /// Expresión aritmética hasta una comparación o un `)` de cierre.
    fn operand(&mut self) -> &'a [Located<Token>] {
        let start = self.position;
        let mut depth = 0usize;

        while let Some(token) = self.tokens.get(self.position) {
            match token.val() {
                Token::Comparison(_) if depth == 0 => break,
                Token::Terminal(Terminal::CloseParen) if depth == 0 => break,
                Token::Terminal(Terminal::OpenParen) => depth += 1,
                Token::Terminal(Terminal::CloseParen) => depth -= 1,
                _ => (),
            }

            self.position += 1;
        }

        &self.tokens[start..self.position]
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position).map(Located::val)
    }

    fn eat<F: FnOnce(&Token) -> bool>(&mut self, predicate: F) -> bool {
        match self.peek() {
            Some(token) if predicate(token) => {
                self.position += 1;
                true
            }

            _ => false,
        }
    }
}
