//! Líneas de sentencia.
//!
//! Las fases de análisis semántico y generación de código no recorren
//! tokens sueltos, sino líneas de sentencia: secuencias de tokens que
//! forman una sentencia completa. Una línea termina en `;`, `then` o
//! `do`. Los cierres de bloque (`od`, `fi`, `fed`) y `else` inician una
//! línea propia; un `;` inmediatamente posterior a un cierre se une a su
//! línea. El encabezado de una función termina al cerrar la lista de
//! parámetros.

use std::fmt::{self, Display};

use crate::{
    lex::{Keyword, Terminal, Token},
    source::{Located, Location},
};

/// Una sentencia completa.
#[derive(Clone, Debug)]
pub struct StatementLine {
    tokens: Vec<Located<Token>>,
}

impl StatementLine {
    pub fn tokens(&self) -> &[Located<Token>] {
        &self.tokens
    }

    /// Tokens sin el `;` final.
    pub fn body(&self) -> &[Located<Token>] {
        match self.tokens.split_last() {
            Some((last, rest)) if last.val().is_terminal(Terminal::Semicolon) => rest,
            _ => &self.tokens,
        }
    }

    /// Primer token, el cual determina la clase de sentencia.
    pub fn first(&self) -> Option<&Token> {
        self.tokens.first().map(Located::val)
    }

    /// Número de línea en el código fuente donde inicia.
    pub fn line(&self) -> u32 {
        self.tokens.first().map_or(0, |token| token.location().line())
    }

    /// Ubicación que abarca toda la sentencia.
    pub fn location(&self) -> Option<Location> {
        let first = self.tokens.first()?.location().clone();
        let last = self.tokens.last()?.location();

        Some(Location::span(first, last))
    }
}

impl Display for StatementLine {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = self.tokens.iter();
        if let Some(first) = tokens.next() {
            fmt.write_str(first.val().text())?;
        }

        for token in tokens {
            write!(fmt, " {}", token.val().text())?;
        }

        Ok(())
    }
}

/// Agrupa un flujo de tokens en líneas de sentencia.
///
/// El fin del programa no forma parte de ninguna línea.
pub fn split<'a, I>(tokens: I) -> Vec<StatementLine>
where
    I: IntoIterator<Item = &'a Located<Token>>,
{
    let mut splitter = Splitter::default();
    for token in tokens {
        if let Token::End = token.val() {
            break;
        }

        splitter.push(token);
    }

    splitter.close();
    splitter.lines
}

#[derive(Default)]
struct Splitter {
    lines: Vec<StatementLine>,
    current: Vec<Located<Token>>,
    last_line: Option<u32>,
    header: Option<u32>,
    after_closer: bool,
    nesting: u32,
}

impl Splitter {
    fn push(&mut self, token: &Located<Token>) {
        let line = token.location().line();
        let newline = self.last_line.map_or(false, |last| last != line);
        if newline && self.at_boundary() && !continues(token.val()) {
            self.close();
        }

        self.last_line = Some(line);

        let is_semicolon = token.val().is_terminal(Terminal::Semicolon);
        if self.after_closer {
            self.after_closer = false;
            if is_semicolon {
                self.current.push(token.clone());
                self.close();
                return;
            }

            self.close();
        }

        match token.val() {
            Token::Reserved(Keyword::Then | Keyword::Do) => {
                self.current.push(token.clone());
                self.close();
            }

            Token::Reserved(Keyword::Else) => {
                self.close();
                self.current.push(token.clone());
                self.close();
            }

            Token::Reserved(Keyword::Od | Keyword::Fi | Keyword::Fed) => {
                self.close();
                self.current.push(token.clone());
                self.after_closer = true;
            }

            Token::Reserved(Keyword::Def) => {
                self.close();
                self.current.push(token.clone());
                self.header = Some(0);
            }

            Token::Terminal(Terminal::Semicolon) => {
                self.current.push(token.clone());
                self.close();
            }

            Token::Terminal(terminal @ (Terminal::OpenParen | Terminal::CloseParen)) => {
                let opens = *terminal == Terminal::OpenParen;
                self.current.push(token.clone());
                let step = |depth: u32| {
                    if opens {
                        depth + 1
                    } else {
                        depth.saturating_sub(1)
                    }
                };

                self.nesting = step(self.nesting);
                if let Some(depth) = self.header.as_mut() {
                    *depth = step(*depth);
                    if *depth == 0 {
                        self.close();
                    }
                }
            }

            _ => self.current.push(token.clone()),
        }
    }

    /// Un salto de línea solo cierra la línea actual si la sentencia no
    /// queda a medias.
    fn at_boundary(&self) -> bool {
        let dangling = match self.current.last().map(Located::val) {
            Some(Token::Terminal(terminal)) => *terminal != Terminal::CloseParen
                && *terminal != Terminal::CloseSquare,
            Some(Token::Comparison(_)) => true,
            Some(Token::Reserved(keyword)) => !matches!(
                keyword,
                Keyword::Od | Keyword::Fi | Keyword::Fed | Keyword::Else
            ),
            _ => false,
        };

        self.header.is_none() && self.nesting == 0 && !dangling
    }

    fn close(&mut self) {
        self.header = None;
        self.nesting = 0;
        self.after_closer = false;

        if !self.current.is_empty() {
            let tokens = std::mem::take(&mut self.current);
            self.lines.push(StatementLine { tokens });
        }
    }
}

/// Tokens que nunca inician una sentencia, por lo que al aparecer al
/// principio de una línea física continúan la sentencia anterior.
fn continues(token: &Token) -> bool {
    match token {
        Token::Terminal(_) | Token::Comparison(_) => true,
        Token::Reserved(keyword) => matches!(
            keyword,
            Keyword::Then | Keyword::Do | Keyword::And | Keyword::Or | Keyword::Not
        ),
        _ => false,
    }
}
