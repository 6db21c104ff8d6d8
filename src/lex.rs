//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los
//! espacios en blanco se descartan durante esta operación. Cada token
//! emitido está asociado a una ubicación en el código fuente original, lo
//! cual permite rastrear errores tanto en los mismos como en constructos
//! más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Todo token conserva su texto original, el cual se deriva de la
//! variante por medio de [`Token::text()`]. Los identificadores además
//! llevan su posición en la lista acumulada de nombres; las palabras
//! reservadas ocupan las primeras posiciones de esa lista.
//!
//! # Tabla de símbolos
//! Como efecto secundario del reconocimiento, el lexer registra en el
//! ámbito global las constantes, operadores, palabras clave y terminales
//! que encuentra.
//!
//! # Errores
//! Los errores léxicos no son fatales. Cada error se reporta al [`Sink`]
//! y se emite un [`Token::Error`] en su lugar, de forma que las fases
//! posteriores siempre reciben algún token.

use crate::{
    error::{Category, Sink},
    source::{InputStream, Located, Location},
    symbols::{DataType, EntryKind, Payload, SymbolTable},
};

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Carácter que termina el programa.
pub const END: char = '.';

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Constante numérica con un carácter inválido.
    #[error("Malformed numeric literal, unexpected {0:?}")]
    MalformedNumber(char),

    /// El exponente termina antes de su primer dígito, ya sea por un
    /// espacio o por el fin de la entrada.
    #[error("Malformed numeric literal, exponent has no digits")]
    MissingExponent,

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {}]", i32::MAX)]
    IntOverflow,
}

/// Un identificador y su posición en la lista de nombres.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: Rc<str>,
    offset: usize,
}

impl Identifier {
    /// Posición en la lista acumulada de nombres.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.name)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Palabra reservada.
    Reserved(Keyword),

    /// Identificador.
    Id(Identifier),

    /// Literal entero, con su texto original.
    Integer(Rc<str>),

    /// Literal de punto flotante, con su texto original.
    Double(Rc<str>),

    /// Operador relacional.
    Comparison(Comparison),

    /// Puntuación y operadores aritméticos.
    Terminal(Terminal),

    /// `.`, fin del programa.
    End,

    /// Texto que no forma un token válido.
    Error(Rc<str>),
}

impl Token {
    /// Texto del token.
    pub fn text(&self) -> &str {
        match self {
            Token::Reserved(keyword) => keyword.text(),
            Token::Id(id) => id.as_ref(),
            Token::Integer(text) | Token::Double(text) | Token::Error(text) => text,
            Token::Comparison(comparison) => comparison.text(),
            Token::Terminal(terminal) => terminal.text(),
            Token::End => ".",
        }
    }

    /// Determina si el token es una palabra reservada específica.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        *self == Token::Reserved(keyword)
    }

    /// Determina si el token es un terminal específico.
    pub fn is_terminal(&self, terminal: Terminal) -> bool {
        *self == Token::Terminal(terminal)
    }

    /// Identificador contenido, si lo hay.
    pub fn id(&self) -> Option<&Identifier> {
        match self {
            Token::Id(id) => Some(id),
            _ => None,
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Reserved(_) => write!(fmt, "keyword `{}`", self.text()),
            Token::Id(_) => write!(fmt, "identifier `{}`", self.text()),
            Token::Integer(_) | Token::Double(_) => write!(fmt, "literal `{}`", self.text()),
            Token::End => fmt.write_str("end of program `.`"),
            Token::Error(_) => write!(fmt, "invalid token `{}`", self.text()),
            _ => write!(fmt, "`{}`", self.text()),
        }
    }
}

/// Una palabra reservada.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Then,
    Else,
    Fi,
    While,
    Do,
    Od,
    Def,
    Fed,
    Int,
    Double,
    Print,
    Return,
    Or,
    And,
    Not,
}

#[rustfmt::skip]
const KEYWORDS: &[(&str, Keyword)] = &[
    ("if",     Keyword::If),
    ("then",   Keyword::Then),
    ("else",   Keyword::Else),
    ("fi",     Keyword::Fi),
    ("while",  Keyword::While),
    ("do",     Keyword::Do),
    ("od",     Keyword::Od),
    ("def",    Keyword::Def),
    ("fed",    Keyword::Fed),
    ("int",    Keyword::Int),
    ("double", Keyword::Double),
    ("print",  Keyword::Print),
    ("return", Keyword::Return),
    ("or",     Keyword::Or),
    ("and",    Keyword::And),
    ("not",    Keyword::Not),
];

impl Keyword {
    pub fn text(self) -> &'static str {
        KEYWORDS[self.offset()].0
    }

    /// Posición en la lista de nombres, donde las palabras
    /// reservadas aparecen primero.
    pub fn offset(self) -> usize {
        self as usize
    }

    /// Tipo de dato que nombra, si es `int` o `double`.
    pub fn data_type(self) -> Option<DataType> {
        match self {
            Keyword::Int => Some(DataType::Integer),
            Keyword::Double => Some(DataType::Double),
            _ => None,
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.text())
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Operadores relacionales.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    pub fn text(self) -> &'static str {
        match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "<>",
        }
    }

    /// Nombre descriptivo que se registra en la tabla de símbolos.
    pub fn description(self) -> &'static str {
        match self {
            Comparison::Less => "less than",
            Comparison::LessOrEqual => "less-than equal",
            Comparison::Greater => "greater than",
            Comparison::GreaterOrEqual => "greater-than equal",
            Comparison::Equal => "equals",
            Comparison::NotEqual => "not equal",
        }
    }

    /// Comparación complementaria.
    pub fn negate(self) -> Comparison {
        match self {
            Comparison::Less => Comparison::GreaterOrEqual,
            Comparison::LessOrEqual => Comparison::Greater,
            Comparison::Greater => Comparison::LessOrEqual,
            Comparison::GreaterOrEqual => Comparison::Less,
            Comparison::Equal => Comparison::NotEqual,
            Comparison::NotEqual => Comparison::Equal,
        }
    }
}

/// Puntuación y operadores aritméticos.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminal {
    Semicolon,
    Comma,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    Plus,
    Minus,
    Times,
    Slash,
    Percent,
    Assign,
}

impl Terminal {
    pub fn text(self) -> &'static str {
        match self {
            Terminal::Semicolon => ";",
            Terminal::Comma => ",",
            Terminal::OpenParen => "(",
            Terminal::CloseParen => ")",
            Terminal::OpenSquare => "[",
            Terminal::CloseSquare => "]",
            Terminal::Plus => "+",
            Terminal::Minus => "-",
            Terminal::Times => "*",
            Terminal::Slash => "/",
            Terminal::Percent => "%",
            Terminal::Assign => "=",
        }
    }

    /// Determina si es un operador aritmético binario.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Terminal::Plus | Terminal::Minus | Terminal::Times | Terminal::Slash | Terminal::Percent
        )
    }

    fn from_char(c: char) -> Option<Terminal> {
        let terminal = match c {
            ';' => Terminal::Semicolon,
            ',' => Terminal::Comma,
            '(' => Terminal::OpenParen,
            ')' => Terminal::CloseParen,
            '[' => Terminal::OpenSquare,
            ']' => Terminal::CloseSquare,
            '+' => Terminal::Plus,
            '-' => Terminal::Minus,
            '*' => Terminal::Times,
            '/' => Terminal::Slash,
            '%' => Terminal::Percent,
            _ => return None,
        };

        Some(terminal)
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<'a, S: Iterator> {
    source: Peekable<S>,
    state: State,
    start: Location,
    next: Location,
    names: Vec<Rc<str>>,
    queued: Option<Located<Token>>,
    table: &'a mut SymbolTable,
    sink: &'a mut dyn Sink,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido
    /// sin consumir la entrada actual.
    Complete(Token),

    /// Se encontró `<`, `>` o `=`, que pueden extenderse con
    /// un segundo carácter.
    Relational(char),

    /// Parte entera de una constante numérica.
    Integer(String),

    /// Parte fraccionaria, después de `.`. Se conserva la ubicación
    /// del último dígito entero por si el punto resulta ser el fin
    /// del programa.
    Fraction(String, Location),

    /// Se encontró `e` o `E`; puede seguir un signo.
    Exponent(String),

    /// Exponente con signo; se requiere al menos un dígito.
    ExponentSign(String),

    /// Dígitos del exponente.
    ExponentDigits(String),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),

    /// Recuperación tras un error dentro de una constante. Se
    /// consumen caracteres alfanuméricos hasta resincronizar.
    Recover(String),

    /// Se encontró el fin del programa o un error de E/S.
    Done,
}

impl<'a, S: InputStream> Lexer<'a, S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(
        start: Location,
        source: S,
        table: &'a mut SymbolTable,
        sink: &'a mut dyn Sink,
    ) -> Self {
        let next = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            next,
            names: KEYWORDS.iter().map(|&(name, _)| Rc::from(name)).collect(),
            queued: None,
            table,
            sink,
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Option<(Token, Location)> {
        use State::*;

        let mut last_accepted = self.start.clone();
        let token = loop {
            // Se espera un siguiente carácter; un error de E/S termina el escaneo
            let next_char = match self.source.peek() {
                None => None,
                Some(Ok((c, _))) => Some(*c),
                Some(Err(_)) => {
                    if let Some(Err(error)) = self.source.next() {
                        self.report(LexerError::Input(error), self.next.clone());
                    }

                    self.state = Done;
                    return None;
                }
            };

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next.clone();
            }

            match (&mut self.state, next_char) {
                (Done, _) | (Start, None) => return None,

                // Espacios en blanco
                (Start, Some(c)) if c.is_ascii_whitespace() => (),

                // Tokens triviales
                (Start, Some(END)) => self.state = Complete(Token::End),
                (Start, Some(c @ ('<' | '>' | '='))) => self.state = Relational(c),
                (Start, Some(c)) if Terminal::from_char(c).is_some() => {
                    if let Some(terminal) = Terminal::from_char(c) {
                        self.state = Complete(Token::Terminal(terminal));
                    }
                }

                // Inicio de una constante numérica. No se consume el
                // dígito, ya que el estado de constante entera lo hace.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(String::new());
                    continue;
                }

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() => self.state = Word(c.to_string()),

                (Start, Some(c)) => {
                    self.report(LexerError::BadChar(c), self.next.clone());
                    self.state = Complete(Token::Error(Rc::from(c.to_string())));
                }

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => break std::mem::replace(token, Token::End),

                // Operadores de dos caracteres por lookahead
                (Relational(first), Some(second)) => {
                    let comparison = match (*first, second) {
                        ('<', '=') => Some(Comparison::LessOrEqual),
                        ('<', '>') => Some(Comparison::NotEqual),
                        ('>', '=') => Some(Comparison::GreaterOrEqual),
                        ('=', '=') => Some(Comparison::Equal),
                        _ => None,
                    };

                    match comparison {
                        Some(comparison) => self.state = Complete(Token::Comparison(comparison)),
                        None => break single_relational(*first),
                    }
                }

                (Relational(first), None) => break single_relational(*first),

                // Constantes numéricas
                (Integer(text), Some(c)) if c.is_ascii_digit() => text.push(c),
                (Integer(text), Some(c @ '.')) => {
                    text.push(c);
                    self.state = Fraction(std::mem::take(text), last_accepted.clone());
                }

                (Integer(text) | Fraction(text, _), Some(c @ ('e' | 'E'))) => {
                    text.push(c);
                    self.state = Exponent(std::mem::take(text));
                }

                (Fraction(text, _), Some(c)) if c.is_ascii_digit() => text.push(c),

                (Integer(text) | Fraction(text, _), Some(c)) if c.is_ascii_alphabetic() => {
                    let text = std::mem::take(text);
                    self.report(LexerError::MalformedNumber(c), self.next.clone());

                    self.state = Recover(text);
                    continue;
                }

                (Integer(text), _) => {
                    let text = std::mem::take(text);
                    break self.integer(text, &last_accepted);
                }

                // Un punto sin dígitos ni exponente es el fin del programa
                (Fraction(text, digits_end), _) if text.ends_with(END) => {
                    let mut text = std::mem::take(text);
                    let digits_end = digits_end.clone();
                    text.pop();

                    self.queued = Some(Located::at(Token::End, last_accepted));
                    self.state = Done;

                    let token = self.integer(text, &digits_end);
                    last_accepted = digits_end;
                    break token;
                }

                (Fraction(text, _), _) => break Token::Double(Rc::from(std::mem::take(text))),

                (Exponent(text), Some(c @ ('+' | '-'))) => {
                    text.push(c);
                    self.state = ExponentSign(std::mem::take(text));
                }

                (Exponent(text) | ExponentSign(text), Some(c)) if c.is_ascii_digit() => {
                    text.push(c);
                    self.state = ExponentDigits(std::mem::take(text));
                }

                (Exponent(text) | ExponentSign(text), c) => {
                    let text = std::mem::take(text);
                    let error = match c {
                        Some(c) if !c.is_ascii_whitespace() => LexerError::MalformedNumber(c),
                        _ => LexerError::MissingExponent,
                    };

                    self.report(error, self.next.clone());

                    self.state = Recover(text);
                    continue;
                }

                (ExponentDigits(text), Some(c)) if c.is_ascii_digit() => text.push(c),
                (ExponentDigits(text), _) => {
                    break Token::Double(Rc::from(std::mem::take(text)))
                }

                // Resincronización
                (Recover(text), Some(c)) if c.is_ascii_alphanumeric() => text.push(c),
                (Recover(text), _) => break Token::Error(Rc::from(std::mem::take(text))),

                // Extensión de términos
                (Word(word), Some(c)) if c.is_ascii_alphanumeric() => word.push(c),
                (Word(word), _) => {
                    let word = std::mem::take(word);
                    break self.word(word);
                }
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(Ok((_, next_position))) = self.source.next() {
                last_accepted = std::mem::replace(&mut self.next, next_position);
            }
        };

        Some((token, last_accepted))
    }

    /// Resuelve una constante entera, validando su rango.
    fn integer(&mut self, text: String, last_accepted: &Location) -> Token {
        match text.parse::<i32>() {
            Ok(_) => Token::Integer(Rc::from(text)),
            Err(_) => {
                let location = Location::span(self.start.clone(), last_accepted);
                self.report(LexerError::IntOverflow, location);

                Token::Error(Rc::from(text))
            }
        }
    }

    /// Distingue entre palabras reservadas e identificadores.
    fn word(&mut self, word: String) -> Token {
        if let Ok(keyword) = word.parse::<Keyword>() {
            return Token::Reserved(keyword);
        }

        let offset = match self.names.iter().position(|name| **name == *word) {
            Some(offset) => offset,
            None => {
                self.names.push(Rc::from(word.as_str()));
                self.names.len() - 1
            }
        };

        Token::Id(Identifier {
            name: Rc::clone(&self.names[offset]),
            offset,
        })
    }

    /// Registra en el ámbito global lo que corresponda a un token.
    fn record(&mut self, token: &Token) {
        let (kind, data_type, payload) = match token {
            Token::Reserved(_) => (EntryKind::Keyword, None, Payload::Empty),

            Token::Integer(text) => {
                let value = text.parse().map_or(Payload::Empty, Payload::Integer);
                (EntryKind::Constant, Some(DataType::Integer), value)
            }

            Token::Double(text) => {
                let value = text.parse().map_or(Payload::Empty, Payload::Double);
                (EntryKind::Constant, Some(DataType::Double), value)
            }

            Token::Comparison(comparison) => {
                let description = Payload::Text(comparison.description().to_owned());
                (EntryKind::Operation, None, description)
            }

            Token::Terminal(Terminal::Assign) => {
                let description = Payload::Text(String::from("assignment"));
                (EntryKind::Operation, None, description)
            }

            Token::Terminal(_) => (EntryKind::Terminal, None, Payload::Empty),

            Token::Id(_) | Token::End | Token::Error(_) => return,
        };

        let global = self.table.global();
        let _ = self
            .table
            .insert(global, token.text(), kind, data_type, payload);
    }

    fn report(&mut self, error: LexerError, location: Location) {
        self.sink
            .push(Category::Lexical, Located::at(error, location));
    }
}

impl<S: InputStream> Iterator for Lexer<'_, S> {
    type Item = Located<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.queued.take() {
            return Some(token);
        }

        let (token, last_accepted) = self.lex()?;

        // Nada sigue al fin del programa
        self.state = match (&token, &self.state) {
            (Token::End, _) | (_, State::Done) => State::Done,
            _ => State::Start,
        };

        self.record(&token);

        let location = Location::span(self.start.clone(), &last_accepted);
        Some(Located::at(token, location))
    }
}

fn single_relational(c: char) -> Token {
    match c {
        '<' => Token::Comparison(Comparison::Less),
        '>' => Token::Comparison(Comparison::Greater),
        _ => Token::Terminal(Terminal::Assign),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Diagnostics, source};

    fn lex(input: &str) -> (Vec<Located<Token>>, SymbolTable, Diagnostics) {
        let mut table = SymbolTable::new();
        let mut diagnostics = Diagnostics::default();

        let (start, chars) = source::consume(input.as_bytes(), "<test>");
        let tokens = Lexer::new(start, chars, &mut table, &mut diagnostics).collect();

        (tokens, table, diagnostics)
    }

    fn texts(tokens: &[Located<Token>]) -> Vec<&str> {
        tokens.iter().map(|token| token.val().text()).collect()
    }

    #[test]
    fn declaration_and_assignment() {
        let (tokens, _, diagnostics) = lex("int a; a = 2 + 3;.");

        assert!(diagnostics.is_empty());
        assert_eq!(
            texts(&tokens),
            ["int", "a", ";", "a", "=", "2", "+", "3", ";", "."]
        );

        assert_eq!(*tokens[0].val(), Token::Reserved(Keyword::Int));
        assert_eq!(*tokens[4].val(), Token::Terminal(Terminal::Assign));
        assert_eq!(*tokens[9].val(), Token::End);
    }

    #[test]
    fn relational_operators_use_lookahead() {
        let (tokens, _, diagnostics) = lex("a<=b<>c>=d==e<f>g=h");

        assert!(diagnostics.is_empty());
        assert_eq!(
            texts(&tokens),
            ["a", "<=", "b", "<>", "c", ">=", "d", "==", "e", "<", "f", ">", "g", "=", "h"]
        );

        assert_eq!(*tokens[3].val(), Token::Comparison(Comparison::NotEqual));
        assert_eq!(*tokens[11].val(), Token::Comparison(Comparison::Greater));
    }

    #[test]
    fn numeric_literals() {
        let (tokens, _, diagnostics) = lex("12 3.25 4.5e10 6.0E-2 7e3");

        assert!(diagnostics.is_empty());
        assert_eq!(*tokens[0].val(), Token::Integer(Rc::from("12")));
        assert_eq!(*tokens[1].val(), Token::Double(Rc::from("3.25")));
        assert_eq!(*tokens[2].val(), Token::Double(Rc::from("4.5e10")));
        assert_eq!(*tokens[3].val(), Token::Double(Rc::from("6.0E-2")));
        assert_eq!(*tokens[4].val(), Token::Double(Rc::from("7e3")));
    }

    #[test]
    fn malformed_exponent_yields_error_token() {
        let (tokens, _, diagnostics) = lex("3.e");

        assert_eq!(texts(&tokens), ["3.e"]);
        assert_eq!(*tokens[0].val(), Token::Error(Rc::from("3.e")));
        assert_eq!(diagnostics.count(Category::Lexical), 1);
    }

    #[test]
    fn letters_after_digits_are_recovered() {
        let (tokens, _, diagnostics) = lex("x = 12ab3; y.");

        assert_eq!(texts(&tokens), ["x", "=", "12ab3", ";", "y", "."]);
        assert_eq!(*tokens[2].val(), Token::Error(Rc::from("12ab3")));
        assert_eq!(
            diagnostics.messages(Category::Lexical),
            ["Malformed numeric literal, unexpected 'a'"]
        );
    }

    #[test]
    fn bad_characters_do_not_stop_the_scan() {
        let (tokens, _, diagnostics) = lex("a = 1 # 2;\nb = $;.");

        assert_eq!(
            texts(&tokens),
            ["a", "=", "1", "#", "2", ";", "b", "=", "$", ";", "."]
        );

        assert_eq!(diagnostics.count(Category::Lexical), 2);

        let (_, error) = diagnostics.iter().nth(1).unwrap();
        assert_eq!(error.location().to_string(), "<test>:2:5");
    }

    #[test]
    fn exponent_without_digits() {
        let (tokens, _, diagnostics) = lex("3.e");

        assert!(matches!(tokens[0].val(), Token::Error(_)));
        assert_eq!(
            diagnostics.messages(Category::Lexical),
            ["Malformed numeric literal, exponent has no digits"]
        );

        let (_, _, diagnostics) = lex("x = 2e+;.");
        assert_eq!(
            diagnostics.messages(Category::Lexical),
            ["Malformed numeric literal, unexpected ';'"]
        );
    }

    #[test]
    fn integer_overflow_is_reported() {
        let (tokens, _, diagnostics) = lex("99999999999;.");

        assert!(matches!(tokens[0].val(), Token::Error(_)));
        assert_eq!(diagnostics.count(Category::Lexical), 1);
    }

    #[test]
    fn end_terminal_halts_the_scan() {
        let (tokens, _, _) = lex("a. b c");
        assert_eq!(texts(&tokens), ["a", "."]);
    }

    #[test]
    fn bare_point_after_integer_ends_the_program() {
        let (tokens, _, diagnostics) = lex("a = 10. b");

        assert!(diagnostics.is_empty());
        assert_eq!(texts(&tokens), ["a", "=", "10", "."]);
        assert_eq!(*tokens[2].val(), Token::Integer(Rc::from("10")));
        assert_eq!(*tokens[3].val(), Token::End);
    }

    #[test]
    fn identifiers_share_offsets() {
        let (tokens, _, _) = lex("foo bar foo if");

        let offsets: Vec<_> = tokens
            .iter()
            .filter_map(|token| token.val().id().map(Identifier::offset))
            .collect();

        assert_eq!(offsets, [KEYWORDS.len(), KEYWORDS.len() + 1, KEYWORDS.len()]);
        assert_eq!(*tokens[3].val(), Token::Reserved(Keyword::If));
        assert_eq!(Keyword::If.offset(), 0);
    }

    #[test]
    fn tokens_populate_the_symbol_table() {
        let (_, table, _) = lex("x = 2; y = 2.5; z = 2; if x <= y.");

        let global = table.global();
        let listing: Vec<_> = table.entries(global).iter().map(|entry| entry.to_string()).collect();

        assert!(listing.contains(&String::from("2, constant, integer, 2")));
        assert!(listing.contains(&String::from("2.5, constant, double, 2.5")));
        assert!(listing.contains(&String::from("=, operation, assignment")));
        assert!(listing.contains(&String::from("<=, operation, less-than equal")));
        assert!(listing.contains(&String::from("if, keyword")));
        assert!(listing.contains(&String::from(";, terminal")));

        let assignments = listing.iter().filter(|line| line.starts_with("=,")).count();
        assert_eq!(assignments, 1);
    }

    #[test]
    fn token_locations_span_their_text() {
        let (tokens, _, _) = lex("ab <= 10.");

        assert_eq!(tokens[0].location().to_string(), "<test>:[1:1-1:2]");
        assert_eq!(tokens[1].location().to_string(), "<test>:[1:4-1:5]");
        assert_eq!(tokens[2].location().to_string(), "<test>:[1:7-1:8]");
        assert_eq!(tokens[3].location().to_string(), "<test>:1:9");
    }
}
