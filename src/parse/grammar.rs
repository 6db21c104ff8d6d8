//! Conjuntos FIRST y FOLLOW de la gramática.
//!
//! La gramática es LL(1). Cada no terminal tiene un conjunto FIRST que
//! determina cuál alternativa seleccionar a partir del lookahead, y un
//! conjunto FOLLOW que indica dónde reanudar el análisis tras un error.
//! Los identificadores y las constantes numéricas se tratan como las
//! metacategorías [`Symbol::Id`] y [`Symbol::Number`].

use std::fmt::{self, Display};

use crate::lex::Token;

/// Un símbolo terminal de la gramática, o épsilon.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Symbol {
    /// Palabra reservada, puntuación u operador, por su texto.
    Text(&'static str),

    /// Cualquier identificador.
    Id,

    /// Cualquier constante numérica.
    Number,

    /// Fin del programa.
    End,

    /// Producción vacía.
    Epsilon,
}

impl Symbol {
    /// Determina si un token pertenece a este símbolo.
    pub fn matches(self, token: &Token) -> bool {
        match (self, token) {
            (Symbol::Id, Token::Id(_)) => true,
            (Symbol::Number, Token::Integer(_) | Token::Double(_)) => true,
            (Symbol::End, Token::End) => true,
            (
                Symbol::Text(text),
                Token::Reserved(_) | Token::Terminal(_) | Token::Comparison(_),
            ) => token.text() == text,

            _ => false,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Text(text) => write!(fmt, "`{}`", text),
            Symbol::Id => fmt.write_str("identifier"),
            Symbol::Number => fmt.write_str("number"),
            Symbol::End => fmt.write_str("`.`"),
            Symbol::Epsilon => fmt.write_str("nothing"),
        }
    }
}

/// No terminales de la gramática.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Nonterminal {
    Program,
    FuncDecl,
    FuncDef,
    Params,
    ParamsRight,
    Declarations,
    Decl,
    Type,
    Varlist,
    VarlistRight,
    StatementSequence,
    StatementSequenceRight,
    Statement,
    OptionElse,
    Expr,
    TermRight,
    Term,
    FactorRight,
    Factor,
    FactorParen,
    ExpressionSequence,
    ExpressionSequenceRight,
    Var,
    VarRight,
    Comp,
    BranchExpression,
    BranchTermRight,
    BranchTerm,
    BranchFactorRight,
    BranchFactor,
    BranchFactorParen,
}

use Symbol::{End, Epsilon, Id, Number, Text};

const TYPES: &[Symbol] = &[Text("int"), Text("double")];

const STATEMENTS: &[Symbol] = &[
    Text("if"),
    Text("while"),
    Text("print"),
    Text("return"),
    Id,
    Epsilon,
];

const OPERANDS: &[Symbol] = &[Id, Number, Text("(")];

const COMPARISONS: &[Symbol] = &[
    Text("<"),
    Text(">"),
    Text("=="),
    Text("<="),
    Text(">="),
    Text("<>"),
];

const CONDITIONS: &[Symbol] = &[Text("("), Text("not")];

const SEQUENCE_END: &[Symbol] = &[End, Text("fed"), Text("fi"), Text("od"), Text("else")];

const STATEMENT_END: &[Symbol] = &[
    Text(";"),
    End,
    Text("fed"),
    Text("fi"),
    Text("od"),
    Text("else"),
];

const EXPR_END: &[Symbol] = &[
    Text(";"),
    End,
    Text("fed"),
    Text("fi"),
    Text("od"),
    Text("else"),
    Text(")"),
    Text("]"),
    Text(","),
    Text("<"),
    Text(">"),
    Text("=="),
    Text("<="),
    Text(">="),
    Text("<>"),
];

const TERM_END: &[Symbol] = &[
    Text(";"),
    End,
    Text("fed"),
    Text("fi"),
    Text("od"),
    Text("else"),
    Text(")"),
    Text("]"),
    Text(","),
    Text("<"),
    Text(">"),
    Text("=="),
    Text("<="),
    Text(">="),
    Text("<>"),
    Text("+"),
    Text("-"),
];

const FACTOR_END: &[Symbol] = &[
    Text(";"),
    End,
    Text("fed"),
    Text("fi"),
    Text("od"),
    Text("else"),
    Text(")"),
    Text("]"),
    Text(","),
    Text("<"),
    Text(">"),
    Text("=="),
    Text("<="),
    Text(">="),
    Text("<>"),
    Text("+"),
    Text("-"),
    Text("*"),
    Text("/"),
    Text("%"),
];

impl Nonterminal {
    /// Conjunto FIRST.
    pub fn first(self) -> &'static [Symbol] {
        use Nonterminal::*;

        match self {
            Program => &[
                Text("def"),
                Text("int"),
                Text("double"),
                Text("if"),
                Text("while"),
                Text("print"),
                Text("return"),
                Id,
                End,
            ],

            FuncDecl => &[Text("def"), Epsilon],
            FuncDef => &[Text("def")],
            Params => &[Text("int"), Text("double"), Epsilon],
            ParamsRight | VarlistRight | ExpressionSequenceRight => &[Text(","), Epsilon],
            Declarations => &[Text("int"), Text("double"), Epsilon],
            Decl | Type => TYPES,
            Varlist | Var => &[Id],
            StatementSequence | Statement => STATEMENTS,
            StatementSequenceRight => &[Text(";"), Epsilon],
            OptionElse => &[Text("else"), Epsilon],
            Expr | Term | Factor => OPERANDS,
            TermRight => &[Text("+"), Text("-"), Epsilon],
            FactorRight => &[Text("*"), Text("/"), Text("%"), Epsilon],
            FactorParen => &[Text("("), Epsilon],
            ExpressionSequence => &[Id, Number, Text("("), Epsilon],
            VarRight => &[Text("["), Epsilon],
            Comp => COMPARISONS,
            BranchExpression | BranchTerm | BranchFactor => CONDITIONS,
            BranchTermRight => &[Text("or"), Epsilon],
            BranchFactorRight => &[Text("and"), Epsilon],
            BranchFactorParen => &[Text("("), Text("not"), Id, Number],
        }
    }

    /// Conjunto FOLLOW.
    pub fn follow(self) -> &'static [Symbol] {
        use Nonterminal::*;

        match self {
            Program => &[],

            FuncDecl => &[
                Text("int"),
                Text("double"),
                Text("if"),
                Text("while"),
                Text("print"),
                Text("return"),
                Id,
                End,
            ],

            FuncDef => &[
                Text(";"),
                Text("def"),
                Text("int"),
                Text("double"),
                Text("if"),
                Text("while"),
                Text("print"),
                Text("return"),
                Id,
                End,
            ],

            Params | ParamsRight | ExpressionSequence | ExpressionSequenceRight => &[Text(")")],

            Declarations => &[
                Text("if"),
                Text("while"),
                Text("print"),
                Text("return"),
                Id,
                Text(";"),
                End,
                Text("fed"),
            ],

            Decl | Varlist | VarlistRight => &[Text(";")],
            Type => &[Id],
            StatementSequence => SEQUENCE_END,
            StatementSequenceRight | Statement => STATEMENT_END,
            OptionElse => &[Text("fi")],
            Expr | TermRight => EXPR_END,
            Term | FactorRight => TERM_END,
            Factor | FactorParen => FACTOR_END,
            Var | VarRight => &[Text(","), Text(";"), Text(")"), Text("=")],
            Comp => OPERANDS,
            BranchExpression | BranchFactorParen => &[Text("then"), Text("do"), Text(")")],
            BranchTerm | BranchTermRight => &[Text("or"), Text("then"), Text("do"), Text(")")],
            BranchFactor | BranchFactorRight => &[
                Text("and"),
                Text("or"),
                Text("then"),
                Text("do"),
                Text(")"),
            ],
        }
    }

    /// Determina si la regla admite la producción vacía.
    pub fn nullable(self) -> bool {
        self.first().contains(&Epsilon)
    }
}

impl Display for Nonterminal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Nonterminal::*;

        let string = match self {
            Program => "program",
            FuncDecl => "function declarations",
            FuncDef => "function definition",
            Params | ParamsRight => "parameters",
            Declarations | Decl => "declaration",
            Type => "type",
            Varlist | VarlistRight => "variable list",
            StatementSequence | StatementSequenceRight | Statement => "statement",
            OptionElse => "`else`",
            Expr | TermRight | Term | FactorRight | Factor => "expression",
            FactorParen | ExpressionSequence | ExpressionSequenceRight => "arguments",
            Var | VarRight => "variable",
            Comp => "comparison",
            BranchExpression | BranchTermRight | BranchTerm | BranchFactorRight | BranchFactor
            | BranchFactorParen => "condition",
        };

        fmt.write_str(string)
    }
}

/// Enumera símbolos esperados para un mensaje de error.
pub fn expected(symbols: &[Symbol]) -> String {
    let symbols: Vec<_> = symbols
        .iter()
        .filter(|&&symbol| symbol != Epsilon)
        .map(Symbol::to_string)
        .collect();

    match symbols.split_last() {
        None => String::from("nothing"),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::{Comparison, Keyword, Terminal};
    use std::rc::Rc;

    #[test]
    fn metacategories_match_token_kinds() {
        assert!(Symbol::Number.matches(&Token::Double(Rc::from("1.5"))));
        assert!(Symbol::Text("<>").matches(&Token::Comparison(Comparison::NotEqual)));
        assert!(Symbol::Text("fed").matches(&Token::Reserved(Keyword::Fed)));
        assert!(Symbol::Text(";").matches(&Token::Terminal(Terminal::Semicolon)));
        assert!(!Symbol::Text(";").matches(&Token::Error(Rc::from(";"))));
        assert!(!Symbol::Id.matches(&Token::End));
    }

    #[test]
    fn nullable_rules_list_epsilon() {
        assert!(Nonterminal::Statement.nullable());
        assert!(Nonterminal::TermRight.nullable());
        assert!(!Nonterminal::Expr.nullable());
        assert!(!Nonterminal::BranchFactor.nullable());
    }

    #[test]
    fn expected_symbols_read_naturally() {
        assert_eq!(expected(Nonterminal::Type.first()), "`int` or `double`");
        assert_eq!(expected(Nonterminal::Var.first()), "identifier");
        assert_eq!(
            expected(Nonterminal::Expr.first()),
            "identifier, number or `(`"
        );
    }
}
