//! Orquestación de las fases.
//!
//! Cada fase consume por completo su entrada antes de que inicie la
//! siguiente. El análisis semántico solo corre si no hubo errores
//! léxicos ni sintácticos, y la generación de código solo si el análisis
//! semántico fue correcto.

use std::io::{self, BufRead, Write};

use bitflags::bitflags;

use crate::{
    error::{Category, Diagnostics, Sink},
    lex::{Lexer, Token},
    parse::{self, SyntaxNode},
    scope::Listing,
    semantic,
    source::{self, Located},
    symbols::SymbolTable,
    tac::{self, Tac},
};

bitflags! {
    /// Listados intermedios que se pueden solicitar además del código.
    pub struct Dump: u32 {
        /// Flujo de tokens, uno por línea con su ubicación.
        const TOKENS = 0x01;

        /// Árbol sintáctico.
        const TREE = 0x02;

        /// Tabla de símbolos y listado por ámbitos.
        const SYMBOLS = 0x04;
    }
}

/// Estado final de una compilación.
pub struct Compilation {
    diagnostics: Diagnostics,
    tokens: Vec<Located<Token>>,
    tree: SyntaxNode,
    table: SymbolTable,
    listing: Option<Listing>,
    tac: Option<Tac>,
}

impl Compilation {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn tokens(&self) -> &[Located<Token>] {
        &self.tokens
    }

    pub fn tree(&self) -> &SyntaxNode {
        &self.tree
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Código generado, si todas las fases fueron exitosas.
    pub fn tac(&self) -> Option<&Tac> {
        self.tac.as_ref()
    }

    pub fn succeeded(&self) -> bool {
        self.diagnostics.is_empty() && self.tac.is_some()
    }

    /// Escribe los listados solicitados.
    pub fn dump<W: Write>(&self, dump: Dump, output: &mut W) -> io::Result<()> {
        if dump.contains(Dump::TOKENS) {
            for token in &self.tokens {
                writeln!(output, "{}: {}", token.location(), token.val())?;
            }

            writeln!(output)?;
        }

        if dump.contains(Dump::TREE) {
            writeln!(output, "{}", self.tree)?;
        }

        if dump.contains(Dump::SYMBOLS) {
            write!(output, "{}", self.table)?;

            // El listado del generador incluye temporales
            let listing = match &self.tac {
                Some(tac) => Some(tac.listing()),
                None => self.listing.as_ref(),
            };

            if let Some(listing) = listing.filter(|listing| !listing.is_empty()) {
                writeln!(output, "{}", listing)?;
            }
        }

        Ok(())
    }
}

/// Compila un archivo de código fuente completo.
pub fn compile<R: BufRead>(reader: R, name: &str) -> Compilation {
    let mut table = SymbolTable::new();
    let mut diagnostics = Diagnostics::default();

    let (start, chars) = source::consume(reader, name);
    let tokens: Vec<_> = Lexer::new(start.clone(), chars, &mut table, &mut diagnostics).collect();

    let parsed = parse::parse(&start, &tokens, &mut table, &mut diagnostics);
    let front_end_ok = parsed.is_correct() && diagnostics.is_empty();

    let mut listing = None;
    let mut tac = None;

    if front_end_ok {
        let analysis = semantic::analyze(parsed.lines(), &table, &mut diagnostics);
        if analysis.is_correct() {
            match tac::generate(parsed.lines(), &table) {
                Ok(generated) => tac = Some(generated),
                Err(error) => {
                    let sink: &mut dyn Sink = &mut diagnostics;
                    sink.push(Category::Internal, error);
                }
            }
        }

        listing = Some(analysis.into_listing());
    }

    Compilation {
        diagnostics,
        tokens,
        tree: parsed.into_tree(),
        table,
        listing,
        tac,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_before_analysis_on_syntax_errors() {
        let compilation = compile("int a; a = ;.".as_bytes(), "<test>");

        assert!(!compilation.succeeded());
        assert!(compilation.tac().is_none());
        assert_eq!(compilation.diagnostics().count(Category::Parse), 1);
        assert_eq!(compilation.diagnostics().count(Category::Semantic), 0);
    }

    #[test]
    fn dumps_requested_listings() {
        let compilation = compile("int a; a = 1;.".as_bytes(), "<test>");
        assert!(compilation.succeeded());

        let mut output = Vec::new();
        compilation.dump(Dump::TOKENS | Dump::SYMBOLS, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("<test>:[1:1-1:3]: keyword `int`\n"));
        assert!(output.contains("GLOBAL\n--------------------------\n"));
        assert!(output.contains("GLOBAL SCOPE\n\ta, integer, GLOBAL\n"));
        assert!(!output.contains("program"));
    }

    #[test]
    fn symbol_dump_lists_function_bodies() {
        let compilation = compile("def int f(int x) return(x); fed f(1);.".as_bytes(), "<test>");
        assert!(compilation.succeeded());

        let mut output = Vec::new();
        compilation.dump(Dump::SYMBOLS, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains(
            "f\n--------------------------\nx, variable, integer\n\
             body:\nstatementSequence\n  return\n    x\n\n"
        ));
    }
}
