//! Recolección y presentación de diagnósticos.
//!
//! Ninguna fase escribe errores por su cuenta. Todas reportan a un
//! [`Sink`] inyectado, etiquetando cada error con su [`Category`]. La
//! implementación usual es [`Diagnostics`], que acumula los reportes y
//! los presenta junto a la línea de código fuente que los originó.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error con ubicación, de cualquiera de las fases.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Fase que originó un diagnóstico.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    Lexical,
    Parse,
    Semantic,
    Internal,
}

impl Display for Category {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Category::Lexical => "Lexical error",
            Category::Parse => "Syntax error",
            Category::Semantic => "Semantic error",
            Category::Internal => "Internal compiler error",
        };

        fmt.write_str(string)
    }
}

/// Colaborador que recibe los diagnósticos de las fases.
pub trait Sink {
    fn report(&mut self, category: Category, error: Box<dyn LocatedError>);
}

impl<'a> dyn Sink + 'a {
    /// Reporta un error ubicado.
    pub fn push<E: 'static + Error>(&mut self, category: Category, error: Located<E>) {
        self.report(category, Box::new(error));
    }
}

/// Acumulador de diagnósticos.
#[derive(Default)]
pub struct Diagnostics {
    errors: Vec<(Category, Box<dyn LocatedError>)>,
}

impl Diagnostics {
    /// Determina si no se ha reportado nada.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Cantidad total de errores reportados.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Cantidad de errores de una categoría.
    pub fn count(&self, category: Category) -> usize {
        self.iter().filter(|(of, _)| *of == category).count()
    }

    /// Itera sobre los reportes en orden de llegada.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &dyn LocatedError)> {
        self.errors
            .iter()
            .map(|(category, error)| (*category, error.as_ref()))
    }

    /// Mensajes de una categoría, sin ubicación.
    pub fn messages(&self, category: Category) -> Vec<String> {
        self.iter()
            .filter(|(of, _)| *of == category)
            .map(|(_, error)| error.source().to_string())
            .collect()
    }
}

impl Sink for Diagnostics {
    fn report(&mut self, category: Category, error: Box<dyn LocatedError>) {
        self.errors.push((category, error));
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for (kind, error) in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            //FIXME: Demasiado indecente
            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            let line_number = location.start().line();
            location.source().with_line(line_number, |line| {
                writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
            })?;

            let from = location.start().column();
            let to = if location.end().line() == line_number {
                location.end().column().saturating_sub(1).max(from)
            } else {
                from
            };

            let skip = (from - 1) as usize;
            let highlight = (to - from + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("something went wrong")]
    struct Oops;

    #[test]
    fn renders_source_line_with_highlight() {
        let (start, chars) = source::consume("int a;\n".as_bytes(), "demo.cp");
        chars.for_each(drop);

        let mut diagnostics = Diagnostics::default();
        let sink: &mut dyn Sink = &mut diagnostics;
        sink.push(Category::Semantic, Located::at(Oops, start));

        let rendered = diagnostics.to_string();
        assert!(rendered.starts_with("Semantic error: something went wrong\n --> demo.cp:1:1\n"));
        assert!(rendered.contains("1 | int a;"));
        assert!(rendered.contains("  | ^"));
        assert!(rendered.ends_with("Build failed with 1 error\n"));
    }

    #[test]
    fn counts_by_category() {
        let (start, _) = source::consume("".as_bytes(), "<empty>");

        let mut diagnostics = Diagnostics::default();
        let sink: &mut dyn Sink = &mut diagnostics;
        sink.push(Category::Lexical, Located::at(Oops, start.clone()));
        sink.push(Category::Parse, Located::at(Oops, start));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.count(Category::Lexical), 1);
        assert_eq!(diagnostics.count(Category::Semantic), 0);
        assert_eq!(diagnostics.messages(Category::Parse), ["something went wrong"]);
    }
}
