//! Pila de ámbitos.
//!
//! Tanto el análisis semántico como la generación de código recorren
//! las líneas de sentencia manteniendo una pila de bloques activos. El
//! fondo de la pila siempre es [`ScopeKind::Global`]; `def`, `if` y
//! `while` apilan, y `fed`, `fi` y `od` desapilan. `else` reemplaza al
//! `if` activo en vez de anidarse.
//!
//! Cada marco tiene un identificador único por instancia de bloque, de
//! modo que dos funciones distintas pueden reutilizar nombres de
//! parámetros sin colisionar en [`Bindings`].
//!
//! [`Listing`] es el listado de símbolos que ambas fases producen: cada
//! nombre declarado aparece indentado según la profundidad de la pila.

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
};

use crate::symbols::{DataType, SymbolError};

/// Clase de bloque.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Function,
    If,
    Else,
    While,
}

impl Display for ScopeKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            ScopeKind::Global => "GLOBAL",
            ScopeKind::Function => "FUNCTION",
            ScopeKind::If => "IF",
            ScopeKind::Else => "ELSE",
            ScopeKind::While => "WHILE",
        };

        fmt.write_str(string)
    }
}

/// Una instancia de bloque en la pila.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    kind: ScopeKind,
    id: usize,
}

impl Frame {
    pub fn kind(self) -> ScopeKind {
        self.kind
    }

    pub fn id(self) -> usize {
        self.id
    }
}

/// Pila de bloques activos.
pub struct ScopeStack {
    frames: Vec<Frame>,
    next_id: usize,
}

impl Default for ScopeStack {
    fn default() -> Self {
        ScopeStack::new()
    }
}

impl ScopeStack {
    /// Crea una pila con únicamente el ámbito global.
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame {
                kind: ScopeKind::Global,
                id: 0,
            }],
            next_id: 1,
        }
    }

    /// Abre un bloque nuevo.
    pub fn push(&mut self, kind: ScopeKind) -> Frame {
        let frame = Frame {
            kind,
            id: self.next_id,
        };

        self.next_id += 1;
        self.frames.push(frame);
        frame
    }

    /// Cierra el bloque activo. El ámbito global nunca se desapila.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Reemplaza el `if` activo por su `else`.
    pub fn enter_else(&mut self) -> Option<Frame> {
        match self.top().kind {
            ScopeKind::If => {
                self.pop();
                Some(self.push(ScopeKind::Else))
            }

            _ => None,
        }
    }

    /// Bloque activo.
    pub fn top(&self) -> Frame {
        self.frames[self.frames.len() - 1]
    }

    /// Cantidad de bloques activos, incluyendo el global.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Función más interna que contiene al bloque activo.
    pub fn function(&self) -> Option<Frame> {
        self.iter().find(|frame| frame.kind == ScopeKind::Function)
    }

    /// Determina si el bloque activo está dentro de una función.
    pub fn in_function(&self) -> bool {
        self.function().is_some()
    }

    /// Recorre los bloques del más interno al global.
    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.iter().rev().copied()
    }
}

/// Asociaciones de nombres por instancia de bloque.
pub struct Bindings<T> {
    frames: HashMap<usize, HashMap<String, T>>,
}

impl<T> Default for Bindings<T> {
    fn default() -> Self {
        Bindings {
            frames: HashMap::new(),
        }
    }
}

impl<T> Bindings<T> {
    /// Declara un nombre en un bloque. Una redeclaración en el mismo
    /// bloque se rechaza y conserva la asociación original.
    pub fn declare(&mut self, frame: Frame, name: &str, value: T) -> Result<(), SymbolError> {
        let names = self.frames.entry(frame.id).or_default();
        if names.contains_key(name) {
            return Err(SymbolError::Redeclared(name.to_owned()));
        }

        names.insert(name.to_owned(), value);
        Ok(())
    }

    /// Resuelve un nombre desde el bloque activo hacia el global.
    pub fn resolve(&self, stack: &ScopeStack, name: &str) -> Option<(Frame, &T)> {
        stack.iter().find_map(|frame| {
            self.frames
                .get(&frame.id)
                .and_then(|names| names.get(name))
                .map(|value| (frame, value))
        })
    }
}

/// Listado de símbolos indentado por profundidad de ámbito.
///
/// La primera entrada de cada instancia de bloque va precedida de un
/// encabezado `<CLASE> SCOPE`.
#[derive(Default)]
pub struct Listing {
    text: String,
    announced: HashSet<usize>,
}

impl Listing {
    /// Registra un nombre en el bloque activo.
    pub fn record<T: Display>(&mut self, stack: &ScopeStack, name: &str, data_type: T) {
        let frame = stack.top();
        let depth = stack.depth();

        if self.announced.insert(frame.id) {
            let indent = "\t".repeat(depth - 1);
            self.text.push_str(&format!("{}{} SCOPE\n", indent, frame.kind));
        }

        let indent = "\t".repeat(depth);
        self.text
            .push_str(&format!("{}{}, {}, {}\n", indent, name, data_type, frame.kind));
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Display for Listing {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_frame_is_never_popped() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.pop(), None);

        stack.push(ScopeKind::Function);
        stack.push(ScopeKind::While);
        assert_eq!(stack.depth(), 3);
        assert!(stack.in_function());

        assert_eq!(stack.pop().map(Frame::kind), Some(ScopeKind::While));
        assert_eq!(stack.pop().map(Frame::kind), Some(ScopeKind::Function));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top().kind(), ScopeKind::Global);
    }

    #[test]
    fn else_replaces_if() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.enter_else(), None);

        let if_frame = stack.push(ScopeKind::If);
        let else_frame = stack.enter_else().unwrap();

        assert_eq!(stack.depth(), 2);
        assert_eq!(else_frame.kind(), ScopeKind::Else);
        assert_ne!(else_frame.id(), if_frame.id());
    }

    #[test]
    fn innermost_binding_wins() {
        let mut stack = ScopeStack::new();
        let mut bindings = Bindings::default();

        bindings.declare(stack.top(), "x", 1).unwrap();
        let function = stack.push(ScopeKind::Function);
        bindings.declare(function, "x", 2).unwrap();
        stack.push(ScopeKind::If);

        let (frame, value) = bindings.resolve(&stack, "x").unwrap();
        assert_eq!((frame, *value), (function, 2));

        stack.pop();
        stack.pop();
        assert_eq!(bindings.resolve(&stack, "x").map(|(_, value)| *value), Some(1));
    }

    #[test]
    fn redeclaration_keeps_original() {
        let stack = ScopeStack::new();
        let mut bindings = Bindings::default();

        bindings.declare(stack.top(), "a", "integer").unwrap();
        assert_eq!(
            bindings.declare(stack.top(), "a", "double"),
            Err(SymbolError::Redeclared("a".into()))
        );

        assert_eq!(bindings.resolve(&stack, "a").map(|(_, ty)| *ty), Some("integer"));
    }

    #[test]
    fn sibling_functions_reuse_names() {
        let mut stack = ScopeStack::new();
        let mut bindings = Bindings::default();

        let f = stack.push(ScopeKind::Function);
        bindings.declare(f, "x", ()).unwrap();
        stack.pop();

        let g = stack.push(ScopeKind::Function);
        assert!(bindings.declare(g, "x", ()).is_ok());
    }

    #[test]
    fn listing_indents_by_depth() {
        let mut stack = ScopeStack::new();
        let mut listing = Listing::default();

        listing.record(&stack, "f", DataType::Integer);
        stack.push(ScopeKind::Function);
        listing.record(&stack, "x", DataType::Integer);
        listing.record(&stack, "y", DataType::Double);
        stack.pop();
        listing.record(&stack, "a", DataType::Double);

        assert_eq!(
            listing.to_string(),
            "GLOBAL SCOPE\n\tf, integer, GLOBAL\n\tFUNCTION SCOPE\n\
             \t\tx, integer, FUNCTION\n\t\ty, double, FUNCTION\n\ta, double, GLOBAL\n"
        );
    }
}
