//! Tabla de símbolos.
//!
//! La tabla es un árbol de ámbitos: la raíz corresponde al ámbito
//! global y cada función definida cuelga como un hijo. Todos los nodos
//! viven en un único arreglo y se relacionan por índices ([`ScopeId`]),
//! por lo cual no existen referencias colgantes entre padres e hijos.
//!
//! El lexer y el parser agregan entradas; las fases posteriores solo
//! la consultan.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use thiserror::Error;

/// Nombre del nodo raíz.
pub const GLOBAL: &str = "GLOBAL";

/// Índice de un nodo (ámbito) de la tabla.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Tipos de dato del lenguaje.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Double,
}

impl DataType {
    /// Bytes que ocupa un valor de este tipo en el stack frame.
    pub fn size(self) -> u32 {
        match self {
            DataType::Integer => 4,
            DataType::Double => 8,
        }
    }

    /// Tipo resultante de operar aritméticamente dos valores.
    ///
    /// Basta un operando `double` para promover el resultado.
    pub fn widen(self, other: DataType) -> DataType {
        match (self, other) {
            (DataType::Integer, DataType::Integer) => DataType::Integer,
            _ => DataType::Double,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => fmt.write_str("integer"),
            DataType::Double => fmt.write_str("double"),
        }
    }
}

/// Categoría de una entrada.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Variable,
    Function,
    Constant,
    Keyword,
    Operation,
    Terminal,
}

impl Display for EntryKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            EntryKind::Variable => "variable",
            EntryKind::Function => "function",
            EntryKind::Constant => "constant",
            EntryKind::Keyword => "keyword",
            EntryKind::Operation => "operation",
            EntryKind::Terminal => "terminal",
        };

        fmt.write_str(string)
    }
}

/// Valor o texto asociado a una entrada.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Empty,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Display for Payload {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => Ok(()),
            Payload::Integer(integer) => write!(fmt, "{}", integer),
            Payload::Double(double) => write!(fmt, "{:?}", double),
            Payload::Text(text) => fmt.write_str(text),
        }
    }
}

/// Una entrada de la tabla.
#[derive(Clone, Debug)]
pub struct Entry {
    name: Rc<str>,
    kind: EntryKind,
    data_type: Option<DataType>,
    payload: Payload,
    scope: ScopeId,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Ámbito dueño de la entrada.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

impl Display for Entry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}, {}", self.name, self.kind)?;

        if let Some(data_type) = self.data_type {
            write!(fmt, ", {}", data_type)?;
        }

        match &self.payload {
            Payload::Empty => Ok(()),
            // El cuerpo de una función se lista bajo su propio ámbito
            Payload::Text(_) if self.kind == EntryKind::Function => Ok(()),
            payload => write!(fmt, ", {}", payload),
        }
    }
}

/// Error de inserción.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SymbolError {
    #[error("`{0}` is already declared in this scope")]
    Redeclared(String),
}

struct Node {
    name: Rc<str>,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    entries: Vec<Entry>,
}

/// Árbol de ámbitos con sus entradas.
pub struct SymbolTable {
    nodes: Vec<Node>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    /// Crea una tabla con únicamente el ámbito global.
    pub fn new() -> Self {
        SymbolTable {
            nodes: vec![Node {
                name: Rc::from(GLOBAL),
                parent: None,
                children: Vec::new(),
                entries: Vec::new(),
            }],
        }
    }

    /// Ámbito raíz.
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Nombre de un ámbito.
    pub fn name(&self, scope: ScopeId) -> &str {
        &self.nodes[scope.0].name
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.nodes[scope.0].parent
    }

    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.nodes[scope.0].children
    }

    pub fn entries(&self, scope: ScopeId) -> &[Entry] {
        &self.nodes[scope.0].entries
    }

    /// Agrega una entrada a un ámbito.
    ///
    /// Variables y funciones son únicas por ámbito: una segunda
    /// declaración se rechaza y la original se conserva. Las demás
    /// categorías se deduplican en silencio.
    pub fn insert(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: EntryKind,
        data_type: Option<DataType>,
        payload: Payload,
    ) -> Result<(), SymbolError> {
        let node = &mut self.nodes[scope.0];
        let existing = node
            .entries
            .iter()
            .find(|entry| &*entry.name == name && entry.kind == kind);

        match (existing, kind) {
            (Some(_), EntryKind::Variable | EntryKind::Function) => {
                return Err(SymbolError::Redeclared(name.to_owned()))
            }

            (Some(entry), _) if entry.data_type == data_type && entry.payload == payload => {
                return Ok(())
            }

            _ => (),
        }

        node.entries.push(Entry {
            name: Rc::from(name),
            kind,
            data_type,
            payload,
            scope,
        });

        Ok(())
    }

    /// Define una función en el ámbito global y crea su ámbito hijo.
    pub fn define_function(
        &mut self,
        name: &str,
        return_type: DataType,
    ) -> Result<ScopeId, SymbolError> {
        let global = self.global();
        self.insert(
            global,
            name,
            EntryKind::Function,
            Some(return_type),
            Payload::Empty,
        )?;

        let child = ScopeId(self.nodes.len());
        self.nodes.push(Node {
            name: Rc::from(name),
            parent: Some(global),
            children: Vec::new(),
            entries: Vec::new(),
        });

        self.nodes[global.0].children.push(child);
        Ok(child)
    }

    /// Ámbito hijo que corresponde a una función.
    pub fn function_scope(&self, name: &str) -> Option<ScopeId> {
        let global = self.global();
        self.children(global)
            .iter()
            .copied()
            .find(|&child| self.name(child) == name)
    }

    /// Entrada de una función definida.
    pub fn function(&self, name: &str) -> Option<&Entry> {
        self.entries(self.global())
            .iter()
            .find(|entry| entry.kind == EntryKind::Function && &*entry.name == name)
    }

    /// Busca un nombre a partir de un ámbito.
    ///
    /// El orden es: el propio ámbito, luego sus ancestros del más
    /// cercano al más lejano, y por último los hijos directos de
    /// `scope`. Solo se consideran variables y funciones.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Entry> {
        let find = |scope: ScopeId| {
            self.entries(scope).iter().find(|entry| {
                &*entry.name == name
                    && matches!(entry.kind, EntryKind::Variable | EntryKind::Function)
            })
        };

        let mut current = Some(scope);
        while let Some(at) = current {
            if let Some(entry) = find(at) {
                return Some(entry);
            }

            current = self.parent(at);
        }

        self.children(scope).iter().find_map(|&child| find(child))
    }

    /// Reemplaza el payload de una entrada existente.
    pub fn set_payload(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: EntryKind,
        payload: Payload,
    ) -> bool {
        let entry = self.nodes[scope.0]
            .entries
            .iter_mut()
            .find(|entry| &*entry.name == name && entry.kind == kind);

        match entry {
            Some(entry) => {
                entry.payload = payload;
                true
            }

            None => false,
        }
    }
}

/// Listado de la tabla: un bloque por ámbito, con las entradas
/// deduplicadas y ordenadas.
impl Display for SymbolTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![self.global()];
        while let Some(scope) = pending.pop() {
            writeln!(fmt, "{}", self.name(scope))?;
            writeln!(fmt, "--------------------------")?;

            let mut lines: Vec<_> = self.entries(scope).iter().map(Entry::to_string).collect();
            lines.sort();
            lines.dedup();

            for line in lines {
                writeln!(fmt, "{}", line)?;
            }

            if scope != self.global() {
                if let Some(Payload::Text(body)) = self.function(self.name(scope)).map(Entry::payload) {
                    writeln!(fmt, "body:")?;
                    writeln!(fmt, "{}", body.trim_end())?;
                }
            }

            writeln!(fmt)?;
            pending.extend(self.children(scope).iter().rev());
        }

        Ok(())
    }
}
