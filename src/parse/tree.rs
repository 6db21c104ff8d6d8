//! Árbol sintáctico.
//!
//! El árbol se construye únicamente con fines de diagnóstico: ninguna
//! fase posterior lo consume.

use std::fmt::{self, Display};

/// Un nodo del árbol sintáctico.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyntaxNode {
    /// Hoja con un valor textual.
    Leaf(String),

    /// Operador o construcción con hijos ordenados.
    Prop(String, Vec<SyntaxNode>),
}

impl SyntaxNode {
    pub fn leaf<S: Into<String>>(value: S) -> Self {
        SyntaxNode::Leaf(value.into())
    }

    pub fn prop<S: Into<String>>(operator: S, children: Vec<SyntaxNode>) -> Self {
        SyntaxNode::Prop(operator.into(), children)
    }

    /// Texto del nodo sin sus hijos.
    pub fn value(&self) -> &str {
        match self {
            SyntaxNode::Leaf(value) | SyntaxNode::Prop(value, _) => value,
        }
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::Leaf(_) => &[],
            SyntaxNode::Prop(_, children) => children,
        }
    }

    fn render(&self, fmt: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(fmt, "{:indent$}{}", "", self.value(), indent = 2 * depth)?;
        for child in self.children() {
            child.render(fmt, depth + 1)?;
        }

        Ok(())
    }
}

/// Un nodo por línea, indentado según su profundidad.
impl Display for SyntaxNode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(fmt, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_indented_by_depth() {
        let tree = SyntaxNode::prop(
            "=",
            vec![
                SyntaxNode::leaf("a"),
                SyntaxNode::prop("+", vec![SyntaxNode::leaf("2"), SyntaxNode::leaf("3")]),
            ],
        );

        assert_eq!(tree.to_string(), "=\n  a\n  +\n    2\n    3\n");
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[1].value(), "+");
    }
}
