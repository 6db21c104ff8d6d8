//! Compilador de un lenguaje imperativo pequeño a código de tres
//! direcciones.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente, leído por
//! medio de [`source`]. Este archivo se somete primero a análisis léxico
//! en [`lex`], de lo cual se obtiene un flujo de tokens y se pueblan las
//! constantes, operadores y palabras reservadas de la tabla de símbolos
//! en [`symbols`]. El flujo de tokens se verifica contra la gramática en
//! [`parse`], que además agrupa los tokens en líneas de sentencia
//! ([`lines`]) y registra funciones y variables en la tabla.
//!
//! # Análisis y generación
//! Las líneas de sentencia se recorren dos veces con la misma pila de
//! ámbitos ([`scope`]): primero en [`semantic`], que valida tipos y
//! nombres, y luego en [`tac`], que aplana expresiones, asigna espacio en
//! el frame y emite las instrucciones descritas en [`ir`]. Ambas fases
//! leen las condiciones de `if` y `while` por medio de [`condition`].
//!
//! Todas las fases reportan sus errores a un [`error::Sink`];
//! [`pipeline`] las ejecuta en orden y se detiene ante el primer
//! conjunto de errores.

pub mod condition;
pub mod error;
pub mod ir;
pub mod lex;
pub mod lines;
pub mod parse;
pub mod pipeline;
pub mod scope;
pub mod semantic;
pub mod source;
pub mod symbols;
pub mod tac;
