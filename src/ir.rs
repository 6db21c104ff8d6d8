//! Código de tres direcciones.
//!
//! Cada instrucción tiene a lo sumo dos operandos fuente y un destino.
//! La forma textual de [`Instruction`] es el formato de salida del
//! compilador, por lo que su `Display` debe mantenerse estable.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use crate::lex::{Comparison, Terminal};

/// Programa completo: funciones en orden de definición y luego `main`,
/// que contiene el código global.
pub struct Program {
    pub functions: Vec<Function>,
    pub main: Function,
}

pub struct Function {
    pub name: String,
    pub bytes: u32,
    pub body: Vec<Instruction>,
    pub exit: Option<Label>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Label {
    Numbered(u32),
    Exit(String),
}

/// Temporal generado al aplanar expresiones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Temp(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Name(Rc<str>),
    Element(Rc<str>, Box<Operand>),
    Literal(Rc<str>),
    Temp(Temp),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    SetLabel(Label),
    Jump(Label),
    Branch(Comparison, Label),
    Compare(Operand, Operand),
    Push(Operand),
    Pop(Operand),
    Call {
        output: Temp,
        target: String,
    },
    Binary {
        output: Temp,
        lhs: Operand,
        op: Terminal,
        rhs: Operand,
    },
    Copy {
        target: Operand,
        value: Operand,
    },
    /// Ubicación de una variable relativa al frame pointer.
    Slot {
        name: Rc<str>,
        offset: u32,
    },
    /// Valor de retorno, bajo el frame pointer.
    Return {
        offset: u32,
        value: Operand,
    },
    Print(Operand),
}

/// Mnemónico del salto condicional que se toma si la comparación se cumple.
pub fn branch_mnemonic(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Less => "blt",
        Comparison::LessOrEqual => "ble",
        Comparison::Greater => "bgt",
        Comparison::GreaterOrEqual => "bge",
        Comparison::Equal => "beq",
        Comparison::NotEqual => "bne",
    }
}

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Numbered(number) => write!(fmt, "label{}", number),
            Label::Exit(function) => write!(fmt, "exit{}", function),
        }
    }
}

impl Display for Temp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "t{}", self.0)
    }
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(name) | Operand::Literal(name) => fmt.write_str(name),
            Operand::Element(name, index) => write!(fmt, "{}[{}]", name, index),
            Operand::Temp(temp) => write!(fmt, "{}", temp),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            SetLabel(label) => write!(fmt, "{}:", label),
            Jump(label) => write!(fmt, "B {}", label),
            Branch(comparison, label) => write!(fmt, "{} {}", branch_mnemonic(*comparison), label),
            Compare(lhs, rhs) => write!(fmt, "cmp {}, {}", lhs, rhs),
            Push(operand) => write!(fmt, "push {{{}}}", operand),
            Pop(operand) => write!(fmt, "pop {{{}}}", operand),
            Call { output, target } => write!(fmt, "{} = BL {}", output, target),

            Binary {
                output,
                lhs,
                op,
                rhs,
            } => write!(fmt, "{} = {} {} {}", output, lhs, op.text(), rhs),

            Copy { target, value } => write!(fmt, "{} = {}", target, value),
            Slot { name, offset } => write!(fmt, "{} = fp + {}", name, offset),
            Return { offset, value } => write!(fmt, "fp - {} = {}", offset, value),
            Print(operand) => write!(fmt, "print({})", operand),
        }
    }
}

impl Display for Function {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "{}: {}:", self.name, self.bytes)?;
        writeln!(fmt, "push {{LR}}")?;
        writeln!(fmt, "push {{FP}}")?;

        for instruction in &self.body {
            writeln!(fmt, "{}", instruction)?;
        }

        if let Some(exit) = &self.exit {
            writeln!(fmt, "{}:", exit)?;
        }

        writeln!(fmt, "pop {{FP}}")?;
        writeln!(fmt, "pop {{PC}}")
    }
}

impl Display for Program {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "B {}", self.main.name)?;

        for function in &self.functions {
            writeln!(fmt)?;
            write!(fmt, "{}", function)?;
        }

        writeln!(fmt)?;
        write!(fmt, "{}", self.main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_vocabulary() {
        let name = |name: &str| Operand::Name(Rc::from(name));
        let cases = [
            (Instruction::SetLabel(Label::Numbered(3)), "label3:"),
            (Instruction::Jump(Label::Exit("f".into())), "B exitf"),
            (Instruction::Branch(Comparison::GreaterOrEqual, Label::Numbered(1)), "bge label1"),
            (Instruction::Branch(Comparison::NotEqual, Label::Numbered(2)), "bne label2"),
            (Instruction::Compare(name("a"), Operand::Literal(Rc::from("10"))), "cmp a, 10"),
            (Instruction::Push(name("x")), "push {x}"),
            (Instruction::Pop(Operand::Temp(Temp(2))), "pop {t2}"),
            (
                Instruction::Call {
                    output: Temp(4),
                    target: "f".into(),
                },
                "t4 = BL f",
            ),
            (
                Instruction::Binary {
                    output: Temp(1),
                    lhs: name("a"),
                    op: Terminal::Percent,
                    rhs: Operand::Element(Rc::from("v"), Box::new(Operand::Temp(Temp(0)))),
                },
                "t1 = a % v[t0]",
            ),
            (
                Instruction::Slot {
                    name: Rc::from("x"),
                    offset: 12,
                },
                "x = fp + 12",
            ),
            (
                Instruction::Return {
                    offset: 8,
                    value: name("d"),
                },
                "fp - 8 = d",
            ),
            (Instruction::Print(name("a")), "print(a)"),
        ];

        for (instruction, text) in cases {
            assert_eq!(instruction.to_string(), text);
        }
    }

    #[test]
    fn program_layout() {
        let program = Program {
            functions: vec![Function {
                name: "f".into(),
                bytes: 0,
                body: vec![],
                exit: Some(Label::Exit("f".into())),
            }],
            main: Function {
                name: "main".into(),
                bytes: 4,
                body: vec![Instruction::Print(Operand::Literal(Rc::from("1")))],
                exit: None,
            },
        };

        let expected = "B main\n\n\
                        f: 0:\npush {LR}\npush {FP}\nexitf:\npop {FP}\npop {PC}\n\n\
                        main: 4:\npush {LR}\npush {FP}\nprint(1)\npop {FP}\npop {PC}\n";

        assert_eq!(program.to_string(), expected);
    }
}
