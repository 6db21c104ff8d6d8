use tacc::{
    error::Category,
    lex::Token,
    pipeline::{self, Compilation},
    symbols::{DataType, EntryKind},
};

fn compile(input: &str) -> Compilation {
    pipeline::compile(input.as_bytes(), "test.src")
}

fn texts(compilation: &Compilation) -> Vec<&str> {
    compilation.tokens().iter().map(|token| token.val().text()).collect()
}

fn tac_lines(compilation: &Compilation) -> Vec<String> {
    let tac = compilation.tac().expect("no code was generated");
    tac.to_string().lines().map(String::from).collect()
}

#[test]
fn assignment_of_sum() {
    let compilation = compile("int a; a = 2 + 3;.");

    assert_eq!(
        texts(&compilation),
        ["int", "a", ";", "a", "=", "2", "+", "3", ";", "."]
    );
    assert!(compilation.diagnostics().is_empty());
    assert!(compilation.succeeded());

    let lines = tac_lines(&compilation);
    let sum = lines.iter().position(|line| line == "t1 = 2 + 3").unwrap();
    assert_eq!(lines[sum + 1], "a = t1");
}

#[test]
fn assignment_type_mismatch_blocks_codegen() {
    let compilation = compile("int a; double b; a = b;.");
    let diagnostics = compilation.diagnostics();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics.messages(Category::Semantic),
        ["Assignment type mismatch: `a` is integer, value is double"]
    );
    assert!(compilation.tac().is_none());
    assert!(diagnostics.to_string().ends_with("Build failed with 1 error\n"));
}

#[test]
fn function_call_through_stack() {
    let compilation = compile("def int f(int x) return(x); fed f(1);.");
    assert!(compilation.succeeded(), "{}", compilation.diagnostics());

    let f = compilation.table().function("f").unwrap();
    assert_eq!(f.kind(), EntryKind::Function);
    assert_eq!(f.data_type(), Some(DataType::Integer));

    let lines = tac_lines(&compilation);
    let main = lines.iter().position(|line| line.starts_with("main:")).unwrap();
    let call = &lines[main..];

    let push = call.iter().position(|line| line == "push {1}").unwrap();
    assert_eq!(call[push + 1], "t1 = BL f");
    assert_eq!(call[push + 2], "pop {1}");

    assert!(lines.contains(&String::from("fp - 4 = x")));
    assert!(lines.contains(&String::from("B exitf")));
}

#[test]
fn malformed_exponent_reaches_parser() {
    let compilation = compile("3.e");
    let diagnostics = compilation.diagnostics();

    assert!(matches!(compilation.tokens()[0].val(), Token::Error(_)));
    assert_eq!(diagnostics.count(Category::Lexical), 1);
    assert!(diagnostics.count(Category::Parse) >= 1);
    assert!(compilation.tac().is_none());
}

#[test]
fn redeclaration_keeps_first_binding() {
    let compilation = compile("int a; double a; a = 1;.");

    assert_eq!(
        compilation.diagnostics().messages(Category::Semantic),
        ["`a` is already declared in this scope"]
    );

    let table = compilation.table();
    let a = table.lookup(table.global(), "a").unwrap();
    assert_eq!(a.data_type(), Some(DataType::Integer));
}

#[test]
fn nested_blocks_balance() {
    let compilation = compile(
        "def int fact(int n)
             int r;
             r = 1;
             while (n > 1) do
                 r = r * n;
                 n = n - 1
             od;
             return(r);
         fed
         int i;
         i = 0;
         while (i < 5) do
             if ((i == 2) or (i == 4)) then
                 print(fact(i))
             else
                 print(i)
             fi;
             i = i + 1
         od.",
    );

    assert!(compilation.succeeded(), "{}", compilation.diagnostics());

    let lines = tac_lines(&compilation);
    assert_eq!(lines[0], "B main");
    assert!(lines.iter().any(|line| line.starts_with("fact: ")));
    assert!(lines.contains(&String::from("exitfact:")));
    assert!(lines.contains(&String::from("print(i)")));
    assert_eq!(lines.last().map(String::as_str), Some("pop {PC}"));
}

#[test]
fn mixed_arithmetic_is_double() {
    let accepted = compile("int i; double d; d = i / 2 + 0.5;.");
    assert!(accepted.succeeded(), "{}", accepted.diagnostics());

    let rejected = compile("int i; double d; i = i / 2 + d;.");
    assert_eq!(rejected.diagnostics().count(Category::Semantic), 1);
}

#[test]
fn undefined_names_are_all_reported() {
    let compilation = compile("int a; a = b; print(c).");

    assert_eq!(
        compilation.diagnostics().messages(Category::Semantic),
        ["Variable `b` does not exist", "Variable `c` does not exist"]
    );
}

#[test]
fn statements_continue_across_newlines() {
    let continued_sum = compile("int a;\na = 1\n + 2;\nprint(a).");
    assert!(continued_sum.succeeded(), "{}", continued_sum.diagnostics());

    let lines = tac_lines(&continued_sum);
    let sum = lines.iter().position(|line| line == "t1 = 1 + 2").unwrap();
    assert_eq!(lines[sum + 1], "a = t1");

    let continued_assignment = compile("int a;\na\n = 1;\nprint(a).");
    assert!(continued_assignment.succeeded(), "{}", continued_assignment.diagnostics());
    assert!(tac_lines(&continued_assignment).contains(&String::from("a = 1")));
}
