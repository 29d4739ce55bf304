// ABOUTME: End-to-end scenarios exercising the whole pipeline through a session

use english_lang::error::LangError;
use english_lang::session::{Execution, Reply, Session};

/// Feeds several lines and collects everything executions printed. Panics on
/// unexpected errors so scenario tests read as straight-line scripts.
fn run_lines(session: &mut Session, lines: &[&str]) -> String {
    let mut output = String::new();
    for line in lines {
        match session.feed(line) {
            Reply::Incomplete | Reply::Command(_) => {}
            Reply::Ran(Execution { output: o, error }) => {
                output.push_str(&o);
                if let Some(error) = error {
                    panic!("unexpected error on {:?}: {}", line, error);
                }
            }
            Reply::Exit => panic!("unexpected exit on {:?}", line),
        }
    }
    output
}

#[test]
fn scenario_declare_and_print() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &["Declare x to be 5.", "Print the value of x."],
    );
    assert_eq!(output, "5\n");
}

#[test]
fn scenario_function_declaration_and_call() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &[
            "Declare function add that takes a and b and does the following:",
            "    Return a + b.",
            "thats it.",
            "Set r to be the result of calling add with 3 and 7.",
            "Print the value of r.",
        ],
    );
    assert_eq!(output, "10\n");
}

#[test]
fn scenario_for_each_over_list() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &[
            "Declare numbers to be [10, 20, 30].",
            "for each n in numbers, do the following:",
            "    Print the value of n.",
            "thats it.",
        ],
    );
    assert_eq!(output, "10\n20\n30\n");
}

#[test]
fn scenario_constant_reassignment_fails() {
    let mut session = Session::new();
    run_lines(&mut session, &["Declare PI to always be 3.14."]);

    match session.feed("Set PI to be 3.0.") {
        Reply::Ran(Execution {
            error: Some(LangError::Runtime(err)),
            ..
        }) => {
            let message = format!("{}", err);
            assert!(message.starts_with("runtime error:"), "message: {}", message);
            assert!(message.contains("constant"), "message: {}", message);
        }
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[test]
fn scenario_while_loop_counts() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &[
            "Declare counter to be 0.",
            "repeat the following while counter is less than 3:",
            "    Print the value of counter.",
            "    Set counter to be counter + 1.",
            "thats it.",
        ],
    );
    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn scenario_recursive_factorial() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &[
            "Declare function factorial that takes n and does the following:",
            "    If n is less than or equal to 1, then",
            "    Return 1.",
            "    thats it.",
            "    Return n * the result of calling factorial with n - 1.",
            "thats it.",
            "Print the result of calling factorial with 5.",
        ],
    );
    assert_eq!(output, "120\n");
}

#[test]
fn property_round_trip_equals_reparse() {
    let source = "Declare xs to be [1, 2, 3].\n\
                  Declare function sum that takes list and does the following:\n\
                  Declare total to be 0.\n\
                  for each n in list, do the following:\n\
                  Set total to be total + n.\n\
                  thats it.\n\
                  Return total.\n\
                  thats it.\n\
                  Print the result of calling sum with xs.";
    let program = english_lang::parser::parse(source).unwrap();
    let decoded = english_lang::bytecode::decode(&english_lang::bytecode::encode(&program)).unwrap();
    assert_eq!(decoded, program);
}

#[test]
fn property_pipeline_is_deterministic() {
    let source = "Declare x to be 3.14.\nPrint x * 2 is greater than 6.";
    assert_eq!(
        english_lang::lexer::tokenize(source),
        english_lang::lexer::tokenize(source)
    );
    let a = english_lang::parser::parse(source).unwrap();
    let b = english_lang::parser::parse(source).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        english_lang::bytecode::encode(&a),
        english_lang::bytecode::encode(&b)
    );
}

#[test]
fn property_scope_containment() {
    let mut session = Session::new();
    run_lines(
        &mut session,
        &[
            "Declare function inner that does the following:",
            "    Declare secret to be 42.",
            "thats it.",
            "Call inner.",
        ],
    );

    match session.feed("Print secret.") {
        Reply::Ran(Execution {
            error: Some(LangError::Runtime(err)),
            ..
        }) => assert!(format!("{}", err).contains("undefined variable: secret")),
        other => panic!("expected an undefined-variable error, got {:?}", other),
    }
}

#[test]
fn property_index_bijection() {
    let mut session = Session::new();
    run_lines(&mut session, &["Declare xs to be [0, 0, 0, 0, 0]."]);
    for i in 1..=5 {
        let line = format!("Set xs at position {} to be {}.", i, i * 11);
        run_lines(&mut session, &[line.as_str()]);
    }
    for i in 1..=5 {
        let line = format!("Print the item at position {} in xs.", i);
        let output = run_lines(&mut session, &[line.as_str()]);
        assert_eq!(output, format!("{}\n", i * 11));
    }
}

#[test]
fn property_session_completeness() {
    let mut session = Session::new();

    // Not multi-line, no trailing period: nothing executes.
    assert_eq!(session.feed("Declare x to be"), Reply::Incomplete);
    // Trailing period completes it.
    assert!(matches!(session.feed("1."), Reply::Ran(_)));

    // Multi-line mode defers the period until nesting closes.
    assert_eq!(session.feed("If true, then"), Reply::Incomplete);
    assert_eq!(session.feed("Print 1."), Reply::Incomplete);
    assert!(matches!(session.feed("thats it."), Reply::Ran(_)));
}

#[test]
fn lists_print_recursively_formatted() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &["Print [1, [2.5, \"three\"], true, []]."],
    );
    assert_eq!(output, "[1, [2.5, three], true, []]\n");
}

#[test]
fn builtins_are_callable_from_surface_syntax() {
    let mut session = Session::new();
    let output = run_lines(
        &mut session,
        &[
            "Print the result of calling absolute with -3.",
            "Print the result of calling even with 4.",
            "Declare a to be 1.",
            "Declare b to be 2.",
            "Call swap with the location of a and the location of b.",
            "Print a.",
            "Print b.",
            "Call print with \"done\".",
        ],
    );
    assert_eq!(output, "3\ntrue\n2\n1\ndone\n");
}
