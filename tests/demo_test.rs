// ABOUTME: The shipped demo programs parse, run and print what they promise

use english_lang::env::Environment;
use english_lang::eval::Interpreter;
use english_lang::parser;
use std::cell::RefCell;
use std::rc::Rc;

fn run(source: &str) -> String {
    let program = parser::parse(source).expect("demo should parse");
    let sink: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::new(sink.clone());
    let env = Environment::new();
    interpreter.run(&program, &env).expect("demo should run");
    let bytes = sink.borrow().clone();
    String::from_utf8(bytes).expect("output should be UTF-8")
}

#[test]
fn greeting_demo() {
    let output = run(include_str!("../demos/greeting.abc"));
    assert_eq!(output, "Hello, Ada!\nHello, Grace!\nHello, Alan!\n");
}

#[test]
fn countdown_demo() {
    let output = run(include_str!("../demos/countdown.abc"));
    assert_eq!(output, "5\n4\n3\n2\n1\nLift off!\n");
}
