// ABOUTME: Stateful line-accumulating driver behind the interactive REPL

use crate::config::{HELP_TEXT, PROMPT, PROMPT_CONTINUE};
use crate::env::Environment;
use crate::error::LangError;
use crate::eval::Interpreter;
use crate::parser::parse;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Result of executing an accumulated buffer: everything printed up to the
/// point of failure, plus the failure itself if there was one. The
/// environment keeps any side effects performed before an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub output: String,
    pub error: Option<LangError>,
}

/// What the session wants the caller to do with one fed line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Keep reading; the statement is not complete yet.
    Incomplete,
    /// The buffer was executed.
    Ran(Execution),
    /// A `:command` produced this text.
    Command(String),
    /// The user asked to leave. Distinct from any error.
    Exit,
}

/// Accumulates lines until a statement is complete, then runs the whole
/// buffer through lex, parse and eval against a shared environment.
/// Completeness is decided lexically, before parsing: `following:` and
/// `, then` open a nesting level, `thats it.` closes one, and outside
/// multi-line mode a trailing period executes immediately.
pub struct Session {
    buffer: Vec<String>,
    nesting: usize,
    multiline: bool,
    history: Vec<String>,
    env: Rc<Environment>,
    interpreter: Interpreter,
    capture: Rc<RefCell<Vec<u8>>>,
}

impl Session {
    pub fn new() -> Self {
        let capture: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        Session {
            buffer: Vec::new(),
            nesting: 0,
            multiline: false,
            history: Vec::new(),
            env: Environment::new(),
            interpreter: Interpreter::new(capture.clone()),
            capture,
        }
    }

    /// The prompt the REPL should show before the next line.
    pub fn prompt(&self) -> &'static str {
        if self.multiline {
            PROMPT_CONTINUE
        } else {
            PROMPT
        }
    }

    /// Feeds one line of input and classifies it.
    pub fn feed(&mut self, line: &str) -> Reply {
        let trimmed = line.trim();

        if trimmed.starts_with(':') {
            return self.command(trimmed);
        }

        if matches!(trimmed, "exit" | "quit" | "exit()" | "quit()") {
            return Reply::Exit;
        }

        self.buffer.push(line.to_string());
        self.history.push(trimmed.to_string());

        let lowered = trimmed.to_lowercase();
        let mut opened =
            lowered.matches("following:").count() + lowered.matches(", then").count();
        // Loop headers like `repeat the following while …:` carry the colon
        // at the end of the line rather than right after `following`.
        if opened == 0 && lowered.ends_with(':') {
            opened = 1;
        }
        if opened > 0 {
            self.nesting += opened;
            self.multiline = true;
        }

        let closed = lowered.matches("thats it.").count();
        if closed > 0 {
            self.nesting = self.nesting.saturating_sub(closed);
            if self.nesting == 0 {
                return Reply::Ran(self.execute());
            }
            return Reply::Incomplete;
        }

        if !self.multiline && trimmed.ends_with('.') {
            return Reply::Ran(self.execute());
        }

        Reply::Incomplete
    }

    /// Runs the accumulated buffer. The buffer and multi-line state are
    /// cleared no matter how execution goes.
    fn execute(&mut self) -> Execution {
        let code = self.buffer.join("\n");
        self.buffer.clear();
        self.multiline = false;
        self.nesting = 0;

        let error = match parse(&code) {
            Ok(program) => self
                .interpreter
                .run(&program, &self.env)
                .err()
                .map(LangError::from),
            Err(err) => Some(LangError::from(err)),
        };

        Execution {
            output: self.drain_output(),
            error,
        }
    }

    fn drain_output(&mut self) -> String {
        let bytes = std::mem::take(&mut *self.capture.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn command(&mut self, command: &str) -> Reply {
        match command {
            ":help" | ":h" | ":?" => Reply::Command(HELP_TEXT.to_string()),
            ":vars" | ":v" => Reply::Command(self.list_variables()),
            ":funcs" | ":f" => Reply::Command(self.list_functions()),
            ":history" | ":hist" => Reply::Command(self.list_history()),
            ":clear" | ":cls" => {
                self.buffer.clear();
                self.multiline = false;
                self.nesting = 0;
                Reply::Command("Cleared".to_string())
            }
            ":reset" => {
                self.env = Environment::new();
                self.buffer.clear();
                self.multiline = false;
                self.nesting = 0;
                Reply::Command("Reset".to_string())
            }
            ":exit" | ":quit" | ":q" => Reply::Exit,
            other => Reply::Command(format!("Unknown command: {} (try :help)", other)),
        }
    }

    fn list_variables(&self) -> String {
        let variables = self.env.variables();
        if variables.is_empty() {
            return "No variables".to_string();
        }
        variables
            .into_iter()
            .map(|(name, value, constant)| {
                if constant {
                    format!("{} = {} (constant)", name, value)
                } else {
                    format!("{} = {}", name, value)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn list_functions(&self) -> String {
        let functions = self.env.function_signatures();
        if functions.is_empty() {
            return "No functions".to_string();
        }
        functions
            .into_iter()
            .map(|(name, params)| format!("{}({})", name, params.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn list_history(&self) -> String {
        if self.history.is_empty() {
            return "No history".to_string();
        }
        self.history
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{:>3}  {}", i + 1, entry))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Read-only view of the session environment, for embedders.
    pub fn environment(&self) -> &Rc<Environment> {
        &self.env
    }

    /// Looks a variable up in the session environment.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.env.lookup(name)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds a line and expects it to have executed cleanly, returning the
    /// captured output.
    fn feed_ok(session: &mut Session, line: &str) -> String {
        match session.feed(line) {
            Reply::Ran(Execution {
                output,
                error: None,
            }) => output,
            other => panic!("expected clean execution of {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_single_line_executes_on_period() {
        let mut session = Session::new();
        assert_eq!(feed_ok(&mut session, "Declare x to be 5."), "");
        assert_eq!(feed_ok(&mut session, "Print the value of x."), "5\n");
    }

    #[test]
    fn test_incomplete_without_period() {
        let mut session = Session::new();
        assert_eq!(session.feed("Declare x to be"), Reply::Incomplete);
        // The next line completes the statement.
        assert_eq!(feed_ok(&mut session, "5."), "");
        assert_eq!(session.variable("x"), Some(Value::Number(5.0)));
    }

    #[test]
    fn test_multiline_function_definition() {
        let mut session = Session::new();
        assert_eq!(
            session.feed("Declare function add that takes a and b and does the following:"),
            Reply::Incomplete
        );
        assert_eq!(session.prompt(), PROMPT_CONTINUE);
        assert_eq!(session.feed("    Return a + b."), Reply::Incomplete);
        assert_eq!(feed_ok(&mut session, "thats it."), "");
        assert_eq!(session.prompt(), PROMPT);

        assert_eq!(
            feed_ok(&mut session, "Print the result of calling add with 3 and 7."),
            "10\n"
        );
    }

    #[test]
    fn test_nested_blocks_wait_for_every_thats_it() {
        let mut session = Session::new();
        session.feed("Declare go to be true.");
        assert_eq!(
            session.feed("repeat the following while go:"),
            Reply::Incomplete
        );
        // The loop header counts once; an inner if opens another level.
        assert_eq!(session.feed("If go, then"), Reply::Incomplete);
        assert_eq!(session.feed("Toggle go."), Reply::Incomplete);
        assert_eq!(session.feed("thats it."), Reply::Incomplete);
        assert!(matches!(session.feed("thats it."), Reply::Ran(_)));
    }

    #[test]
    fn test_one_liner_with_then_and_thats_it() {
        let mut session = Session::new();
        session.feed("Declare x to be 9.");
        let output = feed_ok(
            &mut session,
            "If x is greater than 5, then Print x. thats it.",
        );
        assert_eq!(output, "9\n");
    }

    #[test]
    fn test_for_each_over_list() {
        let mut session = Session::new();
        feed_ok(&mut session, "Declare numbers to be [10, 20, 30].");
        session.feed("for each n in numbers, do the following:");
        session.feed("    Print the value of n.");
        let output = feed_ok(&mut session, "thats it.");
        assert_eq!(output, "10\n20\n30\n");
    }

    #[test]
    fn test_error_keeps_session_usable() {
        let mut session = Session::new();
        feed_ok(&mut session, "Declare PI to always be 3.14.");

        match session.feed("Set PI to be 3.0.") {
            Reply::Ran(Execution {
                error: Some(LangError::Runtime(err)),
                ..
            }) => {
                assert!(format!("{}", err).contains("constant"));
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }

        // Still alive, state intact.
        assert_eq!(feed_ok(&mut session, "Print PI."), "3.14\n");
    }

    #[test]
    fn test_parse_error_clears_buffer() {
        let mut session = Session::new();
        match session.feed("Declare x be 5.") {
            Reply::Ran(Execution {
                error: Some(LangError::Parse(err)),
                ..
            }) => assert!(format!("{}", err).starts_with("parse error:")),
            other => panic!("expected a parse error, got {:?}", other),
        }
        // Buffer is clean; the next statement stands alone.
        assert_eq!(feed_ok(&mut session, "Declare x to be 1."), "");
    }

    #[test]
    fn test_output_captured_before_error_is_returned() {
        let mut session = Session::new();
        session.feed("repeat the following 3 times:");
        session.feed("Print 1.");
        match session.feed("thats it.") {
            Reply::Ran(execution) => {
                assert_eq!(execution.output, "1\n1\n1\n");
                assert!(execution.error.is_none());
            }
            other => panic!("expected execution, got {:?}", other),
        }

        match session.feed("Print 1. Print ghost.") {
            Reply::Ran(execution) => {
                assert_eq!(execution.output, "1\n");
                assert!(execution.error.is_some());
            }
            other => panic!("expected execution, got {:?}", other),
        }
    }

    #[test]
    fn test_exit_forms() {
        for form in ["exit", "quit", "exit()", "quit()", ":exit", ":quit", ":q"] {
            let mut session = Session::new();
            assert_eq!(session.feed(form), Reply::Exit, "form: {}", form);
        }
    }

    #[test]
    fn test_help_command() {
        let mut session = Session::new();
        match session.feed(":help") {
            Reply::Command(text) => assert!(text.contains(":vars")),
            other => panic!("expected command output, got {:?}", other),
        }
    }

    #[test]
    fn test_vars_command() {
        let mut session = Session::new();
        assert_eq!(session.feed(":vars"), Reply::Command("No variables".into()));

        feed_ok(&mut session, "Declare x to be 5.");
        feed_ok(&mut session, "Declare PI to always be 3.14.");
        assert_eq!(
            session.feed(":v"),
            Reply::Command("PI = 3.14 (constant)\nx = 5".into())
        );
    }

    #[test]
    fn test_funcs_command() {
        let mut session = Session::new();
        assert_eq!(session.feed(":funcs"), Reply::Command("No functions".into()));

        session.feed("Declare function add that takes a and b and does the following:");
        session.feed("Return a + b.");
        session.feed("thats it.");
        assert_eq!(session.feed(":f"), Reply::Command("add(a, b)".into()));
    }

    #[test]
    fn test_history_command() {
        let mut session = Session::new();
        assert_eq!(session.feed(":history"), Reply::Command("No history".into()));

        session.feed("Declare x to be 1.");
        match session.feed(":hist") {
            Reply::Command(text) => {
                assert!(text.contains("Declare x to be 1."));
                assert!(text.contains("  1  "));
            }
            other => panic!("expected command output, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_discards_partial_input() {
        let mut session = Session::new();
        session.feed("If true, then");
        assert_eq!(session.prompt(), PROMPT_CONTINUE);

        assert_eq!(session.feed(":clear"), Reply::Command("Cleared".into()));
        assert_eq!(session.prompt(), PROMPT);
        assert_eq!(feed_ok(&mut session, "Print 1."), "1\n");
    }

    #[test]
    fn test_reset_forgets_environment() {
        let mut session = Session::new();
        feed_ok(&mut session, "Declare x to be 5.");
        assert_eq!(session.feed(":reset"), Reply::Command("Reset".into()));
        assert_eq!(session.variable("x"), None);
    }

    #[test]
    fn test_commands_do_not_touch_the_buffer() {
        let mut session = Session::new();
        session.feed("If true, then");
        session.feed(":vars");
        session.feed("Print 7.");
        let output = feed_ok(&mut session, "thats it.");
        assert_eq!(output, "7\n");
    }

    #[test]
    fn test_unknown_command() {
        let mut session = Session::new();
        match session.feed(":bogus") {
            Reply::Command(text) => assert!(text.contains("Unknown command")),
            other => panic!("expected command output, got {:?}", other),
        }
    }
}
