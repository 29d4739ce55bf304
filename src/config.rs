// ABOUTME: Version constants, banner text and prompts for the CLI and REPL

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const WELCOME_MESSAGE: &str = "English v1.0";
pub const WELCOME_SUBTITLE: &str = "A programming language that reads like plain English";
pub const WELCOME_FOOTER: &str = "Type :help for commands, or :quit to leave.";

/// Prompt at the top level.
pub const PROMPT: &str = ">>> ";
/// Prompt while a multi-line construct is still open.
pub const PROMPT_CONTINUE: &str = "... ";

/// REPL history file, written next to wherever the binary is run.
pub const HISTORY_FILE: &str = ".english_history";

/// Conventional extension of source files.
pub const SOURCE_EXTENSION: &str = "abc";
/// Conventional extension of compiled bytecode files.
pub const BYTECODE_EXTENSION: &str = "101";

pub const HELP_TEXT: &str = "\
Commands:
  :help  :h  :?       Show this help message
  :vars  :v           List variables in the current session
  :funcs :f           List functions declared in the current session
  :history :hist      Show input history
  :clear :cls         Discard any partially entered statement
  :reset              Start over with a fresh environment
  :exit  :quit  :q    Leave the session

Statements end with a period. Blocks opened with 'do the following:' or
', then' are closed with 'thats it.'";
