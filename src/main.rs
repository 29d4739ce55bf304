// ABOUTME: Command line entry point: run scripts, compile bytecode, or REPL

use clap::Parser;
use english_lang::bytecode;
use english_lang::config::{
    BYTECODE_EXTENSION, HISTORY_FILE, WELCOME_FOOTER, WELCOME_MESSAGE, WELCOME_SUBTITLE,
};
use english_lang::env::Environment;
use english_lang::eval::Interpreter;
use english_lang::parser;
use english_lang::session::{Reply, Session};
use log::{debug, LevelFilter};
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::path::{Path, PathBuf};

/// Interpreter for a programming language that reads like plain English
#[derive(Parser, Debug)]
#[command(name = "english")]
#[command(version = english_lang::config::VERSION)]
#[command(about = "Run English programs, compile them to bytecode, or start a REPL")]
struct CliArgs {
    /// Source (.abc) or bytecode (.101) file to run; omit to start the REPL
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Compile the source to bytecode at this path instead of running it
    #[arg(long = "emit-bytecode", value_name = "OUT")]
    emit_bytecode: Option<PathBuf>,

    /// Enable debug logging of the pipeline stages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()?;

    match args.script {
        Some(path) => run_file(&path, args.emit_bytecode.as_deref()),
        None => {
            if args.emit_bytecode.is_some() {
                return Err("--emit-bytecode needs a source file".into());
            }
            repl()
        }
    }
}

/// Loads a program from source or bytecode, then runs or compiles it.
fn run_file(path: &Path, emit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(path)?;
    debug!("loaded {} top-level statements", program.statements.len());

    if let Some(out_path) = emit {
        let image = bytecode::encode(&program);
        std::fs::write(out_path, &image)
            .map_err(|e| format!("cannot write {}: {}", out_path.display(), e))?;
        debug!("encoded {} bytes to {}", image.len(), out_path.display());
        return Ok(());
    }

    let env = Environment::new();
    let mut interpreter = Interpreter::to_stdout();
    interpreter.run(&program, &env)?;
    Ok(())
}

fn load_program(path: &Path) -> Result<english_lang::ast::Program, Box<dyn std::error::Error>> {
    let is_bytecode = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == BYTECODE_EXTENSION);

    if is_bytecode {
        let bytes =
            std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        return Ok(bytecode::decode(&bytes)?);
    }

    let bytes =
        std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    // A renamed bytecode image still gets recognized by its magic prefix.
    if bytes.starts_with(&bytecode::MAGIC) {
        return Ok(bytecode::decode(&bytes)?);
    }

    let source = String::from_utf8(bytes)
        .map_err(|_| format!("{} is not valid UTF-8", path.display()))?;
    debug!("lexing and parsing {}", path.display());
    Ok(parser::parse(&source)?)
}

/// Interactive loop: the session decides completeness and produces output,
/// rustyline supplies editing and persistent history.
fn repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new();

    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), rustyline::history::DefaultHistory> =
        Editor::with_config(config).map_err(|e| format!("failed to initialize REPL: {}", e))?;
    let _ = rl.load_history(HISTORY_FILE);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("{}", WELCOME_FOOTER);

    loop {
        match rl.readline(session.prompt()) {
            Ok(line) => match session.feed(&line) {
                Reply::Incomplete => {}
                Reply::Command(text) => println!("{}", text),
                Reply::Ran(execution) => {
                    print!("{}", execution.output);
                    if let Some(error) = execution.error {
                        eprintln!("{}", error);
                    }
                }
                Reply::Exit => {
                    println!("Goodbye!");
                    break;
                }
            },
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C drops any half-entered statement and keeps going.
                println!("^C");
                let _ = session.feed(":clear");
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    Ok(())
}
