//! Interactive REPL.
//!
//! Statements are typed and evaluated one at a time against a persistent
//! state: definitions, type definitions and trait implementations from
//! earlier lines stay visible. Errors abort only the current line; the
//! session continues.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use nooc_eval::Interpreter;
use nooc_sem::{infer_statement, prelude_state, rendered_type};
use nooc_util::Handler;

/// Run the interactive loop on stdin/stdout until EOF or `:quit`.
pub fn run_repl() -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("Noolang REPL - :quit to exit");

    let mut state = match prelude_state() {
        Ok(state) => state,
        Err(err) => {
            eprintln!("failed to load prelude: {}", err);
            return Ok(());
        }
    };
    let mut interp = Interpreter::new(&state);

    loop {
        print!("noo> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":q" {
            break;
        }

        eval_line(line, &mut state, &mut interp);
    }

    Ok(())
}

/// Type and evaluate one line; errors print and the session continues.
fn eval_line(
    line: &str,
    state: &mut nooc_sem::InferenceState,
    interp: &mut Interpreter,
) {
    let handler = Handler::new();
    let program = nooc_par::Parser::parse_source(line, &handler);
    if handler.has_errors() {
        for diag in handler.diagnostics() {
            eprintln!("{}", diag.render());
        }
        return;
    }

    for stmt in &program {
        // Snapshot so a failing statement leaves the session state intact.
        let snapshot = state.clone();
        match infer_statement(state, stmt) {
            Ok(typed) => {
                interp.update_from(state);
                match interp.eval_statement(&typed) {
                    Ok(value) => {
                        println!("{} : {}", value.display(), rendered_type(state, &typed));
                    }
                    Err(err) => {
                        eprintln!("runtime error: {}", err);
                        *state = snapshot;
                        return;
                    }
                }
            }
            Err(err) => {
                eprintln!("{}", err.to_diagnostic().render());
                *state = snapshot;
                return;
            }
        }
    }
}
