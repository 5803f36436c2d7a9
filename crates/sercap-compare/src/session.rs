use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::Path;

use thiserror::Error;

use crate::compare::{compare_files, Verdict};

/// Reserved input that ends the session without comparing.
pub const EXIT_SENTINEL: &str = "e";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Compared(Verdict),
    Exited,
}

/// Only a missing file at a prompt recovers (by re-prompting); everything
/// else is fatal.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("console: {0}")]
    Console(#[from] io::Error),

    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("comparing {first} and {second}: {source}")]
    Compare {
        first: String,
        second: String,
        #[source]
        source: io::Error,
    },
}

/// Runs the interactive comparison dialogue to completion.
///
/// Prompts for two file names, one at a time. A missing file repeats its
/// prompt; the exit sentinel at either prompt ends the session with no
/// comparison output. Once both names resolve, both files are read fully
/// and a single equality message is printed.
pub fn run_session<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<SessionOutcome, SessionError> {
    let first = match prompt_existing(input, output, "first file name: ")? {
        Some(name) => name,
        None => return Ok(SessionOutcome::Exited),
    };
    let second = match prompt_existing(input, output, "second file name: ")? {
        Some(name) => name,
        None => return Ok(SessionOutcome::Exited),
    };

    log::debug!("comparing {} against {}", first, second);
    let verdict = compare_files(Path::new(&first), Path::new(&second)).map_err(|source| {
        SessionError::Compare {
            first: first.clone(),
            second: second.clone(),
            source,
        }
    })?;

    match verdict {
        Verdict::Same => writeln!(output, "The files: {} & {} are the same", first, second)?,
        Verdict::Different => writeln!(output, "Not the same")?,
    }
    Ok(SessionOutcome::Compared(verdict))
}

/// Prompts until the given name opens, returning `None` on the exit
/// sentinel or end of input.
fn prompt_existing<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<Option<String>, SessionError> {
    loop {
        write!(output, "{prompt}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // End of input behaves like the exit sentinel.
            return Ok(None);
        }
        let name = line.trim_end_matches(['\r', '\n']);
        if name == EXIT_SENTINEL {
            return Ok(None);
        }

        match File::open(name) {
            Ok(_) => return Ok(Some(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                writeln!(output, "Wrong file or file path [{name}]")?;
            }
            Err(source) => {
                return Err(SessionError::Open {
                    path: name.to_string(),
                    source,
                });
            }
        }
    }
}
