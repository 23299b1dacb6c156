//! Terminal conflict prompt.

use std::io::{BufRead, Write};

use async_trait::async_trait;

use trellis_core::conflict::{ConflictChoice, ConflictPrompter};

/// Asks on stderr and reads the answer from stdin.
pub struct StdinPrompter;

#[async_trait]
impl ConflictPrompter for StdinPrompter {
    async fn choose(&self, path: &str) -> Option<ConflictChoice> {
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            ask(&mut stdin.lock(), &mut std::io::stderr(), &path)
        })
        .await
        .ok()
        .flatten()
    }
}

/// Map one line of input to a choice.
pub fn parse_choice(line: &str) -> Option<ConflictChoice> {
    match line.trim().to_ascii_lowercase().as_str() {
        "o" | "overwrite" => Some(ConflictChoice::Overwrite),
        "a" | "all" | "overwrite all" => Some(ConflictChoice::OverwriteAll),
        "s" | "skip" => Some(ConflictChoice::Skip),
        "k" | "skip all" => Some(ConflictChoice::SkipAll),
        "c" | "cancel" => Some(ConflictChoice::Cancel),
        _ => None,
    }
}

/// Re-ask until the answer parses. End of input means no answer.
fn ask(input: &mut impl BufRead, out: &mut impl Write, path: &str) -> Option<ConflictChoice> {
    loop {
        let _ = write!(
            out,
            "{path} already exists. [o]verwrite, overwrite [a]ll, [s]kip, s[k]ip all, [c]ancel? "
        );
        let _ = out.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        if let Some(choice) = parse_choice(&line) {
            return Some(choice);
        }
        let _ = writeln!(out, "unrecognized answer {:?}", line.trim());
    }
}
