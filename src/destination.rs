//! Choosing where a downloaded file is written.
//!
//! A download never overwrites an existing file. When the requested name is
//! taken, a [`ConflictPolicy`] supplies another one and the check repeats
//! until a free name is found.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Strategy for replacing a filename that already exists.
pub trait ConflictPolicy {
    /// Returns the next name to try after `taken` turned out to exist.
    fn next_name(&mut self, taken: &Path) -> io::Result<PathBuf>;
}

/// Which policy the command line asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OnConflict {
    /// Ask on the console for another name
    #[default]
    Prompt,
    /// Append " (n)" to the file stem
    Rename,
}

impl OnConflict {
    pub fn policy(self) -> Box<dyn ConflictPolicy + Send> {
        match self {
            OnConflict::Prompt => Box::new(Prompt::new(io::BufReader::new(io::stdin()), io::stdout())),
            OnConflict::Rename => Box::new(AutoRename::default()),
        }
    }
}

/// Interactive policy: asks the user for a new name.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConflictPolicy for Prompt<R, W> {
    fn next_name(&mut self, taken: &Path) -> io::Result<PathBuf> {
        writeln!(self.output, "ERROR file already exists")?;
        loop {
            write!(self.output, "Enter new file name with file extension: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("no replacement name given for {}", taken.display()),
                ));
            }
            let name = line.trim();
            if !name.is_empty() {
                return Ok(sibling(taken, name));
            }
        }
    }
}

/// Headless policy: `notes.txt` becomes `notes (1).txt`, `notes (2).txt`, ...
#[derive(Debug, Default)]
pub struct AutoRename {
    counter: u32,
}

impl ConflictPolicy for AutoRename {
    fn next_name(&mut self, taken: &Path) -> io::Result<PathBuf> {
        self.counter += 1;
        let original = strip_suffix(taken);
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match original.extension() {
            Some(ext) => format!("{} ({}).{}", stem, self.counter, ext.to_string_lossy()),
            None => format!("{} ({})", stem, self.counter),
        };
        Ok(sibling(taken, &name))
    }
}

/// Resolves `filename` inside `dir` to a path that does not exist yet.
pub fn resolve(dir: &Path, filename: &str, policy: &mut dyn ConflictPolicy) -> io::Result<PathBuf> {
    let mut candidate = dir.join(filename);
    while candidate.exists() {
        log::warn!("{} already exists", candidate.display());
        candidate = policy.next_name(&candidate)?;
    }
    Ok(candidate)
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

// "notes (2).txt" -> "notes.txt", so repeated renames don't nest.
fn strip_suffix(path: &Path) -> PathBuf {
    let stem = match path.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => return path.to_path_buf(),
    };
    let base = match stem.rfind(" (") {
        Some(idx)
            if stem.ends_with(')')
                && stem[idx + 2..stem.len() - 1].chars().all(|c| c.is_ascii_digit())
                && stem.len() > idx + 3 =>
        {
            &stem[..idx]
        }
        _ => return path.to_path_buf(),
    };
    match path.extension() {
        Some(ext) => sibling(path, &format!("{}.{}", base, ext.to_string_lossy())),
        None => sibling(path, base),
    }
}
