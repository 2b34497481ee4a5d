//! vtfs REPL: an interactive shell over an in-memory store.
//!
//! The shell plays the part of a host: it resolves slash-separated paths one
//! component at a time with `lookup`, materializes handles around reads and
//! writes, and reports core errors with their errno.
//!
//! - File commands: `touch`, `write`, `append`, `cat`, `truncate`, `ln`, `rm`
//! - Directory commands: `mkdir`, `rmdir`, `ls`, `cd`, `pwd`
//! - Inspection: `stat`, `df`
//! - Meta-commands: `/help`, `/quit`

pub mod paths;

use anyhow::{anyhow, bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use vtfs_core::{EntryId, EntryKind, FileMode, FsError, OpenFlags, Store, StoreConfig};

const DIR_MODE: FileMode = FileMode::new(0o755);
const FILE_MODE: FileMode = FileMode::new(0o644);

/// REPL state: the mounted store and the working directory.
pub struct Repl {
    store: Store,
    cwd: EntryId,
    quit: bool,
}

impl Repl {
    /// Create a REPL over a freshly mounted store.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let store = Store::mount(config).context("mounting store")?;
        let cwd = store.root();
        Ok(Self {
            store,
            cwd,
            quit: false,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Whether `/quit` was entered.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Unmount the store, returning how many entries were freed.
    pub fn shutdown(self) -> usize {
        self.store.unmount()
    }

    /// Process a single line of input.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        if trimmed.starts_with('/') {
            return self.handle_meta_command(trimmed);
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (command, rest) = split_word(trimmed);
        match command {
            "mkdir" => {
                let path = one_arg(command, rest)?;
                let (parent, name) = self.resolve_parent(path)?;
                self.store
                    .make_directory(parent, name, DIR_MODE)
                    .map_err(|e| fs_error(e, command, path))?;
                Ok(None)
            }
            "touch" => {
                let path = one_arg(command, rest)?;
                self.ensure_file(path, command)?;
                Ok(None)
            }
            "write" | "append" => {
                let (path, text) = split_word(rest);
                if path.is_empty() {
                    bail!("usage: {command} <path> <text>");
                }
                let id = self.ensure_file(path, command)?;
                let flags = if command == "write" {
                    OpenFlags::truncate()
                } else {
                    OpenFlags::append()
                };
                let n = self
                    .write_file(id, flags, text.as_bytes())
                    .map_err(|e| fs_error(e, command, path))?;
                Ok(Some(format!("{n} bytes")))
            }
            "cat" => {
                let path = one_arg(command, rest)?;
                let id = self.resolve(path)?;
                let data = self.read_file(id).map_err(|e| fs_error(e, command, path))?;
                Ok(Some(String::from_utf8_lossy(&data).into_owned()))
            }
            "truncate" => {
                let path = one_arg(command, rest)?;
                let id = self.resolve(path)?;
                self.store.truncate(id).map_err(|e| fs_error(e, command, path))?;
                Ok(None)
            }
            "ln" => {
                let (src, dst) = two_args(command, rest)?;
                let target = self.resolve(src)?;
                let (parent, name) = self.resolve_parent(dst)?;
                self.store
                    .link(target, parent, name)
                    .map_err(|e| fs_error(e, command, dst))?;
                Ok(None)
            }
            "rm" => {
                let path = one_arg(command, rest)?;
                let (parent, name) = self.resolve_parent(path)?;
                let id = self.lookup(parent, name, path)?;
                self.store
                    .remove_file(parent, id)
                    .map_err(|e| fs_error(e, command, path))?;
                Ok(None)
            }
            "rmdir" => {
                let path = one_arg(command, rest)?;
                let (parent, name) = self.resolve_parent(path)?;
                let id = self.lookup(parent, name, path)?;
                if id == self.cwd {
                    bail!("rmdir {path}: cannot remove the working directory");
                }
                self.store
                    .remove_directory(parent, id)
                    .map_err(|e| fs_error(e, command, path))?;
                Ok(None)
            }
            "ls" => {
                let path = if rest.is_empty() { "." } else { rest };
                let dir = self.resolve(path)?;
                let entries = self.store.list(dir).map_err(|e| fs_error(e, command, path))?;
                let lines: Vec<String> = entries
                    .iter()
                    .map(|e| {
                        let tag = match e.kind {
                            EntryKind::Directory => "d",
                            EntryKind::File => "-",
                        };
                        format!("{tag} {:>6} {}", e.ino.0, e.name)
                    })
                    .collect();
                Ok(Some(lines.join("\n")))
            }
            "stat" => {
                let path = one_arg(command, rest)?;
                let id = self.resolve(path)?;
                let attr = self.store.getattr(id).map_err(|e| fs_error(e, command, path))?;
                let link = if self.store.is_hardlink(id)? { " (hardlink)" } else { "" };
                Ok(Some(format!(
                    "  File: {path}{link}\n  Size: {}  Blocks: {}  Links: {}\n Inode: {}  Mode: {} ({:04o})",
                    attr.size,
                    attr.blocks,
                    attr.nlink,
                    attr.ino,
                    attr.mode,
                    attr.mode.permissions(),
                )))
            }
            "df" => {
                let stat = self.store.statfs();
                Ok(Some(format!(
                    "magic={:#x} block_size={} name_max={} entries={} allocated={}",
                    stat.magic, stat.block_size, stat.name_max, stat.entries, stat.bytes_allocated
                )))
            }
            "cd" => {
                let path = if rest.is_empty() { "/" } else { rest };
                let id = self.resolve(path)?;
                if self.store.kind(id)? != EntryKind::Directory {
                    return Err(fs_error(FsError::NotADirectory, command, path));
                }
                self.cwd = id;
                Ok(None)
            }
            "pwd" => Ok(Some(self.pwd()?)),
            _ => Ok(Some(format!(
                "Unknown command: {command}\nType /help for available commands."
            ))),
        }
    }

    /// Handle a meta-command (starts with /).
    fn handle_meta_command(&mut self, cmd: &str) -> Result<Option<String>> {
        let command = cmd.split_whitespace().next().unwrap_or("");
        match command {
            "/quit" | "/q" | "/exit" => {
                self.quit = true;
                Ok(None)
            }
            "/help" | "/h" | "/?" => Ok(Some(HELP_TEXT.to_string())),
            _ => Ok(Some(format!(
                "Unknown command: {command}\nType /help for available commands."
            ))),
        }
    }

    /// Resolve a path to an entry, starting at the root or the working
    /// directory.
    fn resolve(&self, path: &str) -> Result<EntryId> {
        let mut current = if path.starts_with('/') {
            self.store.root()
        } else {
            self.cwd
        };
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current = self.step(current, component, path)?;
        }
        Ok(current)
    }

    /// Resolve everything but the last component. The last component must be
    /// a plain name.
    fn resolve_parent<'p>(&self, path: &'p str) -> Result<(EntryId, &'p str)> {
        let trimmed = path.trim_end_matches('/');
        let (dir, name) = match trimmed.rfind('/') {
            Some(0) => ("/", &trimmed[1..]),
            Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
            None => (".", trimmed),
        };
        if name.is_empty() || name == "." || name == ".." {
            bail!("{path}: not a valid name");
        }
        Ok((self.resolve(dir)?, name))
    }

    fn step(&self, current: EntryId, component: &str, path: &str) -> Result<EntryId> {
        match component {
            "." => Ok(current),
            ".." => Ok(self.store.parent(current)?.unwrap_or(current)),
            name => self.lookup(current, name, path),
        }
    }

    fn lookup(&self, dir: EntryId, name: &str, path: &str) -> Result<EntryId> {
        self.store
            .lookup(dir, name)
            .map_err(|e| anyhow!("{path}: {e} (errno {})", e.errno()))
    }

    /// Look up a file, creating it if missing. `create_file` itself does not
    /// check for duplicates, so the lookup comes first.
    fn ensure_file(&self, path: &str, command: &str) -> Result<EntryId> {
        let (parent, name) = self.resolve_parent(path)?;
        match self.store.lookup(parent, name) {
            Ok(id) => Ok(id),
            Err(FsError::NotFound) => self
                .store
                .create_file(parent, name, FILE_MODE)
                .map_err(|e| fs_error(e, command, path)),
            Err(e) => Err(fs_error(e, command, path)),
        }
    }

    fn write_file(&self, id: EntryId, flags: OpenFlags, data: &[u8]) -> vtfs_core::FsResult<usize> {
        let mut file = self.store.open(id, flags)?;
        let written = self.store.write(&mut file, data);
        self.store.close(file)?;
        written
    }

    fn read_file(&self, id: EntryId) -> vtfs_core::FsResult<Vec<u8>> {
        let mut file = self.store.open(id, OpenFlags::read_write())?;
        let mut out = Vec::new();
        let mut chunk = [0u8; 512];
        let result = loop {
            match self.store.read(&mut file, &mut chunk) {
                Ok(0) => break Ok(()),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) => break Err(e),
            }
        };
        self.store.close(file)?;
        result.map(|()| out)
    }

    /// Path of the working directory, rebuilt from parent links.
    fn pwd(&self) -> Result<String> {
        let root = self.store.root();
        let mut names = Vec::new();
        let mut current = self.cwd;
        while current != root {
            names.push(self.store.name(current)?);
            match self.store.parent(current)? {
                Some(parent) => current = parent,
                None => break,
            }
        }
        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn one_arg<'a>(command: &str, rest: &'a str) -> Result<&'a str> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [arg] => Ok(*arg),
        _ => bail!("usage: {command} <path>"),
    }
}

fn two_args<'a>(command: &str, rest: &'a str) -> Result<(&'a str, &'a str)> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [a, b] => Ok((*a, *b)),
        _ => bail!("usage: {command} <source> <target>"),
    }
}

fn fs_error(err: FsError, command: &str, path: &str) -> anyhow::Error {
    anyhow!("{command} {path}: {err} (errno {})", err.errno())
}

const HELP_TEXT: &str = r#"vtfs REPL

Commands:
  /help, /h, /?        Show this help
  /quit, /q, /exit     Exit the REPL

Files:
  touch PATH           Create an empty file if missing
  write PATH TEXT      Replace the content of PATH with TEXT
  append PATH TEXT     Append TEXT to PATH
  cat PATH             Print the content of PATH
  truncate PATH        Drop the content of PATH
  ln SRC DST           Hardlink DST to the file SRC
  rm PATH              Remove a file name

Directories:
  mkdir PATH           Create a directory
  rmdir PATH           Remove an empty directory
  ls [PATH]            List a directory, newest first
  cd [PATH]            Change directory (default /)
  pwd                  Print the working directory

Inspection:
  stat PATH            Show attributes
  df                   Show store statistics
"#;

/// Run the REPL.
pub fn run(config: StoreConfig) -> Result<()> {
    println!("vtfs v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.\n");

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    let history_path = paths::history_file();
    let _ = rl.load_history(&history_path);

    let mut repl = Repl::new(config)?;

    while !repl.should_quit() {
        match rl.readline("vtfs> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match repl.process_line(&line) {
                    Ok(Some(output)) => println!("{output}"),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);

    let freed = repl.shutdown();
    tracing::debug!(freed, "store released");
    Ok(())
}
