use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use blockvfs::io::BlockStorage;
use blockvfs::{ReadOutcome, Teardown, Usage, Vfs, WriteOutcome};
use log::{debug, info};

use crate::parse::{parse, Command};

const BANNER: &str = "VFS ready. Type 'exit' to quit.";
const FAREWELL: &str = "Goodbye.";

/// What a successful command prints.
enum Reply {
    Text(String),
    /// File content, printed verbatim and followed by a newline.
    Raw(Vec<u8>),
}

fn format_usage(usage: &Usage) -> String {
    format!(
        "Total: {}\nUsed: {}\nFree: {}\nUsage: {:.2}%",
        usage.total, usage.used, usage.free, usage.percent_used
    )
}

/// Reads one command per line and runs it against an owned file system until
/// `exit` or the end of input, then tears the file system down.
pub struct Shell<T: BlockStorage> {
    fs: Vfs<T>,
    /// Prompts are only written in interactive sessions.
    interactive: bool,
}

impl<T: BlockStorage> Shell<T> {
    pub fn new(fs: Vfs<T>, interactive: bool) -> Self {
        Self { fs, interactive }
    }

    pub fn prompt(&self) -> String {
        format!("{} > ", self.fs.pwd())
    }

    pub fn run<R: BufRead, W: Write>(mut self, mut input: R, out: &mut W) -> io::Result<Teardown> {
        writeln!(out, "{}", BANNER)?;

        let mut line = Vec::new();
        loop {
            if self.interactive {
                write!(out, "{}", self.prompt())?;
                out.flush()?;
            }

            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                if self.interactive {
                    writeln!(out)?;
                }
                return self.exit(out);
            }

            match parse(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Exit)) => return self.exit(out),
                Ok(Some(command)) => self.execute(command, out)?,
                Err(err) => writeln!(out, "{}", err)?,
            }
        }
    }

    fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<()> {
        debug!("executing {:?}", command);
        match self.dispatch(command) {
            Ok(Reply::Text(text)) => writeln!(out, "{}", text),
            Ok(Reply::Raw(bytes)) => {
                out.write_all(&bytes)?;
                writeln!(out)
            }
            Err(err) => writeln!(out, "{}", err),
        }
    }

    fn dispatch(&mut self, command: Command) -> blockvfs::Result<Reply> {
        let text = match command {
            Command::Mkdir(name) => {
                self.fs.mkdir(&name)?;
                format!("Directory '{}' created.", name)
            }
            Command::Create(name) => {
                self.fs.create_file(&name)?;
                format!("File '{}' created.", name)
            }
            Command::Ls => {
                let entries = self.fs.ls();
                if entries.is_empty() {
                    "(empty)".to_owned()
                } else {
                    entries
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::Write { name, data } => match self.fs.write(&name, &data)? {
                WriteOutcome::Written(len) => format!("Written {} bytes.", len),
                WriteOutcome::Empty => "(empty data)".to_owned(),
            },
            Command::Read(name) => match self.fs.read(&name)? {
                ReadOutcome::Data(bytes) => return Ok(Reply::Raw(bytes)),
                ReadOutcome::Empty => "(empty)".to_owned(),
            },
            Command::Delete(name) => {
                self.fs.delete(&name)?;
                "File removed.".to_owned()
            }
            Command::Rmdir(name) => {
                self.fs.rmdir(&name)?;
                "Removed dir.".to_owned()
            }
            Command::Cd(token) => format!("Moved to {}", self.fs.cd(&token)?),
            Command::Pwd => self.fs.pwd(),
            Command::Df => format_usage(&self.fs.df()),
            Command::Exit => unreachable!("exit is handled by the read loop"),
        };
        Ok(Reply::Text(text))
    }

    fn exit<W: Write>(self, out: &mut W) -> io::Result<Teardown> {
        let report = self.fs.shutdown();
        info!(
            "released {} files, {} directories and {} blocks",
            report.files, report.directories, report.blocks_reclaimed
        );
        writeln!(out, "{}", FAREWELL)?;
        Ok(report)
    }
}

/// Runs every line of the file at `path` without prompting.
pub fn run_script<T: BlockStorage, W: Write>(
    fs: Vfs<T>,
    path: &Path,
    out: &mut W,
) -> io::Result<Teardown> {
    let script = File::open(path)?;
    Shell::new(fs, false).run(BufReader::new(script), out)
}
