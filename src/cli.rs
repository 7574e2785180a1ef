//! Command-line parsing and usage text.

use clap::Parser;
use std::ffi::OsString;
use std::io::{self, Write};

const DEFAULT_BIN_NAME: &str = "still";

#[derive(Parser, Debug)]
#[command(
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct Options {
    /// Shell command run while the screen is frozen.
    #[arg(short = 'c', allow_hyphen_values = true)]
    command: Option<String>,

    /// Include the pointer in the frozen image.
    #[arg(short = 'p')]
    pointer: bool,

    #[arg(short = 'h')]
    help: bool,

    /// Stray operands are accepted and ignored.
    #[arg(hide = true)]
    operands: Vec<OsString>,
}

/// Everything a freeze needs from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub command: String,
    pub overlay_cursor: bool,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help { bin: String },
    Invalid { bin: String, message: String },
    Freeze(Config),
}

/// Parse a full argument list, `argv[0]` included.
pub fn parse<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let bin = args
        .first()
        .map(|arg| arg.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_BIN_NAME.to_string());

    // `-h` is honoured at the point getopt would reach it, even when a later
    // argument is malformed.
    if help_comes_first(args.iter().skip(1)) {
        return Invocation::Help { bin };
    }

    let options = match Options::try_parse_from(&args) {
        Ok(options) => options,
        Err(e) => {
            let message = first_line(&e.to_string());
            log::debug!("[CLI] Rejected arguments: {}", message);
            return Invocation::Invalid { bin, message };
        }
    };

    if options.help {
        return Invocation::Help { bin };
    }
    if !options.operands.is_empty() {
        log::debug!("[CLI] Ignoring operands {:?}", options.operands);
    }

    match options.command {
        Some(command) => Invocation::Freeze(Config {
            command,
            overlay_cursor: options.pointer,
        }),
        None => Invocation::Invalid {
            bin,
            message: "a command must be provided via -c flag".to_string(),
        },
    }
}

/// Walk the arguments the way getopt does for `c:hp` and report whether
/// `-h` is reached before the first usage error.
fn help_comes_first<'a>(args: impl Iterator<Item = &'a OsString>) -> bool {
    let mut args = args.map(|arg| arg.as_encoded_bytes());
    while let Some(arg) = args.next() {
        if arg == b"--" {
            return false;
        }
        let Some(flags) = arg.strip_prefix(b"-").filter(|flags| !flags.is_empty()) else {
            continue;
        };
        for (i, flag) in flags.iter().enumerate() {
            match flag {
                b'h' => return true,
                b'p' => {}
                b'c' => {
                    // The value is either attached or the next argument.
                    if i + 1 == flags.len() && args.next().is_none() {
                        return false;
                    }
                    break;
                }
                _ => return false,
            }
        }
    }
    false
}

fn first_line(rendered: &str) -> String {
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).trim().to_string()
}

pub fn write_usage(out: &mut dyn Write, bin: &str) -> io::Result<()> {
    write!(
        out,
        "Usage: {bin} [-h] [-p] -c <command>\n\
         \n\
         Freeze every output, run <command> and unfreeze when it exits.\n\
         \n\
         \x20 -c <command>  Run <command> with \"sh -c\" while the screen is frozen\n\
         \x20 -p            Include the pointer in the frozen image\n\
         \x20 -h            Print this help and exit\n"
    )
}
