//! CLI - reedline-based REPL interface
//!
//! Renders values from the inspected target on demand, plus a few
//! commands to look at raw memory, known types and registered printers.

use crate::codec::{default_codec, DocumentCodec};
use crate::core::memory::{MemoryError, TargetMemory};
use crate::debuginfo::{InspectError, Inspector, TypeRegistry};
use crate::printers::{mongo_printers, PrinterRegistry, RenderOptions, Rendered, Renderer};
use anyhow::Result;
use colored::Colorize;
use reedline::{Prompt, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal};
use std::borrow::Cow;

/// Bytes per hex dump line
const DUMP_WIDTH: usize = 16;

/// Longest hex dump a single `x` command reads
pub const MAX_DUMP_LEN: usize = 64 * 1024;

/// Custom prompt showing the inspected target
pub struct PrinterPrompt {
    target: String,
}

impl PrinterPrompt {
    pub fn new(target: String) -> Self {
        Self { target }
    }
}

impl Prompt for PrinterPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(format!("[{}]", self.target))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "(failed) ",
        };
        Cow::Owned(format!("(search: {}{}) ", prefix, history_search.term))
    }
}

/// Everything needed to render values of one target
pub struct Session {
    memory: Box<dyn TargetMemory>,
    types: TypeRegistry,
    printers: PrinterRegistry,
    codec: Option<Box<dyn DocumentCodec>>,
    options: RenderOptions,
}

impl Session {
    pub fn new(memory: Box<dyn TargetMemory>, types: TypeRegistry) -> Self {
        Self {
            memory,
            types,
            printers: mongo_printers(),
            codec: default_codec(),
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_codec(mut self, codec: Option<Box<dyn DocumentCodec>>) -> Self {
        self.codec = codec;
        self
    }

    pub fn printers_mut(&mut self) -> &mut PrinterRegistry {
        &mut self.printers
    }

    pub fn describe(&self) -> String {
        self.memory.describe()
    }

    /// Render the object of type `type_name` at `address`
    pub fn render(&self, type_name: &str, address: u64) -> Result<Rendered, InspectError> {
        let inspector = Inspector::new(self.memory.as_ref(), &self.types);
        Renderer::new(inspector, &self.printers)
            .with_codec(self.codec.as_deref())
            .with_options(self.options)
            .render_at(address, type_name)
    }

    /// Hex dump lines for `len` bytes at `address`, at most `MAX_DUMP_LEN`
    pub fn hex_dump(&self, address: u64, len: usize) -> Result<Vec<String>, MemoryError> {
        if len > MAX_DUMP_LEN {
            log::warn!("Dump of {} bytes limited to {}", len, MAX_DUMP_LEN);
        }
        let bytes = self.memory.read(address, len.min(MAX_DUMP_LEN))?;
        Ok(bytes
            .chunks(DUMP_WIDTH)
            .enumerate()
            .map(|(i, chunk)| {
                let ascii: String = chunk
                    .iter()
                    .map(|&b| {
                        if b.is_ascii_graphic() || b == b' ' {
                            b as char
                        } else {
                            '.'
                        }
                    })
                    .collect();
                format!(
                    "{:#018x}  {:<width$}  {}",
                    address + (i * DUMP_WIDTH) as u64,
                    hex::encode(chunk),
                    ascii,
                    width = DUMP_WIDTH * 2
                )
            })
            .collect())
    }

    /// Known type names containing `filter`
    pub fn types_matching(&self, filter: Option<&str>) -> Vec<&str> {
        self.types
            .names()
            .into_iter()
            .filter(|name| filter.map_or(true, |f| name.contains(f)))
            .collect()
    }
}

/// Command parsing result
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Render a value: p <type> <addr>
    Print { type_name: String, address: u64 },
    /// Hex dump: x <addr> [len]
    Examine { address: u64, len: usize },
    /// List known types: types [filter]
    Types(Option<String>),
    /// List printers: printers
    Printers,
    /// Enable a printer: enable <name>
    Enable(String),
    /// Disable a printer: disable <name>
    Disable(String),
    /// Help: ? or help
    Help,
    /// Quit: q or exit
    Quit,
    /// Unknown command
    Unknown(String),
}

/// Parse a command string into a structured command
pub fn parse_command(input: &str) -> ParsedCommand {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts.first().unwrap_or(&"");
    let arg = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

    match *cmd {
        "p" | "print" => {
            // The address is the last word; the type may contain spaces
            if let Some((type_name, addr_str)) = arg.and_then(|a| a.rsplit_once(' ')) {
                if let Ok(address) = parse_address(addr_str) {
                    return ParsedCommand::Print {
                        type_name: type_name.trim().to_string(),
                        address,
                    };
                }
            }
            ParsedCommand::Unknown(input.to_string())
        }

        "x" => {
            let mut words = arg.unwrap_or("").split_whitespace();
            let address = words.next().map(parse_address);
            let len = words.next().map(|s| s.parse::<usize>());
            match (address, len) {
                (Some(Ok(address)), None) => ParsedCommand::Examine { address, len: 64 },
                (Some(Ok(address)), Some(Ok(len))) => ParsedCommand::Examine { address, len },
                _ => ParsedCommand::Unknown(input.to_string()),
            }
        }

        "types" => ParsedCommand::Types(arg.map(str::to_string)),
        "printers" => ParsedCommand::Printers,
        "enable" => match arg {
            Some(name) => ParsedCommand::Enable(name.to_string()),
            None => ParsedCommand::Unknown(input.to_string()),
        },
        "disable" => match arg {
            Some(name) => ParsedCommand::Disable(name.to_string()),
            None => ParsedCommand::Unknown(input.to_string()),
        },

        // Help
        "?" | "help" => ParsedCommand::Help,

        // Quit
        "q" | "quit" | "exit" => ParsedCommand::Quit,

        _ => ParsedCommand::Unknown(input.to_string()),
    }
}

/// Parse an address string (supports 0x prefix and decimal)
pub fn parse_address(s: &str) -> Result<u64, std::num::ParseIntError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

/// Print a rendering the way the REPL and one-shot mode show it
pub fn print_rendered(rendered: &Rendered) {
    println!("{} {}", format!("({})", rendered.type_name).dimmed(), rendered);
}

/// Print the help message
fn print_help() {
    println!("{}", "mongo-printers Commands".bold().cyan());
    println!("{}", "═".repeat(50).cyan());

    println!("\n{}", "Rendering:".bold().yellow());
    println!("  {}  Render a value", "p <type> <addr>".green());

    println!("\n{}", "Memory:".bold().yellow());
    println!("  {}    Hex dump (default 64 bytes)", "x <addr> [len]".green());

    println!("\n{}", "Types & Printers:".bold().yellow());
    println!("  {}   List known types", "types [filter]".green());
    println!("  {}         List registered printers", "printers".green());
    println!("  {}    Enable a printer", "enable <name>".green());
    println!("  {}   Disable a printer", "disable <name>".green());

    println!("\n{}", "Other:".bold().yellow());
    println!("  {}                Show this help", "?".green());
    println!("  {}                Quit", "q".green());
}

/// Execute a parsed command; returns false when the REPL should stop
fn execute_command(session: &mut Session, cmd: ParsedCommand) -> bool {
    match cmd {
        ParsedCommand::Print {
            type_name,
            address,
        } => match session.render(&type_name, address) {
            Ok(rendered) => print_rendered(&rendered),
            Err(e) => println!("{} {}", "[!]".red(), e),
        },
        ParsedCommand::Examine { address, len } => match session.hex_dump(address, len) {
            Ok(lines) => lines.iter().for_each(|line| println!("    {}", line)),
            Err(e) => println!("{} {}", "[!]".red(), e),
        },
        ParsedCommand::Types(filter) => {
            let names = session.types_matching(filter.as_deref());
            println!("[*] {} types", names.len());
            for name in names {
                println!("    {}", name);
            }
        }
        ParsedCommand::Printers => {
            println!("[*] {}:", session.printers.name());
            for printer in session.printers.printers() {
                let state = if printer.enabled {
                    "".normal()
                } else {
                    " [disabled]".dimmed()
                };
                println!("    {:<20} {}{}", printer.name.green(), printer.pattern, state);
            }
        }
        ParsedCommand::Enable(name) => set_printer(session, &name, true),
        ParsedCommand::Disable(name) => set_printer(session, &name, false),
        ParsedCommand::Help => {
            print_help();
        }
        ParsedCommand::Quit => {
            println!("[*] Shutting down...");
            return false;
        }
        ParsedCommand::Unknown(input) => {
            println!("{} Unknown command: '{}'", "[!]".red(), input);
            println!("    Type '?' for help");
        }
    }
    true
}

fn set_printer(session: &mut Session, name: &str, enabled: bool) {
    if session.printers_mut().set_enabled(name, enabled) {
        let verb = if enabled { "enabled" } else { "disabled" };
        println!("[*] Printer {} {}", name, verb);
    } else {
        println!("{} No printer named '{}'", "[!]".red(), name);
    }
}

/// Run the CLI REPL
pub fn run_cli(mut session: Session) -> Result<()> {
    let mut line_editor = Reedline::create();
    let prompt = PrinterPrompt::new(session.describe());

    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║  mongo-printers - Type '?' for help, 'q' to quit             ║".cyan()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════╝".cyan()
    );

    loop {
        let sig = line_editor.read_line(&prompt)?;
        match sig {
            Signal::Success(buffer) => {
                let input = buffer.trim();
                if input.is_empty() {
                    continue;
                }

                let cmd = parse_command(input);
                if !execute_command(&mut session, cmd) {
                    break;
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                println!("\n[*] Interrupted");
                break;
            }
        }
    }

    Ok(())
}
