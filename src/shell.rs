use rustyline::{Editor, Helper, Config, error::ReadlineError, Context};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use std::future::Future;
use std::path::Path;

const COMMANDS: [&str; 4] = ["status", "stop", "help", "exit"];


/*
    @@@
    @CmdCompleter;
    . Drops CmdCompleter into 'rl.set_helper(Some(...))' and get instant, prefix-based command completion.
    . Plugs into rustyline to provide simple tab-completion based on a fixed list of command names.
*/
struct CmdCompleter {
    commands: Vec<String>,
}
impl Helper for CmdCompleter {}
impl Hinter for CmdCompleter {
    type Hint = String;
}
impl Highlighter for CmdCompleter {}
impl Validator for CmdCompleter {}
impl Completer for CmdCompleter {
    type Candidate = Pair;
    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let matches = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, matches))
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Status,
    Stop,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> ShellCommand {
    match line.trim() {
        "" => ShellCommand::Empty,
        "status" => ShellCommand::Status,
        "stop" => ShellCommand::Stop,
        "help" | "?" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => ShellCommand::Unknown(other.to_string()),
    }
}




/*
    @@@
    @run_shell();
    . Reads operator commands with history (kept at `history`) and tab completion.
    . status and stop run the matching closure; exit, Ctrl-C and Ctrl-D leave the shell.
    . readline blocks, so it runs under block_in_place: needs the multi-threaded runtime.
*/
pub async fn run_shell<SFut, SpFut, OnStatus, OnStop>(
    history: &Path,
    mut on_status: OnStatus,
    mut on_stop: OnStop,
) -> rustyline::Result<()>
where
    OnStatus: FnMut() -> SFut,
    SFut: Future<Output = ()>,
    OnStop: FnMut() -> SpFut,
    SpFut: Future<Output = ()>,
{
    let config = Config::builder().auto_add_history(false).build();
    let mut rl: Editor<CmdCompleter, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(CmdCompleter {
        commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
    }));
    let _ = rl.load_history(history);

    loop {
        let line = tokio::task::block_in_place(|| rl.readline("devserver> "));
        match line {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.trim())?;
                }
                match parse_command(&line) {
                    ShellCommand::Status => on_status().await,
                    ShellCommand::Stop => on_stop().await,
                    ShellCommand::Help => println!("commands: {}", COMMANDS.join(", ")),
                    ShellCommand::Exit => break,
                    ShellCommand::Empty => {}
                    ShellCommand::Unknown(other) => println!("Unknown command: {}", other),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    rl.save_history(history)?;
    Ok(())
}
