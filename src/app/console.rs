use crate::app::AppContext;
use crate::error::{TuliplayError, TuliplayErrorKind};
use crate::player::{PlaybackState, PlaybackStatus};
use log::error;
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "\
Commands:
  load [url]      load a playlist, without url the current one is reloaded
  search [text]   filter the list by channel name, without text the filter is cleared
  list            show the channel list
  play <n>        play channel number n of the list
  stop            stop playback
  status          show the playback status
  help            show this help
  quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Load(Option<String>),
    Search(String),
    List,
    Play(usize),
    Stop,
    Status,
    Help,
    Quit,
    Invalid(String),
    Empty,
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };
    match command.to_lowercase().as_str() {
        "" => ConsoleCommand::Empty,
        "load" | "l" => ConsoleCommand::Load((!argument.is_empty()).then(|| argument.to_string())),
        "search" | "s" | "/" => ConsoleCommand::Search(argument.to_string()),
        "list" | "ls" => ConsoleCommand::List,
        "play" | "p" => argument.parse::<usize>()
            .map_or_else(|_| ConsoleCommand::Invalid(format!("play needs a channel number, got '{argument}'")), ConsoleCommand::Play),
        "stop" => ConsoleCommand::Stop,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        // a bare number plays that entry
        other => other.parse::<usize>()
            .map_or_else(|_| ConsoleCommand::Invalid(format!("unknown command '{other}', try help")), ConsoleCommand::Play),
    }
}

/// The interactive surface: reads commands, prints the list and the playback status.
pub struct Console<W: Write> {
    ctx: AppContext,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(ctx: AppContext, out: W) -> Self {
        Self { ctx, out }
    }

    fn print_list(&mut self) -> io::Result<()> {
        if let Some(msg) = self.ctx.store().billed_message() {
            writeln!(self.out, "{msg}")?;
        }
        if self.ctx.renderer().entries().is_empty() {
            if self.ctx.store().is_empty() {
                writeln!(self.out, "No channels loaded")?;
            } else {
                writeln!(self.out, "No channel matches '{}'", self.ctx.store().filter())?;
            }
            return Ok(());
        }
        self.ctx.renderer().write_to(&mut self.out, true)
    }

    fn print_status(&mut self, status: &PlaybackStatus) -> io::Result<()> {
        match &status.state {
            PlaybackState::Idle => writeln!(self.out, "Stopped"),
            PlaybackState::Loading => writeln!(self.out, "Loading {} ...", status.channel.as_deref().unwrap_or_default()),
            PlaybackState::Playing => writeln!(self.out, "Now playing: {}", status.channel.as_deref().unwrap_or_default()),
            PlaybackState::Error(message) => writeln!(self.out, "{message}"),
        }
    }

    fn print_error(&mut self, err: &TuliplayError) -> io::Result<()> {
        match err.kind {
            TuliplayErrorKind::Notify => writeln!(self.out, "{}", err.message),
            TuliplayErrorKind::Info => {
                error!("{err}");
                Ok(())
            }
        }
    }

    /// Runs one command. Returns `false` when the console should exit.
    pub async fn execute(&mut self, command: ConsoleCommand) -> io::Result<bool> {
        match command {
            ConsoleCommand::Load(url) => {
                match self.ctx.load_playlist(url.as_deref()).await {
                    Ok(count) => {
                        writeln!(self.out, "Loaded {count} channels")?;
                        self.print_list()?;
                    }
                    Err(err) => self.print_error(&err)?,
                }
            }
            ConsoleCommand::Search(text) => {
                self.ctx.search(&text);
                self.print_list()?;
            }
            ConsoleCommand::List => self.print_list()?,
            ConsoleCommand::Play(number) => {
                if let Err(err) = self.ctx.play(number) {
                    self.print_error(&err)?;
                }
            }
            ConsoleCommand::Stop => self.ctx.stop(),
            ConsoleCommand::Status => {
                let status = self.ctx.playback_status();
                self.print_status(&status)?;
            }
            ConsoleCommand::Help => writeln!(self.out, "{HELP}")?,
            ConsoleCommand::Invalid(message) => writeln!(self.out, "{message}")?,
            ConsoleCommand::Quit => return Ok(false),
            ConsoleCommand::Empty => {}
        }
        self.out.flush()?;
        Ok(true)
    }

    /// Reads commands until `quit` or end of input. With `autoload` the current
    /// playlist url is loaded after the configured delay.
    pub async fn run<R>(mut self, input: R, autoload: bool) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut status_rx = self.ctx.subscribe_playback();
        status_rx.mark_unchanged();
        let autoload_delay = tokio::time::sleep(Duration::from_millis(self.ctx.config().autoload_delay_ms));
        tokio::pin!(autoload_delay);
        let mut autoload_pending = autoload && self.ctx.playlist_url().is_some();

        if let Some(url) = self.ctx.playlist_url() {
            writeln!(self.out, "Playlist: {url}")?;
        }
        writeln!(self.out, "Type help for the list of commands")?;
        self.out.flush()?;

        loop {
            tokio::select! {
                () = &mut autoload_delay, if autoload_pending => {
                    autoload_pending = false;
                    self.execute(ConsoleCommand::Load(None)).await?;
                }
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        error!("Playback controller stopped unexpectedly");
                        break;
                    }
                    let status = status_rx.borrow_and_update().clone();
                    self.print_status(&status)?;
                    self.out.flush()?;
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.execute(parse_command(&line)).await? {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        self.ctx.shutdown().await;
        Ok(())
    }
}
