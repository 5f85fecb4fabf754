//! A tiny scripted adventure that exercises every host callback, so the
//! binary can be run and tested without an external Z-machine.
//!
//! Story images are plain text: a `storyhost-demo 1` magic line, `key: value`
//! headers, a blank line, then the room description.

use log::{debug, info, warn};

use super::{Engine, EngineError};
use crate::bridge::{Input, StatusMode};
use crate::host::{InterpreterHost, PromptError};
use crate::storage::{FileAccess, FileHandle, FileSystem, FileType, STORY_SENTINEL, StorageError};

const MAGIC: &str = "storyhost-demo 1";

/// Longest command line the demo reads.
const MAX_COMMAND_LEN: usize = 120;

/// The story the binary runs with `--demo`.
pub const DEMO_STORY: &str = "storyhost-demo 1
title: STORYHOST DEMO
room: West of House

You are standing in an open field west of a white house, with a boarded
front door. There is a small mailbox here.
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoStory {
    pub title: String,
    pub room: String,
    pub description: String,
}

impl DemoStory {
    pub fn parse(image: &[u8]) -> Result<Self, EngineError> {
        let text = std::str::from_utf8(image)
            .map_err(|_| EngineError::Unrecognised("story is not UTF-8 text".to_string()))?;
        let mut lines = text.lines();
        if lines.next().map(|line| line.trim()) != Some(MAGIC) {
            return Err(EngineError::Unrecognised(format!(
                "missing '{}' header",
                MAGIC
            )));
        }

        let mut title = String::from("Untitled");
        let mut room = String::from("Nowhere");
        for line in lines.by_ref() {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            match line.split_once(':') {
                Some(("title", value)) => title = value.trim().to_string(),
                Some(("room", value)) => room = value.trim().to_string(),
                _ => debug!("Ignoring story header line: {}", line),
            }
        }
        let description = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        Ok(Self {
            title,
            room,
            description,
        })
    }
}

#[derive(Debug, Default)]
pub struct DemoEngine {
    moves: i16,
    score: i16,
}

enum Turn {
    Continue,
    Quit,
}

impl DemoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&mut self, host: &mut dyn InterpreterHost) -> Result<DemoStory, EngineError> {
        let files = host.files();
        let mut file = files.open(STORY_SENTINEL, FileType::Data, FileAccess::Read)?;
        let image = read_to_end(files, &mut file)?;
        files.close(file)?;
        DemoStory::parse(&image)
    }

    fn status(&self, host: &mut dyn InterpreterHost, story: &DemoStory) {
        host.show_status(&story.room, StatusMode::Score, self.score, self.moves);
    }

    fn look(host: &mut dyn InterpreterHost, story: &DemoStory) {
        host.output(&format!("\n{}\n{}\n", story.room, story.description));
    }

    fn save(&mut self, host: &mut dyn InterpreterHost, story: &DemoStory) -> Input<()> {
        let mut file = match host.prompt_for_filename("demo.sav", FileType::Save, FileAccess::Write)
        {
            Ok(file) => file,
            Err(PromptError::Interrupted) => return Input::Interrupted,
            Err(_) => {
                host.output("Failed.\n");
                return Input::Data(());
            }
        };
        let record = format!("{}\n{}\n{}\n", story.room, self.moves, self.score);
        let files = host.files();
        let written = files
            .write_str(&mut file, &record)
            .and_then(|()| files.close(file));
        host.output(if written.is_ok() { "Ok.\n" } else { "Failed.\n" });
        Input::Data(())
    }

    fn restore(&mut self, host: &mut dyn InterpreterHost) -> Input<()> {
        let mut file = match host.prompt_for_filename("demo.sav", FileType::Save, FileAccess::Read)
        {
            Ok(file) => file,
            Err(PromptError::Interrupted) => return Input::Interrupted,
            Err(_) => {
                host.output("Failed.\n");
                return Input::Data(());
            }
        };
        let files = host.files();
        let contents = read_to_end(files, &mut file);
        if let Err(e) = files.close(file) {
            warn!("Closing restored save failed: {}", e);
        }

        let restored = contents.ok().and_then(|bytes| {
            let text = String::from_utf8(bytes).ok()?;
            let mut fields = text.lines().skip(1);
            let moves = fields.next()?.trim().parse().ok()?;
            let score = fields.next()?.trim().parse().ok()?;
            Some((moves, score))
        });
        match restored {
            Some((moves, score)) => {
                self.moves = moves;
                self.score = score;
                host.game_was_restored();
                host.output("Ok.\n");
            }
            None => host.output("Failed.\n"),
        }
        Input::Data(())
    }

    fn turn(
        &mut self,
        host: &mut dyn InterpreterHost,
        story: &DemoStory,
        command: &str,
    ) -> Input<Turn> {
        let command = command.trim().to_lowercase();
        let verb = command.split_whitespace().next().unwrap_or("");
        match verb {
            "" => host.output("I beg your pardon?\n"),
            "look" | "l" => Self::look(host, story),
            "wait" | "z" => host.output("Time passes.\n"),
            "score" => host.output(&format!(
                "Your score is {} (total of 0 points), in {} moves.\n",
                self.score, self.moves
            )),
            "version" => host.output_interface_info(),
            "save" | "restore" => {
                let outcome = if verb == "save" {
                    self.save(host, story)
                } else {
                    self.restore(host)
                };
                if outcome.is_interrupted() {
                    return Input::Interrupted;
                }
                // Saving and restoring do not take a move.
                self.status(host, story);
                return Input::Data(Turn::Continue);
            }
            "restart" => {
                host.reset();
                self.moves = 0;
                self.score = 0;
                Self::look(host, story);
                self.status(host, story);
                return Input::Data(Turn::Continue);
            }
            "quit" | "q" => {
                host.output("Do you wish to leave the game? (Y is affirmative): ");
                return match host.read_char() {
                    Input::Data(c) if c.eq_ignore_ascii_case(&'y') => Input::Data(Turn::Quit),
                    Input::Data(_) => {
                        host.output("\nOk.\n");
                        Input::Data(Turn::Continue)
                    }
                    Input::Interrupted => Input::Interrupted,
                };
            }
            other => host.output(&format!("I don't know the word \"{}\".\n", other)),
        }
        if !verb.is_empty() {
            self.moves = self.moves.saturating_add(1);
        }
        self.status(host, story);
        Input::Data(Turn::Continue)
    }
}

fn read_to_end(
    files: &mut dyn FileSystem,
    file: &mut FileHandle,
) -> Result<Vec<u8>, StorageError> {
    let mut image = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = files.read(file, &mut buf)?;
        if n == 0 {
            return Ok(image);
        }
        image.extend_from_slice(&buf[..n]);
    }
}

impl Engine for DemoEngine {
    fn name(&self) -> &str {
        "demo"
    }

    fn run(&mut self, host: &mut dyn InterpreterHost) -> Result<(), EngineError> {
        let story = self.load(host)?;
        info!("Demo story '{}' loaded", story.title);

        host.set_buffer_mode(true);
        host.output(&format!("{}\nAn interactive demonstration.\n", story.title));
        Self::look(host, &story);
        self.status(host, &story);

        loop {
            host.output("\n>");
            let line = match host.read_line(MAX_COMMAND_LEN) {
                Input::Data(line) => line,
                Input::Interrupted => {
                    debug!("Input interrupted, leaving demo");
                    return Ok(());
                }
            };
            match self.turn(host, &story, &line) {
                Input::Data(Turn::Continue) => {}
                Input::Data(Turn::Quit) => {
                    host.output("\n*** The game has ended ***\n");
                    return Ok(());
                }
                Input::Interrupted => return Ok(()),
            }
        }
    }
}
