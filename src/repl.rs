use log::{ error, info };
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tokio::io::{ AsyncBufReadExt, BufReader };

use crate::chat::{ ChatController, ChatError };
use crate::models::chat::Message;

const HELP: &str = "\
Type a message and press Enter to send it. Commands:
  /retry                 resend your last message with the current provider/model
  /new                   start a new chat (unsaved messages are lost)
  /save <name>           save the current chat
  /load <name>           replace the current chat with a saved one
  /delete <name>         delete a saved chat
  /chats                 list saved chats
  /export <format>       export the chat (txt, json, md, html)
  /providers             list providers
  /provider <id>         select a provider
  /models                list models for the selected provider
  /model <id>            select a model
  /persona <name>        set the persona
  /temp <0.0-2.0>        set the temperature
  /maxtokens <n>         set the max tokens
  /key <api-key>         register an API key for the selected provider
  /defaults save|load    save or restore default settings
  /show                  show the current selection
  /help                  show this help
  /quit                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Blank,
    Send(String),
    Retry,
    New,
    Save(String),
    Load(String),
    Delete(String),
    Chats,
    Export(String),
    Providers,
    Provider(String),
    Models,
    Model(String),
    Persona(String),
    Temperature(f32),
    MaxTokens(u32),
    Key(String),
    SaveDefaults,
    LoadDefaults,
    Show,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Blank;
    }
    let rest = match trimmed.strip_prefix('/') {
        Some(rest) => rest,
        None => return Command::Send(line.trim_end_matches(['\r', '\n']).to_string()),
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "retry" => Command::Retry,
        "new" => Command::New,
        "save" => Command::Save(arg.to_string()),
        "load" => Command::Load(arg.to_string()),
        "delete" => Command::Delete(arg.to_string()),
        "chats" => Command::Chats,
        "export" => Command::Export(arg.to_string()),
        "providers" => Command::Providers,
        "provider" => Command::Provider(arg.to_string()),
        "models" => Command::Models,
        "model" => Command::Model(arg.to_string()),
        "persona" => Command::Persona(arg.to_string()),
        "temp" =>
            match arg.parse::<f32>() {
                Ok(t) if t.is_finite() => Command::Temperature(t),
                _ => Command::Invalid(format!("Not a temperature: '{}'", arg)),
            }
        "maxtokens" =>
            match arg.parse::<u32>() {
                Ok(n) if n > 0 => Command::MaxTokens(n),
                _ => Command::Invalid(format!("Not a token count: '{}'", arg)),
            }
        "key" => Command::Key(arg.to_string()),
        "defaults" =>
            match arg {
                "save" => Command::SaveDefaults,
                "load" => Command::LoadDefaults,
                _ => Command::Invalid("Usage: /defaults save|load".to_string()),
            }
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("Unknown command '/{}'. Type /help.", other)),
    }
}

fn print_message(message: &Message) {
    let retry = if message.is_retry || message.is_retry_response { " (retry)" } else { "" };
    println!("[{}] {}{}: {}", message.timestamp, message.sender, retry, message.text);
}

pub struct Repl {
    controller: ChatController,
    export_dir: PathBuf,
}

impl Repl {
    pub fn new(controller: ChatController, export_dir: PathBuf) -> Self {
        Self { controller, export_dir }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("{}", HELP);
        self.show_selection();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let command = parse_command(&line);
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.execute(command).await {
                report(&e);
            }
        }
        info!("Session ended with {} messages", self.controller.conversation().len());
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> Result<(), ChatError> {
        match command {
            Command::Send(text) => {
                self.controller.set_input(text);
                let pending = self.controller.submit_input()?;
                if let Some(user) = self.controller.conversation().last() {
                    print_message(user);
                }
                let reply = self.controller.request_completion(pending).await;
                print_message(reply);
            }
            Command::Retry => {
                let pending = self.controller.begin_retry()?;
                if let Some(user) = self.controller.conversation().last() {
                    print_message(user);
                }
                let reply = self.controller.request_completion(pending).await;
                print_message(reply);
            }
            Command::New => {
                self.controller.new_conversation()?;
                println!("Started a new chat.");
            }
            Command::Save(name) => {
                let saved_as = self.controller.save_conversation(&name).await?;
                println!("Chat saved as \"{}\".", saved_as);
            }
            Command::Load(name) => {
                self.controller.load_conversation(&name).await?;
                println!("Loaded chat \"{}\".", name);
                self.controller.conversation().iter().for_each(print_message);
            }
            Command::Delete(name) => {
                self.controller.delete_conversation(&name).await?;
                println!("Deleted chat \"{}\".", name);
            }
            Command::Chats => {
                let names = self.controller.saved_chat_names().await?;
                if names.is_empty() {
                    println!("No saved chats.");
                } else {
                    names.iter().for_each(|n| println!("  {}", n));
                }
            }
            Command::Export(format) => {
                let artifact = self.controller.export_conversation(&format)?;
                let path = self.export_dir.join(&artifact.file_name);
                let written = fs::create_dir_all(&self.export_dir).and_then(|_|
                    fs::write(&path, &artifact.contents)
                );
                match written {
                    Ok(()) => println!("Exported chat to {} ({}).", path.display(), artifact.mime_type),
                    Err(e) => {
                        error!("Failed to write export {}: {}", path.display(), e);
                        println!("! Could not write {}: {}", path.display(), e);
                    }
                }
            }
            Command::Providers => {
                let current = self.controller.settings().provider.clone();
                for p in self.controller.refresh_providers().await {
                    let marker = if p.id == current { "*" } else { " " };
                    println!(" {} {} ({})", marker, p.id, p.name);
                }
            }
            Command::Provider(id) => {
                self.controller.select_provider(&id);
                self.controller.refresh_models().await;
                self.show_selection();
            }
            Command::Models => {
                let current = self.controller.settings().model.clone();
                for m in self.controller.refresh_models().await {
                    let marker = if m.id == current { "*" } else { " " };
                    println!(" {} {} ({})", marker, m.id, m.name);
                }
            }
            Command::Model(id) => {
                self.controller.select_model(&id);
                self.show_selection();
            }
            Command::Persona(name) => {
                self.controller.settings_mut().persona = name;
                self.show_selection();
            }
            Command::Temperature(t) => {
                self.controller.set_temperature(t)?;
                self.show_selection();
            }
            Command::MaxTokens(n) => {
                self.controller.settings_mut().max_tokens = n;
                self.show_selection();
            }
            Command::Key(key) => {
                self.controller.register_api_key(&key).await?;
                println!("API key registered for {}.", self.controller.settings().provider);
            }
            Command::SaveDefaults => {
                self.controller.save_defaults().await?;
                println!("Default settings saved.");
            }
            Command::LoadDefaults => {
                if self.controller.load_defaults().await? {
                    self.show_selection();
                } else {
                    println!("No default settings saved yet.");
                }
            }
            Command::Show => self.show_selection(),
            Command::Help => println!("{}", HELP),
            Command::Invalid(msg) => println!("! {}", msg),
            Command::Blank | Command::Quit => {}
        }
        Ok(())
    }

    fn show_selection(&self) {
        let s = self.controller.settings();
        if s.has_selection() {
            println!(
                "{} | {} (persona: {}, temp: {:.1}, max tokens: {})",
                s.provider,
                s.model,
                s.persona,
                s.temperature,
                s.max_tokens
            );
        } else {
            println!("Select Provider & Model");
        }
    }
}

fn report(err: &ChatError) {
    match err.advisory() {
        Some(advisory) => println!("! {}", advisory),
        None => {
            error!("{}", err);
            println!("! {}", err);
        }
    }
}
