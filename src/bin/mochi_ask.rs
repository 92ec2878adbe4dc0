//! Mochi Ask - interactive questionnaire
//!
//! Asks a handful of typed questions on the controlling terminal and prints
//! the answers. Used for trying the prompt library by hand.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use mochi_prompt::app::Config;
use mochi_prompt::ask::{AskError, Prompter};
use mochi_prompt::term::Session;
use mochi_prompt::terminal::Terminal;
use mochi_prompt::validate::{Modifiers, Scalar, Schema};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Answers {
    name: String,
    age: i64,
    email: String,
    homepage: String,
    tags: Vec<String>,
    size: String,
    subscribe: bool,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Parse command line arguments
    let mut config_path: Option<PathBuf> = None;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            },
            "-h" | "--help" => {
                show_help = true;
            },
            _ => {},
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let config = match &config_path {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::load_or_default(),
    };

    let session = match Session::stdio() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open terminal: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let terminal = match Terminal::open(session, &config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to set up terminal: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let mut prompter = Prompter::with_style(terminal, config.prompt.clone());
    let result = questionnaire(&mut prompter);

    // Back to cooked mode before printing with plain newlines
    let mut terminal = prompter.into_inner();
    if let Err(e) = terminal.restore() {
        tracing::warn!("failed to restore terminal: {}", e);
    }
    drop(terminal);

    match result {
        Ok(answers) => {
            println!();
            println!("name:      {}", answers.name);
            println!("age:       {}", answers.age);
            println!("email:     {}", answers.email);
            println!("homepage:  {}", answers.homepage);
            println!("tags:      {:?}", answers.tags);
            println!("size:      {}", answers.size);
            println!("subscribe: {}", answers.subscribe);
            ExitCode::SUCCESS
        },
        Err(AskError::Interrupted(interrupt)) => {
            eprintln!("{}", interrupt);
            ExitCode::from(1)
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn questionnaire(p: &mut Prompter<Terminal>) -> Result<Answers, AskError> {
    let mut schema = Schema::new(Scalar::String);

    schema
        .set_modifiers(Modifiers::REQUIRED | Modifiers::STRICT_STRING)
        .set_range(1, 40);
    let name = p.ask_string("What is your name?", &schema)?;

    schema.reset().set_range(0, 150).set_default("30");
    let age = p.ask_i64("Age?", &schema)?;

    schema.reset().set_kind(Scalar::Email).set_modifiers(Modifiers::DNS);
    let email = p
        .ask("Email", &schema)?
        .as_str()
        .unwrap_or_default()
        .to_string();

    schema.reset().set_kind(Scalar::Url);
    let homepage = p
        .ask("Homepage", &schema)?
        .as_str()
        .unwrap_or_default()
        .to_string();

    schema.reset().set_range(1, 16);
    let tags = p.ask_slice::<String>("Tags (empty line to finish)", &schema)?;

    let sizes = ["small", "medium", "large"].map(String::from);
    let size = p.choose("Size", &sizes, Some("medium".to_string()))?;

    let subscribe = p.ask_bool("Subscribe to the newsletter?", Some(true))?;

    Ok(Answers {
        name,
        age,
        email,
        homepage,
        tags,
        size,
        subscribe,
    })
}

fn print_help() {
    println!("mochi-ask - Ask a few typed questions on the terminal");
    println!();
    println!("USAGE:");
    println!("    mochi-ask [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Configuration file (default: ~/.config/mochi/prompt.json)");
    println!("    -h, --help             Print help information");
    println!();
    println!("KEYS:");
    println!("    Left/Right, Home/End   Move the cursor");
    println!("    Ctrl-Left/Ctrl-Right   Move by word");
    println!("    Insert                 Toggle overwrite");
    println!("    Ctrl-C / Ctrl-D        Interrupt (exit code from configuration)");
}
