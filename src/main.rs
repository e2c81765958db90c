mod debug_report;

use decktype::{CardSet, Classifier, DeckAttributes};
use std::io::{self, IsTerminal};

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let rule_text = match std::fs::read_to_string(&config.rules_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: failed to read '{}': {err}", config.rules_path);
            std::process::exit(2);
        }
    };

    let classifier = match Classifier::new(&rule_text) {
        Ok(classifier) => classifier,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let (classification, details) = classifier.classify_verbose(&config.attrs);
    debug_report::print_run(&config.rules_path, &classifier, classification.as_ref(), &details, config.color);
}

struct CliConfig {
    rules_path: String,
    attrs: DeckAttributes,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut rules_path: Option<String> = None;
    let mut attrs = DeckAttributes::default();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("decktype {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--rules" => rules_path = Some(expect_value(&mut args, "--rules")?),
            "--game-type" => attrs.game_type = Some(expect_value(&mut args, "--game-type")?),
            "--colors" => parse_counts(&expect_value(&mut args, "--colors")?, &mut attrs.colors)?,
            "--cards" => parse_counts(&expect_value(&mut args, "--cards")?, &mut attrs.cards)?,
            "--words" => parse_counts(&expect_value(&mut args, "--words")?, &mut attrs.words)?,
            _ if arg.starts_with("--rules=") => {
                rules_path = Some(arg.trim_start_matches("--rules=").to_string());
            }
            _ if arg.starts_with("--game-type=") => {
                attrs.game_type = Some(arg.trim_start_matches("--game-type=").to_string());
            }
            _ if arg.starts_with("--colors=") => {
                parse_counts(arg.trim_start_matches("--colors="), &mut attrs.colors)?;
            }
            _ if arg.starts_with("--cards=") => {
                parse_counts(arg.trim_start_matches("--cards="), &mut attrs.cards)?;
            }
            _ if arg.starts_with("--words=") => {
                parse_counts(arg.trim_start_matches("--words="), &mut attrs.words)?;
            }
            _ => return Err(format!("error: unknown argument '{arg}'\n\n{}", help_text())),
        }
    }

    let rules_path = rules_path.ok_or_else(|| format!("error: --rules is required\n\n{}", help_text()))?;
    Ok(CliConfig { rules_path, attrs, color })
}

fn expect_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("error: {flag} expects a value"))
}

/// Parse a comma-separated `name[=count]` list into `set`.
fn parse_counts(value: &str, set: &mut CardSet) -> Result<(), String> {
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(format!("error: empty item in list '{value}'"));
        }
        match entry.split_once('=') {
            Some((name, count)) => {
                let count: u32 =
                    count.trim().parse().map_err(|_| format!("error: invalid count in '{entry}'"))?;
                set.insert(name.trim(), count);
            }
            None => set.insert(entry, 1),
        }
    }
    Ok(())
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "decktype {version}

Rule-tree deck classification CLI.

Usage:
  decktype --rules <path> [OPTIONS]

Options:
  --rules <path>           Rule-tree text file (one rule per line, '|' nesting).
  --game-type <name>       The deck's game type. Omit to leave it unasserted.
  --colors <list>          Comma-separated color list, each 'name[=count]'.
  --cards <list>           Comma-separated card list, each 'name[=count]'.
  --words <list>           Comma-separated word list, each 'name[=count]'.
  --color                  Force ANSI color output.
  --no-color               Disable ANSI color output.
  -h, --help               Show this help message.
  -V, --version            Print version information.

Exit codes:
  0  Success (including \"no classification\").
  1  Rule text failed to parse or compile.
  2  Invalid arguments or unreadable rules file.
",
        version = env!("CARGO_PKG_VERSION")
    )
}
