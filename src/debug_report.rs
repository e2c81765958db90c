use decktype::{AttrMask, Classification, Classifier, ClassifyDetails};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(
    rules_path: &str,
    classifier: &Classifier,
    classification: Option<&Classification>,
    details: &ClassifyDetails,
    color: bool,
) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Classifying against: {rules_path}"), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Rule Tree ━━━", ansi::GRAY));
    print_tree(classifier, &palette);

    println!("\n{}", palette.paint("━━━ Evaluation ━━━", ansi::GRAY));
    print_evaluation(details, &palette);

    println!("\n{}", palette.paint("━━━ Matches ━━━", ansi::GRAY));
    print_matches(details, &palette);

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    match classification {
        Some(result) => {
            let path = if result.path.is_empty() {
                String::new()
            } else {
                format!("  {} {}", palette.dim("via"), palette.paint(result.path.join(" › "), ansi::BLUE))
            };
            println!(
                "  {} {}{}",
                palette.bold(palette.paint(&result.name, ansi::GREEN)),
                palette.dim(format!("(level {})", result.level)),
                path
            );
        }
        None => {
            println!("{}", palette.paint("  No classification", ansi::YELLOW));
            println!("{}", palette.dim("  Every level matched zero deck types or more than one."));
            println!("{}", palette.dim("  Tip: Set DECKTYPE_DEBUG_RULES=1 to see per-node evaluation details"));
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Walk: {}  │  Evaluated: {}  │  Pruned: {}",
        palette.paint(format!("{:?}", details.total), ansi::GREEN),
        palette.paint(format!("{:?}", details.walk), ansi::CYAN),
        palette.paint(details.evaluated.to_string(), ansi::BLUE),
        palette.dim(details.pruned.to_string()),
    );
    println!();
}

fn print_tree(classifier: &Classifier, palette: &ansi::Palette) {
    for node in classifier.node_summaries() {
        let indent = "  ".repeat(node.level);
        let name = if node.structural {
            palette.dim(&node.name)
        } else {
            palette.paint(&node.name, ansi::BLUE)
        };
        let preview: String = node.expression.chars().take(48).collect();
        println!(
            "  {indent}{name} {} {}",
            palette.dim(preview),
            palette.paint(format!("[{}]", attr_label(node.attrs)), ansi::GRAY),
        );
    }
}

fn print_evaluation(details: &ClassifyDetails, palette: &ansi::Palette) {
    for trace in &details.traces {
        let indent = "  ".repeat(trace.level);
        let line = if trace.matched {
            palette.paint(format!("✓ {}", trace.name), ansi::GREEN)
        } else {
            palette.dim(format!("✗ {} (subtree pruned)", trace.name))
        };
        println!("  {indent}{line}");
    }
}

fn print_matches(details: &ClassifyDetails, palette: &ansi::Palette) {
    // Level 0 is the root, which is never a reportable match.
    let mut any = false;
    for (level, count) in details.level_counts.iter().enumerate().skip(1) {
        if *count == 0 {
            continue;
        }
        any = true;
        let count_text = if *count == 1 {
            palette.paint("1 match ← unique", ansi::GREEN)
        } else {
            palette.paint(format!("{count} matches (ambiguous)"), ansi::YELLOW)
        };
        println!("  {} {}", palette.paint(format!("level {level}:"), ansi::BLUE), count_text);
    }
    if !any {
        println!("{}", palette.dim("  No deck types matched below the root"));
    }
}

fn attr_label(attrs: AttrMask) -> String {
    if attrs.is_empty() {
        return "-".to_string();
    }
    let mut parts = Vec::new();
    if attrs.contains(AttrMask::GAME_TYPE) {
        parts.push("game-type");
    }
    if attrs.contains(AttrMask::COLORS) {
        parts.push("colors");
    }
    if attrs.contains(AttrMask::CARDS) {
        parts.push("cards");
    }
    if attrs.contains(AttrMask::WORDS) {
        parts.push("words");
    }
    parts.join(",")
}
