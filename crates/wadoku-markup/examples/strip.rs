use std::env;
use std::io::{self, BufRead};

use wadoku_markup::strip_markup;

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--demo") {
        let samples = [
            r#"<token genus="f" type="N">Gesundheit</token>"#,
            "<token>Munterkeit</token> <bracket><expl>körperlich</expl></bracket>",
            "<emph>gesund</emph>; <topic>Med.</topic> wohlauf",
        ];
        for sample in samples {
            println!("{sample}\n  -> {}", strip_markup(sample));
        }
        return Ok(());
    }

    if !args.is_empty() {
        println!("{}", strip_markup(&args.join(" ")));
        return Ok(());
    }

    // No arguments: filter stdin line by line.
    for line in io::stdin().lock().lines() {
        println!("{}", strip_markup(&line?));
    }
    Ok(())
}
