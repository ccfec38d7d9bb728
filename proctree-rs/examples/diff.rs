//! Example: Diff two process documents
//!
//! Prints the edit script that turns the first document into the second,
//! followed by the annotated delta tree.
//!
//! Usage: cargo run --example diff <old.xml> <new.xml>

use std::env;

use proctree_merge::{
    delta_tree, diff_trees, parse_file, render_tree, resolve_placeholders, DiffConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <old.xml> <new.xml>", args[0]);
        std::process::exit(1);
    }

    eprintln!("Parsing old: {}", args[1]);
    let old = parse_file(&args[1])?;

    eprintln!("Parsing new: {}", args[2]);
    let new = parse_file(&args[2])?;

    let config = DiffConfig::default();
    let result = diff_trees(&old, &new, &config);

    if result.script.is_empty() {
        eprintln!("Documents are equivalent.");
        return Ok(());
    }

    print!("{}", result.script);
    println!();

    let delta = delta_tree(&old, &new, &config)?;
    print!("{}", render_tree(&resolve_placeholders(&delta)));

    Ok(())
}
