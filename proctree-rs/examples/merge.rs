//! Example: Three-way merge of process documents
//!
//! Merges two edited copies of a base document and prints the merged
//! document. Conflicts are listed on stderr together with the branch that
//! won them.
//!
//! Usage: cargo run --example merge <base.xml> <branch_a.xml> <branch_b.xml>

use std::env;

use proctree_merge::{merge_trees, parse_file, print_to_string_pretty, DiffConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 4 {
        eprintln!("Usage: {} <base.xml> <branch_a.xml> <branch_b.xml>", args[0]);
        std::process::exit(1);
    }

    eprintln!("Parsing base: {}", args[1]);
    let base = parse_file(&args[1])?;

    eprintln!("Parsing branch A: {}", args[2]);
    let branch_a = parse_file(&args[2])?;

    eprintln!("Parsing branch B: {}", args[3]);
    let branch_b = parse_file(&args[3])?;

    eprintln!("Merging...");
    let result = merge_trees(&base, &branch_a, &branch_b, &DiffConfig::default())?;
    print!("{}", print_to_string_pretty(&result.merged())?);

    if result.conflicts.conflict_count() > 0 {
        eprintln!("\nConflicts:");
        for conflict in result.conflicts.resolved() {
            eprintln!("  {}", conflict);
        }
    }

    eprintln!("\nMerge completed with {} edits.", result.edits.edit_count());
    Ok(())
}
