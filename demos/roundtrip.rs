//! Builds a function under a poor variable order, sifts it, dumps it to disk
//! and loads it into a fresh manager.
//!
//! Run with:
//! ```bash
//! cargo run --release --example roundtrip -- --pairs 8 --out /tmp/pairs
//! ```

use std::path::PathBuf;
use std::time::Instant;

use bdd_manager::{Function, Manager, OptionValue};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about = "Dump and reload a BDD through a fresh manager")]
struct Cli {
    /// Number of `x_i ∧ y_i` terms
    #[arg(long, default_value = "8")]
    pairs: usize,

    /// Base path of the dump (`.dddmp` and `.json` are appended)
    #[arg(long, default_value = "pairs")]
    out: PathBuf,

    /// Keep dynamic reordering enabled while loading
    #[arg(long)]
    reorder_on_load: bool,
}

fn build(mgr: &Manager, n: usize) -> color_eyre::Result<Function> {
    // All x's above all y's: exponential in n
    let xs: Vec<String> = (0..n).map(|i| format!("x{}", i)).collect();
    let ys: Vec<String> = (0..n).map(|i| format!("y{}", i)).collect();
    for name in xs.iter().chain(&ys) {
        mgr.add_var(name, None)?;
    }

    let mut f = mgr.zero();
    for (x, y) in xs.iter().zip(&ys) {
        let term = &mgr.var(x)? & &mgr.var(y)?;
        f = &f | &term;
    }
    Ok(f)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();

    let mgr = Manager::new();
    mgr.configure(&[("max_growth", OptionValue::Float(1.5))])?;

    let time_build = Instant::now();
    let f = build(&mgr, cli.pairs)?;
    println!("built f: {} nodes in {:?}", f.node_count(), time_build.elapsed());

    let time_reorder = Instant::now();
    if let Some(stats) = mgr.reorder(None)? {
        println!(
            "sifting: {} swaps, {} -> {} nodes ({:.1}% smaller) in {:?}",
            stats.swaps,
            stats.initial_size,
            stats.final_size,
            100.0 * stats.reduction_ratio(),
            time_reorder.elapsed()
        );
    }
    println!("f after sifting: {} nodes", f.node_count());
    println!("order: {}", mgr.vars().join(" "));

    mgr.dump(&f, &cli.out)?;

    let fresh = Manager::new();
    let g = fresh.load(&cli.out, cli.reorder_on_load)?;
    println!("loaded g: {} nodes, order: {}", g.node_count(), fresh.vars().join(" "));

    let n = 2 * cli.pairs;
    let (count_f, count_g) = (mgr.count(&f, n)?, fresh.count(&g, n)?);
    println!("models: {} vs {}", count_f, count_g);
    assert_eq!(count_f, count_g);

    // Indices in `fresh` follow the dumped order, so only a reload can bring g back
    let again = mgr.load(&cli.out, false)?;
    assert_eq!(again, f);
    println!("reload into the original manager: ok");

    println!("{}", mgr.statistics(true));
    Ok(())
}
