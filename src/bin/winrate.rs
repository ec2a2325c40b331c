use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use plotters::prelude::*;

use sortie_stats::{Report, read_report};

#[derive(Parser, Debug)]
#[command(
    name = "winrate",
    about = "Summarize a gatherer log and plot its rolling win rate."
)]
struct Args {
    /// Gatherer CSV log
    input: PathBuf,

    /// Output chart file (png)
    #[arg(short = 'o', long = "out", default_value = "winrate.png")]
    out: PathBuf,

    /// Show a textual summary only (no chart)
    #[arg(long = "no-chart", action = ArgAction::SetTrue)]
    no_chart: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let report = read_report(&args.input)?;
    let Some(last) = report.rows.last() else {
        return Err(format!("{} contains no episode rows", args.input.display()).into());
    };

    println!("Episodes logged: {} (last episode {})", report.rows.len(), last.episode);
    println!("Wins: {}", last.win_count);
    println!("Recent win rate: {:.2}%", last.win_rate);

    let mut reasons: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &report.rows {
        *reasons.entry(row.end_reason.as_str()).or_default() += 1;
    }
    println!("\nEnd reasons:");
    for (reason, count) in &reasons {
        let share = 100.0 * *count as f64 / report.rows.len() as f64;
        println!("  {reason:<12}  {count:>6}  ({share:.2}%)");
    }

    if !args.no_chart {
        let extension = args
            .out
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        if extension.as_deref() != Some("png") {
            return Err("only PNG output is supported currently; use --out with .png".into());
        }
        render_line_chart(&args.out, &report)?;
        println!("\nChart written to {}", args.out.display());
    }
    Ok(())
}

fn render_line_chart(out: &PathBuf, report: &Report) -> Result<(), Box<dyn Error>> {
    let series = report.series("WinRate[%]")?;
    let max_episode = series.last().map(|(episode, _)| *episode).unwrap_or(1).max(1);

    let root = BitMapBackend::new(out, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| format!("{e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Rolling win rate", ("sans-serif", 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0u64..max_episode, 0.0f64..100.0)
        .map_err(|e| format!("{e}"))?;

    chart
        .configure_mesh()
        .y_desc("Win rate (%)")
        .x_desc("Episode")
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()
        .map_err(|e| format!("{e}"))?;

    chart
        .draw_series(LineSeries::new(series, &BLUE))
        .map_err(|e| format!("{e}"))?;

    root.present().map_err(|e| format!("{e}"))?;
    Ok(())
}
