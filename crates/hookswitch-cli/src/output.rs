use hookswitch_core::Outcome;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}

/// Render exactly one branch per outcome. Only `Fatal` becomes a process
/// error; the guidance branches are normal output the user acts on.
pub fn render_outcome(outcome: &Outcome, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(outcome)?;
        if let Outcome::Fatal { message } = outcome {
            anyhow::bail!("{message}");
        }
        return Ok(());
    }

    match outcome {
        Outcome::Success => println!("done"),
        Outcome::NeedsConfirmation => {
            println!("The target application is currently running.");
            println!("Re-run with --force-kill to close it and continue.");
        }
        Outcome::NeedsManualPath => {
            println!("Could not locate the entry script automatically.");
            println!("Run: hookswitch set-entry <path-to-main.js>");
        }
        Outcome::PermissionRequired => {
            println!("The OS refused to close the target application.");
            #[cfg(target_os = "windows")]
            println!("Re-run hookswitch from an elevated prompt (Run as administrator).");
            #[cfg(not(target_os = "windows"))]
            println!("Re-run with elevated privileges, e.g. under sudo.");
        }
        Outcome::Fatal { message } => anyhow::bail!("{message}"),
    }
    Ok(())
}
