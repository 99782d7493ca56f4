use crate::output::{print_json, print_table};
use editor_agent::{history, paths};

pub fn run(limit: usize, json: bool) -> anyhow::Result<()> {
    let path = paths::history_file()?;
    let records = history::read_recent(&path, limit)?;

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No recorded operations yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.kind.to_string(),
                r.operator.clone(),
                r.detail.clone(),
            ]
        })
        .collect();
    print_table(&["WHEN", "KIND", "OPERATOR", "DETAIL"], rows);
    Ok(())
}
