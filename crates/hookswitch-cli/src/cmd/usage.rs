use crate::output::{print_json, print_table};
use editor_agent::EditorAgent;
use hookswitch_core::Session;

pub async fn run(session: &mut Session<EditorAgent>, json: bool) -> anyhow::Result<()> {
    session.refresh_identity().await?;
    let Some(snapshot) = session.refresh_usage().await else {
        println!("A usage refresh is already in flight.");
        return Ok(());
    };

    if json {
        return print_json(&snapshot);
    }

    if snapshot.per_model.is_empty() {
        match &snapshot.error_kind {
            Some(kind) => println!("Usage unavailable ({kind})."),
            None => println!("No usage reported for this account."),
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = snapshot
        .per_model
        .iter()
        .map(|(model, usage)| {
            vec![
                model.clone(),
                usage.used.to_string(),
                usage
                    .cap
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["MODEL", "USED", "CAP"], rows);

    if let Some(kind) = &snapshot.error_kind {
        println!("\n(stale: last refresh failed with {kind})");
    }

    Ok(())
}
