use crate::output::render_outcome;
use editor_agent::EditorAgent;
use hookswitch_core::Session;
use std::path::Path;

pub async fn apply(
    session: &mut Session<EditorAgent>,
    force_kill: bool,
    json: bool,
) -> anyhow::Result<()> {
    match session.apply_hook(force_kill).await {
        Some(outcome) => render_outcome(&outcome, json),
        None => {
            println!("A hook operation is already in flight.");
            Ok(())
        }
    }
}

pub async fn restore(
    session: &mut Session<EditorAgent>,
    force_kill: bool,
    json: bool,
) -> anyhow::Result<()> {
    match session.restore_hook(force_kill).await {
        Some(outcome) => render_outcome(&outcome, json),
        None => {
            println!("A hook operation is already in flight.");
            Ok(())
        }
    }
}

pub async fn set_entry(
    session: &mut Session<EditorAgent>,
    path: &Path,
    json: bool,
) -> anyhow::Result<()> {
    match session.resolve_entry_location(path).await {
        Some(result) => render_outcome(&result?, json),
        None => {
            println!("Entry selection is already in flight.");
            Ok(())
        }
    }
}
