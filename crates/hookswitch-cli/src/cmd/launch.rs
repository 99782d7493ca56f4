use editor_agent::EditorAgent;
use hookswitch_core::Session;

pub async fn run(session: &Session<EditorAgent>) -> anyhow::Result<()> {
    session.launch().await?;
    println!("launched {}", session.backend().config().app_name);
    Ok(())
}
