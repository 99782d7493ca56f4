use crate::output::{print_json, print_table};
use editor_agent::EditorAgent;
use hookswitch_core::{Session, TargetBackend};

pub async fn run(session: &mut Session<EditorAgent>, json: bool) -> anyhow::Result<()> {
    session.refresh_identity().await?;
    session.refresh_hook_status().await;
    let running = session.backend().query_running().await?;

    let store = session.store();

    if json {
        #[derive(serde::Serialize)]
        struct StatusOutput<'a> {
            app: &'a str,
            running: bool,
            hook_status: &'static str,
            machine_code: &'a str,
            account: &'a str,
            signed_in: bool,
            pending: Option<&'static str>,
        }

        return print_json(&StatusOutput {
            app: &session.backend().config().app_name,
            running,
            hook_status: store.hook_status.as_str(),
            machine_code: &store.identity.machine_code,
            account: &store.identity.current_account,
            signed_in: store.identity.is_signed_in(),
            pending: store.pending.get().map(|p| p.kind_str()),
        });
    }

    let account = if store.identity.current_account.is_empty() {
        "(signed out)".to_string()
    } else {
        store.identity.current_account.clone()
    };
    let machine = if store.identity.machine_code.is_empty() {
        "(none)".to_string()
    } else {
        format!("{}…", store.identity.machine_code_short())
    };

    print_table(
        &["APP", "RUNNING", "HOOK", "MACHINE", "ACCOUNT"],
        vec![vec![
            session.backend().config().app_name.clone(),
            if running { "yes" } else { "no" }.to_string(),
            store.hook_status.to_string(),
            machine,
            account,
        ]],
    );

    if let Some(pending) = store.pending.get() {
        println!("\nPending: {} — run: hookswitch set-entry <path>", pending.kind_str());
    }

    Ok(())
}
