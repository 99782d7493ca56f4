use crate::output::print_json;
use editor_agent::EditorAgent;
use hookswitch_core::{IdentityState, Session};

pub async fn reset(session: &mut Session<EditorAgent>, json: bool) -> anyhow::Result<()> {
    let Some(result) = session.reset_identity().await else {
        println!("An identity reset is already in flight.");
        return Ok(());
    };
    let fresh = result?;
    report_identity(&fresh, json, "machine identity regenerated")
}

pub async fn switch(
    session: &mut Session<EditorAgent>,
    email: &str,
    token: &str,
    force_kill: bool,
    json: bool,
) -> anyhow::Result<()> {
    let Some(result) = session.switch_account(email, token, force_kill).await else {
        println!("An account switch is already in flight.");
        return Ok(());
    };
    result?;
    report_identity(
        &session.store().identity.clone(),
        json,
        "account switched",
    )
}

pub async fn quick(
    session: &mut Session<EditorAgent>,
    email: Option<&str>,
    token: Option<&str>,
    force_kill: bool,
    json: bool,
) -> anyhow::Result<()> {
    let Some(result) = session.quick_change(email, token, force_kill).await else {
        println!("A quick change is already in flight.");
        return Ok(());
    };
    let identity = result?;
    report_identity(&identity, json, "identity reset and account switched")
}

fn report_identity(identity: &IdentityState, json: bool, headline: &str) -> anyhow::Result<()> {
    if json {
        return print_json(identity);
    }
    println!("{headline}");
    println!("  machine code: {}…", identity.machine_code_short());
    if identity.is_signed_in() {
        println!("  account:      {}", identity.current_account);
    } else {
        println!("  account:      (signed out)");
    }
    Ok(())
}
