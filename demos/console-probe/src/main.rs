//! Probes a records API the way the console does on start-up.
//!
//! ```text
//! REGISTRAR_API_URL=https://records.example.edu console-probe /manage/students
//! ```
//!
//! Resumes any existing session, then asks the navigation guard whether the
//! given route (default: the home route) may open. `RUST_LOG=debug` shows
//! every refresh and retry.

use registrar::prelude::*;

// ---------------------------------------------------------------------------
// Route table
// ---------------------------------------------------------------------------

fn access_for(path: &str, routes: &RouteConfig) -> RouteAccess {
    if path == routes.login_path || path == "/signup" {
        RouteAccess::GuestOnly
    } else if path.starts_with("/manage") {
        RouteAccess::Authenticated
    } else {
        RouteAccess::Public
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), RegistrarError> {
    init_tracing();

    let config = ConsoleConfig::from_env()?;
    let console = Console::builder().config(config).build()?;

    let session = console.start().await;
    match &session.username {
        Some(username) => println!("signed in as {username}"),
        None => println!("not signed in"),
    }

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| console.config().routes.home_path.clone());
    let access = access_for(&target, &console.config().routes);
    tracing::debug!(%target, ?access, "checking navigation");

    match console.guard().check(&target, access).await {
        NavigationDecision::Proceed => println!("{target}: proceed"),
        NavigationDecision::Redirect(to) => println!("{target}: redirect to {to}"),
    }

    if let Some(expires_at) = console.gateway().snapshot().access_token_expires_at {
        println!("access token expires at {expires_at}");
    }
    Ok(())
}
