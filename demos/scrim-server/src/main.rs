//! Minimal runnable server: in-memory rating store, everyone presumed
//! present. Point a lobby client at `ws://<addr>` and go.
//!
//! ```text
//! SCRIMNET_ADDR=0.0.0.0:9000 cargo run -p scrim-server
//! ```

use scrimnet::prelude::*;
use scrimnet_lobby::AlwaysPresent;
use scrimnet_rating::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), ScrimnetError> {
    scrimnet::init_tracing();

    let addr = std::env::var("SCRIMNET_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let server = ScrimnetServer::<AlwaysPresent, MemoryStore>::builder()
        .bind(&addr)
        .build(AlwaysPresent, MemoryStore::new())
        .await?;

    if let Ok(local) = server.local_addr() {
        tracing::info!(%local, "scrimnet server listening");
    }
    server.run().await
}
