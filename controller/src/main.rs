mod config_store;
mod control_loop;
mod error;
mod handler;
mod host;
mod relay;
mod schema;
mod snapshot;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
