//! Skirmish arena server binary.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_skirmish::init().await
}
