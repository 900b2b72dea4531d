fn main() -> anyhow::Result<()> {
    // the browser starts through the library's wasm entry point
    #[cfg(not(target_arch = "wasm32"))]
    castle_ngin::flow::run()?;
    Ok(())
}
