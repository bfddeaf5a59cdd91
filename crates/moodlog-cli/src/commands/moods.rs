use super::App;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open_raw()?;
    let catalog = app.config.catalog();
    println!("{}", serde_json::to_string_pretty(catalog.moods())?);
    Ok(())
}
