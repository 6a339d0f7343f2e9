//! `toolloop tools` - Print the tool catalog sent to the model.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = toolloop_tools::definitions();
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}
