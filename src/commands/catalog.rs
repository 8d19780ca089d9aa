use crate::config::Config;
use anyhow::Result;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let registry = config.status_registry()?;
    let codes = registry.codes();
    if json {
        println!("{}", serde_json::to_string_pretty(&codes)?);
        return Ok(());
    }

    println!("{:<6} {:<9} {:>6} {:>10}  message", "code", "category", "bit_ok", "processed");
    for code in codes {
        println!(
            "{:<6} {:<9} {:>6} {:>10}  {}",
            code.code,
            code.category,
            code.bit_ok(),
            code.bit_elaborato(),
            code.message
        );
    }
    Ok(())
}
