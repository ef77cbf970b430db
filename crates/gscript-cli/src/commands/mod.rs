pub mod ast;
pub mod cfg;
pub mod check;

use std::io::Read;

use crate::cli::SourceParams;

/// Load the script from the positional path, inline text, or stdin.
pub fn load_source(params: &SourceParams) -> Result<String, String> {
    if let Some(text) = &params.text {
        return Ok(text.clone());
    }
    if let Some(path) = &params.path {
        return std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("cannot read stdin: {}", e))?;
    Ok(buffer)
}
