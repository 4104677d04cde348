//! Structure command - show how each line is classified

use std::path::Path;

use appmarket_core::ValuesDocument;

use crate::error::{CliError, Result};

pub fn run(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(|e| CliError::Io {
        message: format!("{}: {}", file.display(), e),
    })?;
    let doc = ValuesDocument::from_text(&text);

    println!("# indent unit: {}", doc.indent_unit());
    for line in doc.scan() {
        println!("{}", render(line.index, line.indent, &line.path.to_string(), line.text));
    }
    Ok(())
}

fn render(index: usize, indent: Option<usize>, path: &str, text: &str) -> String {
    let indent = indent.map_or_else(|| "-".to_string(), |n| n.to_string());
    format!(
        "{:>4} {:>3} {:<32} {}",
        index + 1,
        indent,
        path,
        text.trim_end_matches(['\n', '\r'])
    )
}
