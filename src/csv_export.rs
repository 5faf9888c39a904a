use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MarketError;
use crate::result_set::ResultTable;

/// Quotes a cell when it contains a separator, quote or newline.
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn render(table: &ResultTable) -> String {
    let mut out = String::new();
    let header: Vec<String> = table.headers.iter().map(|h| escape(h)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// Writes an already-ordered and filtered table to `<dir>/<name>.csv`,
/// creating the directory if needed. Returns the written path.
pub fn export(table: &ResultTable, dir: &Path, name: &str) -> Result<PathBuf, MarketError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", name));
    fs::write(&path, render(table))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultTable {
        ResultTable {
            headers: vec!["Name".to_string(), "Sell Min".to_string()],
            rows: vec![
                vec!["Adept's Sword".to_string(), "12,500".to_string()],
                vec!["Say \"hi\"".to_string(), "N/A".to_string()],
            ],
        }
    }

    #[test]
    fn test_render_escapes_separators_and_quotes() {
        let text = render(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name,Sell Min");
        assert_eq!(lines[1], "Adept's Sword,\"12,500\"");
        assert_eq!(lines[2], "\"Say \"\"hi\"\"\",N/A");
    }

    #[test]
    fn test_export_writes_file() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join("albion_market_bot_csv_test");
        let path = export(&sample(), &dir, "Lymhurst")?;
        let written = std::fs::read_to_string(&path)?;
        assert!(written.starts_with("Name,Sell Min\n"));
        std::fs::remove_dir_all(&dir).ok();
        Ok(())
    }
}
