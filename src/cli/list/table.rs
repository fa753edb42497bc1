use std::fmt::{self, Write};

/// A minimal fixed-width table: cells are padded to the widest entry of
/// their column and separated by two spaces, so the output stays friendly
/// to line-oriented tools.
pub(crate) struct Table {
    header: Option<Vec<String>>,
    body: Vec<Vec<String>>,
    print_header: bool,
}

impl Table {
    pub(crate) fn new() -> Table {
        Table {
            header: None,
            body: Vec::new(),
            print_header: true,
        }
    }

    pub(crate) fn set_header(&mut self, header: Vec<&str>) {
        self.header = Some(header.into_iter().map(|s| s.to_owned()).collect());
    }

    pub(crate) fn add_row(&mut self, row: Vec<String>) {
        self.body.push(row);
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    fn iter_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.header.iter().chain(self.body.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = Vec::new();

        for row in self.iter_rows() {
            if widths.len() < row.len() {
                widths.resize(row.len(), 0);
            }

            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        let rows: Box<dyn Iterator<Item = &Vec<String>>> = if self.print_header {
            Box::new(self.iter_rows())
        } else {
            Box::new(self.body.iter())
        };

        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i == row.len() - 1 {
                    f.write_str(cell)?;
                } else {
                    f.write_fmt(format_args!("{:<width$}  ", cell, width = widths[i]))?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_align() {
        let mut table = Table::new();

        table.set_header(vec!["ID", "PROVIDER"]);
        table.add_row(vec!["ollama-llama3".to_string(), "ollama".to_string()]);
        table.add_row(vec!["openai-gpt-4o".to_string(), "openai".to_string()]);

        let rendered = table.to_string();

        assert_eq!(
            rendered,
            "ID             PROVIDER\n\
             ollama-llama3  ollama\n\
             openai-gpt-4o  openai\n"
        );
    }

    #[test]
    fn test_headerless_output() {
        let mut table = Table::new();

        table.set_header(vec!["ID"]);
        table.add_row(vec!["ollama-llama3".to_string()]);
        table.print_header(false);

        assert_eq!(table.to_string(), "ollama-llama3\n");
    }
}
