use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::model::ResultRow;

const HEADERS: [&str; 3] = ["STUDENT", "MAX.", "NOTES"];

pub fn output_path(input: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| {
        let mut out: PathBuf = input.into();
        out.set_extension("xlsx");
        out
    })
}

/// Column-aligned text grid, one line per student.
pub fn render_text(rows: &[ResultRow]) -> String {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|r| [r.student.clone(), r.formatted_max(), r.formatted_scores().join(", ")])
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(&HEADERS.map(String::from), &widths));
    for row in &cells {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

fn format_line(cells: &[String; 3], widths: &[usize; 3]) -> String {
    let line = format!(
        "{:<w0$}  {:>w1$}  {}",
        cells[0],
        cells[1],
        cells[2],
        w0 = widths[0],
        w1 = widths[1],
    );
    line.trim_end().to_string()
}

struct ReportFormats {
    title: Format,
    header: Format,
    cell: Format,
    number: Format,
}

impl ReportFormats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter),
            header: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            cell: Format::new()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            number: Format::new()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_num_format("0.00"),
        }
    }
}

fn write_headers(ws: &mut Worksheet, row: u32, fmt: &Format) -> Result<()> {
    for (i, h) in HEADERS.iter().enumerate() {
        ws.write_string_with_format(row, i as u16, *h, fmt)?;
    }
    Ok(())
}

fn write_result_row(ws: &mut Worksheet, row: u32, r: &ResultRow, fmt: &ReportFormats) -> Result<()> {
    ws.write_string_with_format(row, 0, &r.student, &fmt.cell)?;
    match r.max_score {
        Some(max) => ws.write_number_with_format(row, 1, max, &fmt.number)?,
        None => ws.write_blank(row, 1, &fmt.number)?,
    };
    ws.write_string_with_format(row, 2, r.formatted_scores().join(", "), &fmt.cell)?;
    Ok(())
}

fn set_column_widths(ws: &mut Worksheet) -> Result<()> {
    let widths = [28, 10, 48];
    for (col, w) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, *w)?;
    }
    Ok(())
}

/// Writes the result grid under a `title` line and saves it to `path`.
pub fn export_xlsx(rows: &[ResultRow], title: &str, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let fmt = ReportFormats::new();

    worksheet.merge_range(0, 0, 0, 2, title, &fmt.title)?;
    write_headers(worksheet, 1, &fmt.header)?;
    for (i, r) in rows.iter().enumerate() {
        write_result_row(worksheet, 2 + i as u32, r, &fmt)?;
    }
    set_column_widths(worksheet)?;

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rows() -> Vec<ResultRow> {
        vec![
            ResultRow {
                student: "Durand Alice".to_string(),
                max_score: Some(18.0),
                scores: vec![Some(12.5), Some(0.0), Some(18.0)],
            },
            ResultRow {
                student: "Martin Bob".to_string(),
                max_score: None,
                scores: vec![],
            },
        ]
    }

    #[test]
    fn text_grid_lists_each_student() {
        let text = render_text(&rows());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "STUDENT        MAX.  NOTES");
        assert_eq!(lines[1], "Durand Alice  18.00  12.50, 0.00, 18.00");
        assert_eq!(lines[2], "Martin Bob");
    }

    #[test]
    fn default_output_sits_next_to_the_input() {
        assert_eq!(
            output_path(Path::new("exports/quiz.csv"), None),
            PathBuf::from("exports/quiz.xlsx")
        );
        assert_eq!(
            output_path(Path::new("quiz.csv"), Some(PathBuf::from("out.xlsx"))),
            PathBuf::from("out.xlsx")
        );
    }

    #[test]
    fn exports_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        export_xlsx(&rows(), "Math", &path).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
