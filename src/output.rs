//! Output formatting for ripgrep-like content search results

use crate::engine::{DatabaseStatistics, FileExtract, IndexServer, SearchFileContentsResult, format_size};
use crate::paths::{DirectoryName, FileName};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(if color { ColorChoice::Auto } else { ColorChoice::Never })
}

/// Print content matches in ripgrep-style format, one extract per match.
pub fn print_content_matches(
    server: &IndexServer,
    result: &SearchFileContentsResult,
    color: bool,
    heading: bool,
) -> io::Result<()> {
    let mut stdout = stdout(color);

    for (index, file) in result.files.iter().enumerate() {
        let path = file.file_name.full_path();
        let extracts = match server.get_file_extracts(&path, &file.spans) {
            Ok(extracts) => extracts,
            // Removed between search and printing.
            Err(_) => continue,
        };

        if heading {
            if index > 0 {
                writeln!(stdout)?;
            }
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
            writeln!(stdout, "{}", path.display())?;
            stdout.reset()?;
        }

        for extract in &extracts {
            print_match_line(&mut stdout, &file.file_name, extract, heading)?;
        }
    }

    Ok(())
}

/// Byte range within `text` of the character range in `extract`.
fn match_bytes(extract: &FileExtract) -> (usize, usize) {
    let text = &extract.text;
    let byte_at = |chars: usize| {
        text.char_indices()
            .nth(chars)
            .map_or(text.len(), |(i, _)| i)
    };
    let start = byte_at(extract.match_offset);
    let end = byte_at(extract.match_offset + extract.match_length);
    (start, end.max(start))
}

/// Print a match line with highlighted match
fn print_match_line(
    stdout: &mut StandardStream,
    file: &FileName,
    extract: &FileExtract,
    heading: bool,
) -> io::Result<()> {
    if !heading {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(stdout, "{}", file.full_path().display())?;
        stdout.reset()?;
        write!(stdout, ":")?;
    }

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(stdout, "{}", extract.line_number)?;
    stdout.reset()?;
    write!(stdout, ":{}:", extract.column_number)?;

    let content = &extract.text;
    let (start, end) = match_bytes(extract);
    write!(stdout, "{}", &content[..start])?;
    if end > start {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(stdout, "{}", &content[start..end])?;
        stdout.reset()?;
    }
    writeln!(stdout, "{}", &content[end..])?;

    Ok(())
}

/// Print only filenames (for -l flag)
pub fn print_files_only(result: &SearchFileContentsResult, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    for file in &result.files {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        writeln!(stdout, "{}", file.file_name.full_path().display())?;
        stdout.reset()?;
    }
    Ok(())
}

/// Print match count per file (for -c flag)
pub fn print_match_counts(result: &SearchFileContentsResult, color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    for file in &result.files {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(stdout, "{}", file.file_name.full_path().display())?;
        stdout.reset()?;
        write!(stdout, ":")?;
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(stdout, "{}", file.spans.len())?;
        stdout.reset()?;
    }
    Ok(())
}

/// One-line summary written to stderr after a search.
pub fn print_search_summary(result: &SearchFileContentsResult) {
    let truncated = if result.hit_max_results { " (truncated)" } else { "" };
    eprintln!(
        "{} matches in {} files ({} searched) in {:.1}ms{}",
        result.total_matches,
        result.files.len(),
        result.searched_files,
        result.elapsed.as_secs_f64() * 1000.0,
        truncated
    );
}

pub fn print_file_names(names: &[FileName], color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    for name in names {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        writeln!(stdout, "{}", name.full_path().display())?;
        stdout.reset()?;
    }
    Ok(())
}

pub fn print_directory_names(names: &[DirectoryName], color: bool) -> io::Result<()> {
    let mut stdout = stdout(color);
    for name in names {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
        writeln!(stdout, "{}", name.full_path().display())?;
        stdout.reset()?;
    }
    Ok(())
}

/// Human readable statistics report.
pub fn print_statistics(stats: &DatabaseStatistics) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "Index Statistics")?;
    writeln!(out, "================")?;
    writeln!(out)?;
    writeln!(out, "Tree version:        {}", stats.tree_version)?;
    writeln!(
        out,
        "Database version:    {}{}",
        stats.database_version,
        if stats.complete { "" } else { " (loading)" }
    )?;
    writeln!(out, "Projects:            {}", stats.project_count)?;
    writeln!(out, "Directories:         {}", stats.directory_count)?;
    writeln!(out, "Files:               {}", stats.file_count)?;
    writeln!(out, "Searchable files:    {}", stats.searchable_file_count)?;
    writeln!(out, "Binary files:        {}", stats.binary_file_count)?;
    writeln!(out, "Searchable size:     {}", format_size(stats.searchable_bytes))?;
    writeln!(
        out,
        "Pieces:              {} in {} partitions",
        stats.piece_count, stats.partition_count
    )?;

    if !stats.projects.is_empty() {
        writeln!(out)?;
        writeln!(out, "Projects")?;
        writeln!(out, "--------")?;
        for project in &stats.projects {
            writeln!(
                out,
                "  {} ({} files, {} searchable, {})",
                project.root.display(),
                project.files,
                project.searchable_files,
                format_size(project.searchable_bytes)
            )?;
        }
    }

    if !stats.extensions.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top extensions")?;
        writeln!(out, "--------------")?;
        for ext in stats.extensions.iter().take(10) {
            writeln!(out, "  {:<12} {:>8} files  {:>12}", ext.extension, ext.files, format_size(ext.bytes))?;
        }
    }

    if !stats.largest_files.is_empty() {
        writeln!(out)?;
        writeln!(out, "Largest files")?;
        writeln!(out, "-------------")?;
        for file in &stats.largest_files {
            writeln!(out, "  {:>12}  {}", format_size(file.bytes), file.file_name)?;
        }
    }

    Ok(())
}
